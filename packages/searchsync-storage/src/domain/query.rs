//! Query vocabulary shared by every Record Store backend
//!
//! A `Constraint` is what a caller asks for (predicates, ordering, an optional
//! soft-delete request). A `RecordQuery` is the resolved, key-restricted query a
//! store executes.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::models::{PrimaryKey, Record, RecordSchema, Value};

/// Comparison operator of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::NotEq => "<>",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::NotEq => ordering != Ordering::Equal,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
        }
    }
}

/// `field <op> value`
///
/// Null handling follows SQL: `= null` means `IS NULL`, `<> null` means
/// `IS NOT NULL`, every other comparison against null matches nothing.
/// Values of different types compare like untyped SQLite columns: every
/// number sorts below every text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: Comparison,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Comparison::Eq, value)
    }

    /// Evaluate against a column value (`None` when the record lacks the column)
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let actual = actual.unwrap_or(&Value::Null);
        if self.value.is_null() {
            return match self.op {
                Comparison::Eq => actual.is_null(),
                Comparison::NotEq => !actual.is_null(),
                _ => false,
            };
        }
        if actual.is_null() {
            return false;
        }
        self.op.accepts(actual.sort_cmp(&self.value))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Soft-delete visibility of a query.
///
/// Tri-state on purpose: the request flag looks boolean but "not requested"
/// and "requested false" resolve differently depending on the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftDeleteMode {
    /// Hide soft-deleted rows
    ExcludeDeleted,
    /// Only soft-deleted rows
    OnlyDeleted,
    /// No soft-delete predicate
    IncludeAll,
}

impl SoftDeleteMode {
    /// Resolve the visibility of a query.
    ///
    /// | capability && enabled | requested     | mode             |
    /// |-----------------------|---------------|------------------|
    /// | false                 | any           | `IncludeAll`     |
    /// | true                  | `None`        | `ExcludeDeleted` |
    /// | true                  | `Some(true)`  | `OnlyDeleted`    |
    /// | true                  | `Some(false)` | `ExcludeDeleted` |
    pub fn resolve(capability: bool, feature_enabled: bool, requested: Option<bool>) -> Self {
        if !capability || !feature_enabled {
            return SoftDeleteMode::IncludeAll;
        }
        match requested {
            Some(true) => SoftDeleteMode::OnlyDeleted,
            Some(false) | None => SoftDeleteMode::ExcludeDeleted,
        }
    }

    /// Whether a record is visible under this mode for `schema`
    pub fn admits(&self, schema: &RecordSchema, record: &Record) -> bool {
        if !schema.soft_deletes {
            return true;
        }
        match self {
            SoftDeleteMode::ExcludeDeleted => !record.is_trashed(),
            SoftDeleteMode::OnlyDeleted => record.is_trashed(),
            SoftDeleteMode::IncludeAll => true,
        }
    }
}

/// Caller-side constraints of a search: predicates, ordering and an optional
/// soft-delete request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Constraint {
    /// Ordered conjunction; never merged by field
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub orders: Vec<OrderBy>,
    /// `None` when the caller did not ask for a soft-delete filter
    #[serde(default)]
    pub soft_deleted: Option<bool>,
}

impl Constraint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::eq(field, value));
        self
    }

    pub fn where_cmp(
        mut self,
        field: impl Into<String>,
        op: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        self.predicates.push(Predicate::new(field, op, value));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(OrderBy::new(field, direction));
        self
    }

    pub fn soft_deleted(mut self, only_trashed: bool) -> Self {
        self.soft_deleted = Some(only_trashed);
        self
    }

    /// Every field the constraint refers to, predicates first
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        self.predicates
            .iter()
            .map(|p| p.field.as_str())
            .chain(self.orders.iter().map(|o| o.field.as_str()))
    }
}

/// Key-restricted query executed by a store
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub keys: Vec<PrimaryKey>,
    pub predicates: Vec<Predicate>,
    pub orders: Vec<OrderBy>,
    pub soft_delete: SoftDeleteMode,
}

impl RecordQuery {
    /// Keys only, every row visible
    pub fn for_keys(keys: Vec<PrimaryKey>) -> Self {
        Self {
            keys,
            predicates: Vec::new(),
            orders: Vec::new(),
            soft_delete: SoftDeleteMode::IncludeAll,
        }
    }

    pub fn with_soft_delete(mut self, mode: SoftDeleteMode) -> Self {
        self.soft_delete = mode;
        self
    }

    pub fn with_predicates(mut self, predicates: Vec<Predicate>) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn with_orders(mut self, orders: Vec<OrderBy>) -> Self {
        self.orders = orders;
        self
    }

    /// Whether `record` satisfies visibility and every predicate (keys not checked)
    pub fn admits(&self, schema: &RecordSchema, record: &Record) -> bool {
        self.soft_delete.admits(schema, record)
            && self
                .predicates
                .iter()
                .all(|p| p.matches(record.column_value(schema, &p.field).as_ref()))
    }

    /// Compare two records under this query's ordering
    pub fn compare(&self, schema: &RecordSchema, a: &Record, b: &Record) -> Ordering {
        for order in &self.orders {
            let left = a.column_value(schema, &order.field).unwrap_or(Value::Null);
            let right = b.column_value(schema, &order.field).unwrap_or(Value::Null);
            let ordering = match order.direction {
                Direction::Asc => left.sort_cmp(&right),
                Direction::Desc => right.sort_cmp(&left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
