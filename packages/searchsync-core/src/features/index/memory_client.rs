//! In-Memory Index Client
//!
//! Term-matching index for tests and embedded use. Ranking is the number of
//! query-term occurrences in a document, ties broken by insertion order.
//! Transaction support can be switched off to exercise degraded-mode writes,
//! and individual keys can be made to fail. A transaction is owned by the
//! thread that began it; other threads' writes wait for it to end.

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use searchsync_storage::{Fields, PrimaryKey};

use super::ports::{projection_text, IndexClient, IndexError, IndexHandle, SearchResult};
use super::transaction::{wait_turn, TransactionOwner};
use crate::config::SearchConfig;

#[derive(Debug, Clone, Copy)]
struct FuzzyOptions {
    enabled: bool,
    prefix_length: usize,
    max_expansions: usize,
    distance: usize,
    no_limit: bool,
    as_you_type: bool,
}

impl From<&SearchConfig> for FuzzyOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            enabled: config.fuzziness,
            prefix_length: config.fuzzy_prefix_length,
            max_expansions: config.fuzzy_max_expansions,
            distance: usize::from(config.fuzzy_distance),
            no_limit: config.fuzzy_no_limit,
            as_you_type: config.as_you_type,
        }
    }
}

/// Index client holding every index in process memory
pub struct InMemoryIndexClient {
    options: FuzzyOptions,
    transactions: bool,
    indexes: DashMap<String, Arc<InMemoryIndex>>,
    failing_keys: Arc<Mutex<HashSet<PrimaryKey>>>,
}

impl InMemoryIndexClient {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            options: FuzzyOptions::from(config),
            transactions: true,
            indexes: DashMap::new(),
            failing_keys: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Indexes created from now on report no transaction support
    pub fn without_transactions(mut self) -> Self {
        self.transactions = false;
        self
    }

    /// Make every write of `key` fail with `IndexError::Internal`
    pub fn fail_writes_for(&self, key: impl Into<PrimaryKey>) {
        self.failing_keys.lock().insert(key.into());
    }
}

impl IndexClient for InMemoryIndexClient {
    fn driver_name(&self) -> &'static str {
        "memory"
    }

    fn index_exists(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    fn create_index(&self, name: &str) -> Result<(), IndexError> {
        self.indexes.entry(name.to_string()).or_insert_with(|| {
            Arc::new(InMemoryIndex {
                name: name.to_string(),
                options: self.options,
                transactions: self.transactions,
                failing_keys: self.failing_keys.clone(),
                state: Mutex::new(IndexState::default()),
                released: Condvar::new(),
            })
        });
        Ok(())
    }

    fn select_index(&self, name: &str) -> Result<Arc<dyn IndexHandle>, IndexError> {
        let index: Arc<dyn IndexHandle> = self
            .indexes
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| IndexError::NotFound(name.to_string()))?;
        Ok(index)
    }

    fn drop_index(&self, name: &str) -> Result<bool, IndexError> {
        Ok(self.indexes.remove(name).is_some())
    }
}

#[derive(Debug, Clone)]
struct IndexedDoc {
    key: Option<PrimaryKey>,
    terms: Vec<String>,
}

#[derive(Debug, Default)]
struct IndexState {
    docs: Vec<IndexedDoc>,
    /// Committed documents to restore on rollback, set while a transaction is open
    snapshot: Option<Vec<IndexedDoc>>,
    owner: TransactionOwner,
}

impl IndexState {
    /// Documents searches see: the committed ones while a transaction is open
    fn visible(&self) -> &[IndexedDoc] {
        self.snapshot.as_deref().unwrap_or(&self.docs)
    }
}

pub struct InMemoryIndex {
    name: String,
    options: FuzzyOptions,
    transactions: bool,
    failing_keys: Arc<Mutex<HashSet<PrimaryKey>>>,
    state: Mutex<IndexState>,
    released: Condvar,
}

/// Lowercased alphanumeric runs
pub fn analyze(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Optimal string alignment distance (adjacent transpositions cost one)
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        matrix[0][j] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(matrix[i - 2][j - 2] + 1);
            }
            matrix[i][j] = best;
        }
    }
    matrix[a.len()][b.len()]
}

impl InMemoryIndex {
    fn check_key(&self, key: &PrimaryKey) -> Result<(), IndexError> {
        if self.failing_keys.lock().contains(key) {
            return Err(IndexError::Internal(format!(
                "Write of {} to {} failed",
                key, self.name
            )));
        }
        Ok(())
    }

    /// Vocabulary terms a query token matches
    fn expand(
        &self,
        token: &str,
        is_last: bool,
        vocabulary: &BTreeSet<&str>,
    ) -> BTreeSet<String> {
        let options = &self.options;
        let prefix_match = options.as_you_type && is_last;

        if !options.enabled {
            return vocabulary
                .iter()
                .filter(|term| {
                    if prefix_match {
                        term.starts_with(token)
                    } else {
                        **term == token
                    }
                })
                .map(|term| term.to_string())
                .collect();
        }

        let anchor: String = token.chars().take(options.prefix_length).collect();
        let mut candidates: Vec<(usize, &str)> = vocabulary
            .iter()
            .filter(|term| term.starts_with(anchor.as_str()))
            .filter_map(|term| {
                let distance = if prefix_match {
                    let head: String = term.chars().take(token.chars().count()).collect();
                    edit_distance(token, &head)
                } else {
                    edit_distance(token, term)
                };
                (distance <= options.distance).then_some((distance, *term))
            })
            .collect();
        candidates.sort();
        if !options.no_limit {
            candidates.truncate(options.max_expansions);
        }
        candidates
            .into_iter()
            .map(|(_, term)| term.to_string())
            .collect()
    }

    fn rank(
        &self,
        docs: &[IndexedDoc],
        matches: impl Fn(&IndexedDoc) -> Option<usize>,
        limit: usize,
        started: Instant,
    ) -> SearchResult {
        let mut scored: Vec<(usize, usize, &IndexedDoc)> = docs
            .iter()
            .enumerate()
            .filter_map(|(position, doc)| matches(doc).map(|score| (score, position, doc)))
            .collect();
        let hits = scored.len();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        SearchResult {
            ids: scored
                .into_iter()
                .filter_map(|(_, _, doc)| doc.key.clone())
                .take(limit)
                .collect(),
            hits,
            execution_time: started.elapsed(),
        }
    }

    fn lock_turn(&self) -> MutexGuard<'_, IndexState> {
        let mut state = self.state.lock();
        wait_turn(&mut state, &self.released, |state| &state.owner);
        state
    }

    fn write(&self, apply: impl FnOnce(&mut Vec<IndexedDoc>)) {
        apply(&mut self.lock_turn().docs);
    }
}

fn vocabulary(docs: &[IndexedDoc]) -> BTreeSet<&str> {
    docs.iter()
        .flat_map(|doc| doc.terms.iter().map(String::as_str))
        .collect()
}

fn occurrences(doc: &IndexedDoc, terms: &BTreeSet<String>) -> usize {
    doc.terms.iter().filter(|term| terms.contains(*term)).count()
}

impl IndexHandle for InMemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&self, query: &str, limit: usize) -> Result<SearchResult, IndexError> {
        let started = Instant::now();
        let state = self.state.lock();
        let docs = state.visible();
        let vocabulary = vocabulary(docs);

        let tokens = analyze(query);
        let mut expanded = BTreeSet::new();
        for (position, token) in tokens.iter().enumerate() {
            expanded.extend(self.expand(token, position + 1 == tokens.len(), &vocabulary));
        }

        Ok(self.rank(
            docs,
            |doc| Some(occurrences(doc, &expanded)).filter(|score| *score > 0),
            limit,
            started,
        ))
    }

    fn search_boolean(&self, query: &str, limit: usize) -> Result<SearchResult, IndexError> {
        let started = Instant::now();
        let state = self.state.lock();
        let docs = state.visible();
        let vocabulary = vocabulary(docs);

        // Alternatives separated by OR; each is a conjunction of required and
        // excluded term sets.
        let mut alternatives: Vec<(Vec<BTreeSet<String>>, Vec<BTreeSet<String>>)> =
            vec![(Vec::new(), Vec::new())];
        let words: Vec<&str> = query.split_whitespace().collect();
        for (position, word) in words.iter().enumerate() {
            if word.eq_ignore_ascii_case("or") {
                alternatives.push((Vec::new(), Vec::new()));
                continue;
            }
            let (negated, word) = match word.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, *word),
            };
            let is_last = position + 1 == words.len();
            for token in analyze(word) {
                let terms = self.expand(&token, is_last && !negated, &vocabulary);
                if let Some((required, excluded)) = alternatives.last_mut() {
                    if negated {
                        excluded.push(terms);
                    } else {
                        required.push(terms);
                    }
                }
            }
        }
        alternatives.retain(|(required, _)| !required.is_empty());

        Ok(self.rank(
            docs,
            |doc| {
                alternatives
                    .iter()
                    .filter(|(required, excluded)| {
                        required.iter().all(|terms| occurrences(doc, terms) > 0)
                            && excluded.iter().all(|terms| occurrences(doc, terms) == 0)
                    })
                    .map(|(required, _)| {
                        required.iter().map(|terms| occurrences(doc, terms)).sum::<usize>()
                    })
                    .max()
            },
            limit,
            started,
        ))
    }

    fn insert(&self, fields: &Fields) -> Result<(), IndexError> {
        let terms = analyze(&projection_text(fields));
        self.write(|docs| docs.push(IndexedDoc { key: None, terms }));
        Ok(())
    }

    fn update(&self, key: &PrimaryKey, fields: &Fields) -> Result<(), IndexError> {
        self.check_key(key)?;
        let terms = analyze(&projection_text(fields));
        self.write(|docs| {
            docs.retain(|doc| doc.key.as_ref() != Some(key));
            docs.push(IndexedDoc {
                key: Some(key.clone()),
                terms,
            });
        });
        Ok(())
    }

    fn delete(&self, key: &PrimaryKey) -> Result<(), IndexError> {
        self.check_key(key)?;
        self.write(|docs| docs.retain(|doc| doc.key.as_ref() != Some(key)));
        Ok(())
    }

    fn supports_transactions(&self) -> bool {
        self.transactions
    }

    fn begin_transaction(&self) -> Result<(), IndexError> {
        if !self.transactions {
            return Err(IndexError::Unsupported(format!(
                "{} does not support transactions",
                self.name
            )));
        }
        let mut state = self.lock_turn();
        state.owner.claim(&self.name)?;
        state.snapshot = Some(state.docs.clone());
        Ok(())
    }

    fn commit_transaction(&self) -> Result<(), IndexError> {
        let mut state = self.state.lock();
        state.owner.release(&self.name)?;
        state.snapshot = None;
        self.released.notify_all();
        Ok(())
    }

    fn rollback_transaction(&self) -> Result<(), IndexError> {
        let mut state = self.state.lock();
        state.owner.release(&self.name)?;
        if let Some(committed) = state.snapshot.take() {
            state.docs = committed;
        }
        self.released.notify_all();
        Ok(())
    }

    fn document_count(&self) -> Result<u64, IndexError> {
        Ok(self.state.lock().visible().len() as u64)
    }
}
