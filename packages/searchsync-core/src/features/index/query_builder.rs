//! Query construction for the tantivy client
//!
//! Relevance mode ORs one sub-query per token. Each token is an exact term, a
//! fuzzy term (optionally anchored on an exact prefix) or, for the last token
//! in as-you-type mode, a prefix match. Boolean mode builds its required and
//! excluded clauses from the same per-token queries.

use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, RegexQuery, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, Term};
use tracing::debug;

use super::ports::IndexError;
use crate::config::SearchConfig;

/// Largest edit distance tantivy's Levenshtein automata are built for
pub const MAX_TANTIVY_DISTANCE: u8 = 2;

/// Matching options derived from `SearchConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub fuzziness: bool,
    pub prefix_length: usize,
    pub distance: u8,
    pub as_you_type: bool,
}

impl From<&SearchConfig> for MatchOptions {
    fn from(config: &SearchConfig) -> Self {
        if config.fuzziness && config.fuzzy_distance > MAX_TANTIVY_DISTANCE {
            debug!(
                "fuzzy_distance {} capped at {} for tantivy",
                config.fuzzy_distance, MAX_TANTIVY_DISTANCE
            );
        }
        Self {
            fuzziness: config.fuzziness,
            prefix_length: config.fuzzy_prefix_length,
            distance: config.fuzzy_distance.min(MAX_TANTIVY_DISTANCE),
            as_you_type: config.as_you_type,
        }
    }
}

/// Run `text` through the field's analyzer, so query tokens match indexed terms
pub fn tokenize(index: &Index, field: Field, text: &str) -> Result<Vec<String>, IndexError> {
    let mut analyzer = index
        .tokenizer_for_field(field)
        .map_err(|e| IndexError::Internal(format!("No tokenizer for content field: {}", e)))?;
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while stream.advance() {
        tokens.push(stream.token().text.clone());
    }
    Ok(tokens)
}

/// Disjunction over `tokens`; `None` when there is nothing to match
pub fn relevance_query(
    field: Field,
    tokens: &[String],
    options: &MatchOptions,
) -> Result<Option<Box<dyn Query>>, IndexError> {
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(tokens.len());
    for (position, token) in tokens.iter().enumerate() {
        let is_last = position + 1 == tokens.len();
        clauses.push((Occur::Should, token_query(field, token, options, is_last)?));
    }
    Ok(match clauses.len() {
        0 => None,
        _ => Some(Box::new(BooleanQuery::new(clauses)) as Box<dyn Query>),
    })
}

fn token_query(
    field: Field,
    token: &str,
    options: &MatchOptions,
    is_last: bool,
) -> Result<Box<dyn Query>, IndexError> {
    let term = Term::from_field_text(field, token);
    let prefix_match = options.as_you_type && is_last;

    if !options.fuzziness {
        return Ok(if prefix_match {
            Box::new(FuzzyTermQuery::new_prefix(term, 0, true))
        } else {
            Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs))
        });
    }

    let fuzzy: Box<dyn Query> = if prefix_match {
        Box::new(FuzzyTermQuery::new_prefix(term, options.distance, true))
    } else {
        Box::new(FuzzyTermQuery::new(term, options.distance, true))
    };
    if options.prefix_length == 0 {
        return Ok(fuzzy);
    }

    let prefix: String = token.chars().take(options.prefix_length).collect();
    let pattern = format!("{}.*", regex::escape(&prefix));
    let anchor = RegexQuery::from_pattern(&pattern, field)
        .map_err(|e| IndexError::InvalidInput(format!("Prefix pattern '{}': {}", pattern, e)))?;

    Ok(Box::new(BooleanQuery::new(vec![
        (Occur::Must, fuzzy),
        (Occur::Must, Box::new(anchor) as Box<dyn Query>),
    ])))
}

/// Boolean mode: whitespace is AND, `OR` separates alternatives, `-term` excludes.
///
/// Alternatives without a required term are dropped; `None` when none remain.
pub fn boolean_query(
    index: &Index,
    field: Field,
    query: &str,
    options: &MatchOptions,
) -> Result<Option<Box<dyn Query>>, IndexError> {
    let words: Vec<&str> = query.split_whitespace().collect();
    let mut alternatives: Vec<Vec<(Occur, Box<dyn Query>)>> = vec![Vec::new()];

    for (position, word) in words.iter().enumerate() {
        if word.eq_ignore_ascii_case("or") {
            alternatives.push(Vec::new());
            continue;
        }
        let (occur, word) = match word.strip_prefix('-') {
            Some(rest) => (Occur::MustNot, rest),
            None => (Occur::Must, *word),
        };
        let is_last = position + 1 == words.len() && occur == Occur::Must;
        for token in tokenize(index, field, word)? {
            let clause = token_query(field, &token, options, is_last)?;
            if let Some(clauses) = alternatives.last_mut() {
                clauses.push((occur, clause));
            }
        }
    }

    let branches: Vec<(Occur, Box<dyn Query>)> = alternatives
        .into_iter()
        .filter(|clauses| clauses.iter().any(|(occur, _)| *occur == Occur::Must))
        .map(|clauses| (Occur::Should, Box::new(BooleanQuery::new(clauses)) as Box<dyn Query>))
        .collect();
    Ok(match branches.len() {
        0 => None,
        _ => Some(Box::new(BooleanQuery::new(branches)) as Box<dyn Query>),
    })
}
