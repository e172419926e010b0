//! Keyword normalization.
//!
//! Index text and query text go through the same token pass so a token
//! written at index time is always reachable from the equivalent query token:
//!
//! 1. markup is stripped and the text split on whitespace
//! 2. leading boolean-mode operators are stripped and the word lowercased
//! 3. hyphens, periods, apostrophes and commas are removed
//! 4. any remaining punctuation or symbol becomes its own `U_<HEX>` token
//!
//! Escape tokens already in `U_<HEX>` form pass through unchanged, which makes
//! normalization idempotent.

use std::collections::HashSet;

use crate::config::KeywordsConfig;

/// Leading characters with a meaning in boolean-mode full-text syntax.
const LEADING_OPERATORS: &[char] = &['+', '-', '<', '>', '~', '*', '"', '(', ')', '@'];

/// Characters removed without splitting the word.
const JOINERS: &[char] = &['-', '.', '\'', '\u{2019}', '\u{2018}', '\u{02BC}', ','];

/// Returns true for words of the form `U_<uppercase hex>`.
fn is_escape_token(word: &str) -> bool {
    word.strip_prefix("U_").is_some_and(|hex| {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
    })
}

/// Strips markup tags and collapses whitespace.
///
/// A `<` only opens a tag when followed by a letter, `/` or `!`; other angle
/// brackets are kept as text.
pub fn strip_markup(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '<' if !in_tag
                && chars
                    .peek()
                    .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!')) =>
            {
                in_tag = true
            }
            '>' if in_tag => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape token for a punctuation or symbol character.
pub fn escape_char(c: char) -> String {
    format!("U_{:X}", c as u32)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Runs the shared token pass over one whitespace separated word.
fn word_tokens(word: &str, tokens: &mut Vec<String>) {
    if is_escape_token(word) {
        tokens.push(word.to_string());
        return;
    }

    let word = word
        .trim_start_matches(LEADING_OPERATORS)
        .to_lowercase()
        .replace(JOINERS, "");

    let mut current = String::new();
    for c in word.chars() {
        if is_word_char(c) {
            current.push(c);
        } else {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            if !c.is_whitespace() {
                tokens.push(escape_char(c));
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in strip_markup(text).split_whitespace() {
        word_tokens(word, &mut tokens);
    }
    tokens
}

fn dedupe(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// Tokens stored in the index, deduplicated in first-seen order.
pub fn index_tokens(text: &str) -> Vec<String> {
    dedupe(tokenize(text))
}

/// Normalized index text.
pub fn normalize_index(text: &str) -> String {
    index_tokens(text).join(" ")
}

/// Query tokens after truncation, length and stopword filtering.
pub fn query_tokens(text: &str, config: &KeywordsConfig) -> Vec<String> {
    let truncated: String = text.chars().take(config.max_query_length).collect();
    let tokens = tokenize(&truncated)
        .into_iter()
        .filter(|t| t.chars().count() >= config.min_word_length)
        .filter(|t| {
            !config
                .stopwords
                .iter()
                .any(|stopword| stopword.eq_ignore_ascii_case(t))
        })
        .collect();
    dedupe(tokens)
}

/// Boolean-mode match expression requiring every token as a prefix.
///
/// Returns `None` when no token survives filtering.
pub fn boolean_query(text: &str, config: &KeywordsConfig) -> Option<String> {
    let tokens = query_tokens(text, config);
    if tokens.is_empty() {
        return None;
    }
    Some(
        tokens
            .iter()
            .map(|t| format!("+{}*", t))
            .collect::<Vec<_>>()
            .join(" "),
    )
}
