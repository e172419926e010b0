//! Conditional filter visibility.
//!
//! A filter may carry condition groups referencing other filters. The groups
//! form a disjunction of conjunctions: the filter is active when every
//! condition of at least one group holds. Conditions compare against the
//! parsed values of the referenced filters; a value that fails to parse counts
//! as empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{is_truthy, ParsedValue};

/// Parsed request values keyed by filter.
pub type ParsedValues = BTreeMap<String, ParsedValue>;

/// Comparison applied by a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    /// Some submitted item equals the value.
    #[serde(rename = "==")]
    Equals,
    /// No submitted item equals the value.
    #[serde(rename = "!=")]
    NotEquals,
    /// Nothing was submitted.
    #[serde(rename = "==empty")]
    Empty,
    /// Something was submitted.
    #[serde(rename = "!=empty")]
    NotEmpty,
    /// The submitted text contains the value.
    #[serde(rename = "==contains")]
    Contains,
    /// The submitted number is greater than the value.
    #[serde(rename = ">")]
    GreaterThan,
    /// The submitted number is less than the value.
    #[serde(rename = "<")]
    LessThan,
}

/// One condition on another filter's submitted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Key of the referenced filter.
    pub filter: String,
    /// Comparison.
    pub operator: ConditionOperator,
    /// Compared value; unused by the emptiness operators.
    #[serde(default)]
    pub value: String,
}

impl Condition {
    /// Creates a condition.
    pub fn new(filter: impl Into<String>, operator: ConditionOperator, value: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluates the condition against parsed values.
    pub fn holds(&self, values: &ParsedValues) -> bool {
        let value = values.get(&self.filter);
        match (self.operator, value) {
            (ConditionOperator::Empty, value) => value.is_none(),
            (ConditionOperator::NotEmpty, value) => value.is_some(),
            (ConditionOperator::NotEquals, None) => true,
            (_, None) => false,
            (ConditionOperator::Equals, Some(value)) => equals(value, &self.value),
            (ConditionOperator::NotEquals, Some(value)) => !equals(value, &self.value),
            (ConditionOperator::Contains, Some(value)) => contains(value, &self.value),
            (ConditionOperator::GreaterThan, Some(value)) => compare(value, &self.value, |a, b| a > b),
            (ConditionOperator::LessThan, Some(value)) => compare(value, &self.value, |a, b| a < b),
        }
    }
}

fn number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Terms compare by membership, numbers numerically, everything else on the
/// whole wire string.
fn equals(value: &ParsedValue, expected: &str) -> bool {
    match value {
        ParsedValue::Terms(slugs) => slugs.iter().any(|slug| slug == expected.trim()),
        ParsedValue::Number(n) => number(expected) == Some(*n),
        ParsedValue::NumberPair(start, end) => expected
            .split_once("..")
            .and_then(|(a, b)| Some((number(a)?, number(b)?)))
            == Some((*start, *end)),
        ParsedValue::Bool(flag) => is_truthy(expected) == *flag,
        ParsedValue::Text(text) => text == expected,
        other => other.to_wire() == expected,
    }
}

fn contains(value: &ParsedValue, needle: &str) -> bool {
    match value {
        ParsedValue::Terms(slugs) => slugs.iter().any(|slug| slug.contains(needle)),
        ParsedValue::Text(text) => text.contains(needle),
        other => other.to_wire().contains(needle),
    }
}

fn compare(value: &ParsedValue, threshold: &str, op: impl Fn(f64, f64) -> bool) -> bool {
    match (value, number(threshold)) {
        (ParsedValue::Number(n), Some(threshold)) => op(*n, threshold),
        _ => false,
    }
}

/// Condition groups: OR across groups, AND within a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionGroups(pub Vec<Vec<Condition>>);

impl ConditionGroups {
    /// Returns true if no groups are configured.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }

    /// Filter keys referenced by any condition.
    pub fn referenced_filters(&self) -> impl Iterator<Item = &str> {
        self.0.iter().flatten().map(|c| c.filter.as_str())
    }

    /// Evaluates the groups. No groups means always visible.
    pub fn evaluate(&self, values: &ParsedValues) -> bool {
        if self.is_empty() {
            return true;
        }
        self.0
            .iter()
            .filter(|group| !group.is_empty())
            .any(|group| group.iter().all(|c| c.holds(values)))
    }
}
