//! Content item accessor contract.
//!
//! The surrounding platform owns content items. The index only ever reads
//! them through [`ContentItem::get_field`], which must return
//! [`FieldValue::Empty`] for unknown or absent fields rather than failing.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in [-90, 90].
    pub lat: f64,
    /// Longitude in [-180, 180].
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a new point.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns true if both coordinates are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A structured location field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Human readable address.
    pub address: String,
    /// Stored coordinates, if geocoded.
    pub point: Option<GeoPoint>,
}

/// Repeat unit of a recurring date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatUnit {
    /// Daily.
    Day,
    /// Weekly.
    Week,
    /// Monthly.
    Month,
    /// Yearly.
    Year,
}

impl RepeatUnit {
    /// Every unit.
    pub const ALL: [RepeatUnit; 4] = [
        RepeatUnit::Day,
        RepeatUnit::Week,
        RepeatUnit::Month,
        RepeatUnit::Year,
    ];

    /// Stored name of this unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatUnit::Day => "day",
            RepeatUnit::Week => "week",
            RepeatUnit::Month => "month",
            RepeatUnit::Year => "year",
        }
    }

    /// SQL interval keyword for this unit.
    pub fn sql_unit(&self) -> &'static str {
        match self {
            RepeatUnit::Day => "DAY",
            RepeatUnit::Week => "WEEK",
            RepeatUnit::Month => "MONTH",
            RepeatUnit::Year => "YEAR",
        }
    }
}

/// One recurring date entry, stored in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// First occurrence start.
    pub start: NaiveDateTime,
    /// First occurrence end.
    pub end: NaiveDateTime,
    /// Repeat every `frequency` units; zero means the date does not repeat.
    #[serde(default)]
    pub frequency: u32,
    /// Repeat unit.
    #[serde(default = "default_repeat_unit")]
    pub unit: RepeatUnit,
    /// Last possible occurrence start.
    #[serde(default)]
    pub until: Option<NaiveDateTime>,
}

fn default_repeat_unit() -> RepeatUnit {
    RepeatUnit::Week
}

/// The current value of a content item field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Unknown, absent or unset field.
    #[default]
    Empty,
    /// Plain or rich text.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Boolean flag.
    Bool(bool),
    /// Taxonomy term assignments.
    Terms {
        /// Taxonomy name.
        taxonomy: String,
        /// Assigned term ids.
        ids: Vec<u64>,
    },
    /// Structured location.
    Location(Location),
    /// Recurring dates.
    Recurrence(Vec<RecurrenceRule>),
    /// Repeated structure; each row maps sub-field keys to values.
    Rows(Vec<BTreeMap<String, FieldValue>>),
}

/// Type tag of a [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FieldType {
    Empty,
    Text,
    Number,
    Bool,
    Terms,
    Location,
    Recurrence,
    Rows,
}

impl FieldValue {
    /// Returns the type tag of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Empty => FieldType::Empty,
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Number(_) => FieldType::Number,
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::Terms { .. } => FieldType::Terms,
            FieldValue::Location(_) => FieldType::Location,
            FieldValue::Recurrence(_) => FieldType::Recurrence,
            FieldValue::Rows(_) => FieldType::Rows,
        }
    }

    /// Reads a numeric value, accepting numeric text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Reads a boolean flag; text such as "1" or "yes" counts as set.
    pub fn as_bool(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => *n != 0.0,
            FieldValue::Text(s) => is_truthy(s),
            _ => false,
        }
    }
}

/// Returns true for the textual forms of an enabled switch.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Read access to a content item.
pub trait ContentItem {
    /// Item identifier.
    fn id(&self) -> u64;

    /// Identifier of the item's author.
    fn author_id(&self) -> u64 {
        0
    }

    /// Listing priority, higher sorts first.
    fn priority(&self) -> i64 {
        0
    }

    /// Returns the current value of a field, or [`FieldValue::Empty`].
    fn get_field(&self, key: &str) -> FieldValue;
}

/// Resolves a dotted source path into the values it reaches.
///
/// `"gallery"` reads one field. `"menu.title"` reads the `menu` field and, if it
/// is a repeated structure, collects `title` from every row. Paths that do not
/// resolve yield no values.
pub fn resolve_path(item: &dyn ContentItem, path: &str) -> Vec<FieldValue> {
    let mut segments = path.split('.').filter(|s| !s.is_empty());
    let Some(root) = segments.next() else {
        return Vec::new();
    };
    let rest: Vec<&str> = segments.collect();
    navigate(item.get_field(root), &rest)
}

fn navigate(value: FieldValue, segments: &[&str]) -> Vec<FieldValue> {
    let Some((head, remaining)) = segments.split_first() else {
        return match value {
            FieldValue::Empty => Vec::new(),
            other => vec![other],
        };
    };

    match value {
        FieldValue::Rows(rows) => rows
            .into_iter()
            .filter_map(|mut row| row.remove(*head))
            .flat_map(|child| navigate(child, remaining))
            .collect(),
        _ => Vec::new(),
    }
}

/// Simple in-memory content item.
#[derive(Debug, Clone, Default)]
pub struct StaticItem {
    /// Item identifier.
    pub id: u64,
    /// Author identifier.
    pub author_id: u64,
    /// Listing priority.
    pub priority: i64,
    /// Field values by key.
    pub fields: BTreeMap<String, FieldValue>,
}

impl StaticItem {
    /// Creates an item with no fields.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Sets a field value.
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Sets the author.
    pub fn with_author(mut self, author_id: u64) -> Self {
        self.author_id = author_id;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}

impl ContentItem for StaticItem {
    fn id(&self) -> u64 {
        self.id
    }

    fn author_id(&self) -> u64 {
        self.author_id
    }

    fn priority(&self) -> i64 {
        self.priority
    }

    fn get_field(&self, key: &str) -> FieldValue {
        self.fields.get(key).cloned().unwrap_or_default()
    }
}
