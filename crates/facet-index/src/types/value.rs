//! Raw and parsed filter values.
//!
//! Every filter receives its request parameter as a [`RawValue`] in the
//! filter value wire format and parses it into a [`ParsedValue`]. A parsed
//! value is either fully valid or absent; there is no partial result.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::item::GeoPoint;

/// Date/time wire format used by date filters.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A filter's external request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A single string.
    Single(String),
    /// An array of strings (multi-select).
    Multi(Vec<String>),
}

impl RawValue {
    /// Creates a single string value.
    pub fn single(value: impl Into<String>) -> Self {
        RawValue::Single(value.into())
    }

    /// Returns the value as one string; arrays yield their first element.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Single(s) => Some(s.as_str()),
            RawValue::Multi(values) => values.first().map(String::as_str),
        }
    }

    /// Returns every submitted string. Single values are split on commas.
    pub fn items(&self) -> Vec<&str> {
        let raw: Vec<&str> = match self {
            RawValue::Single(s) => s.split(',').collect(),
            RawValue::Multi(values) => values
                .iter()
                .flat_map(|v| v.split(','))
                .collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Returns true if nothing meaningful was submitted.
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Single(s) => s.trim().is_empty(),
            RawValue::Multi(values) => values.iter().all(|v| v.trim().is_empty()),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Single(value.to_string())
    }
}

/// A bounding box request with an address label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoArea {
    /// Address label shown to the user.
    pub address: String,
    /// South-west corner.
    pub sw: GeoPoint,
    /// North-east corner.
    pub ne: GeoPoint,
}

/// A radius request around a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRadius {
    /// Address label shown to the user.
    pub address: String,
    /// Circle center.
    pub center: GeoPoint,
    /// Radius in the filter's configured units.
    pub radius: f64,
}

/// One end of a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateBound {
    /// Open end.
    Unbounded,
    /// A site-local date and time.
    At(NaiveDateTime),
}

impl DateBound {
    /// Returns the bound's date/time, if bounded.
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        match self {
            DateBound::Unbounded => None,
            DateBound::At(dt) => Some(*dt),
        }
    }
}

/// A site-local date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Window start.
    pub start: DateBound,
    /// Window end.
    pub end: DateBound,
    /// Whether occurrences in progress at the window start match.
    pub match_ongoing: bool,
}

/// The validated, typed form of a filter's raw input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParsedValue {
    /// Free text.
    Text(String),
    /// A single number.
    Number(f64),
    /// A closed numeric pair `(start, end)` with `start <= end`.
    NumberPair(f64, f64),
    /// A set of slugs.
    Terms(Vec<String>),
    /// A boolean switch.
    Bool(bool),
    /// A bounding box.
    Area(GeoArea),
    /// A radius around a point.
    Radius(GeoRadius),
    /// A date window.
    DateRange(DateRange),
}

impl ParsedValue {
    /// Serializes the value back into its wire format.
    pub fn to_wire(&self) -> String {
        match self {
            ParsedValue::Text(text) => text.clone(),
            ParsedValue::Number(n) => n.to_string(),
            ParsedValue::NumberPair(start, end) => format!("{}..{}", start, end),
            ParsedValue::Terms(slugs) => slugs.join(","),
            ParsedValue::Bool(flag) => if *flag { "1" } else { "0" }.to_string(),
            ParsedValue::Area(area) => format!(
                "{};{},{}..{},{}",
                area.address, area.sw.lat, area.sw.lng, area.ne.lat, area.ne.lng
            ),
            ParsedValue::Radius(radius) => format!(
                "{};{},{},{}",
                radius.address, radius.center.lat, radius.center.lng, radius.radius
            ),
            ParsedValue::DateRange(range) => {
                let format_bound = |bound: &DateBound| match bound {
                    DateBound::Unbounded => String::new(),
                    DateBound::At(dt) => dt.format(DATETIME_FORMAT).to_string(),
                };
                format!("{}..{}", format_bound(&range.start), format_bound(&range.end))
            }
        }
    }
}
