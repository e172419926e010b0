//! Numeric range filter.
//!
//! Single handle values compare against one bound; double handle values use
//! the wire form `start..end`. Column values are scaled by the precision of
//! the configured step so the index column stays integral.

use serde::{Deserialize, Serialize};

use crate::query::IndexQuery;
use crate::schema::{ColumnDef, ColumnType, IndexSchemaBuilder, IndexValues, KeyDef, KeyKind, PRIORITY_COLUMN};
use crate::sql::{SqlFragment, SqlParam};
use crate::types::{resolve_path, ContentItem, ParsedValue, RawValue};

use super::controls::{common_controls, ControlSpec};
use super::pricing::{join_min_price, scaled, step_multiplier};
use super::{Filter, FilterContext};

/// Number of handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeHandles {
    /// One bound.
    Single,
    /// Independent start and end bounds.
    #[default]
    Double,
}

/// Comparison sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeCompare {
    /// Match values inside the range.
    #[default]
    InRange,
    /// Match values outside the range.
    OutsideRange,
}

/// Where the compared number comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeSource {
    /// A numeric item field, indexed into the filter's column.
    Field(String),
    /// Lowest effective price of the item's priced sub-entities.
    Pricing,
    /// The item's listing priority.
    Priority,
}

/// Numeric range filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeFilter {
    /// Filter key.
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Default wire value.
    #[serde(default)]
    pub default: Option<String>,
    /// Compared number.
    pub source: RangeSource,
    /// Handle mode.
    #[serde(default)]
    pub handles: RangeHandles,
    /// Comparison sense.
    #[serde(default)]
    pub compare: RangeCompare,
    /// Slider step; its decimal precision sets the column scale.
    #[serde(default = "default_step")]
    pub step: f64,
    /// Slider minimum.
    #[serde(default)]
    pub min: Option<f64>,
    /// Slider maximum.
    #[serde(default)]
    pub max: Option<f64>,
}

fn default_step() -> f64 {
    1.0
}

impl RangeFilter {
    /// Creates an in-range, double handle filter.
    pub fn new(key: impl Into<String>, source: RangeSource) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            default: None,
            source,
            handles: RangeHandles::default(),
            compare: RangeCompare::default(),
            step: default_step(),
            min: None,
            max: None,
        }
    }

    /// Sets the handle mode.
    pub fn with_handles(mut self, handles: RangeHandles) -> Self {
        self.handles = handles;
        self
    }

    /// Sets the comparison sense.
    pub fn with_compare(mut self, compare: RangeCompare) -> Self {
        self.compare = compare;
        self
    }

    /// Sets the step.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Resolves the compared expression and a binder for bounds.
    fn target(&self, query: &mut IndexQuery, ctx: &FilterContext<'_>) -> (String, Box<dyn Fn(f64) -> SqlParam>) {
        match &self.source {
            RangeSource::Field(_) => {
                let multiplier = step_multiplier(self.step);
                (
                    IndexQuery::column(&self.column()),
                    Box::new(move |v| scaled(v, multiplier)),
                )
            }
            RangeSource::Pricing => (join_min_price(query, ctx), Box::new(SqlParam::float)),
            RangeSource::Priority => (
                IndexQuery::column(PRIORITY_COLUMN),
                Box::new(|v| scaled(v, 1.0)),
            ),
        }
    }
}

/// Parses a finite number.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

impl Filter for RangeFilter {
    fn key(&self) -> &str {
        &self.key
    }

    fn filter_type(&self) -> &'static str {
        "range"
    }

    fn setup(&self, schema: &mut IndexSchemaBuilder) {
        if let RangeSource::Field(_) = self.source {
            schema.add_column(ColumnDef::new(self.column(), ColumnType::BigInt));
            schema.add_key(KeyDef::on(KeyKind::Index, self.column()));
        }
    }

    fn index(&self, item: &dyn ContentItem, _ctx: &FilterContext<'_>) -> IndexValues {
        let mut values = IndexValues::new();
        if let RangeSource::Field(path) = &self.source {
            let param = resolve_path(item, path)
                .iter()
                .find_map(|v| v.as_number())
                .map(|n| scaled(n, step_multiplier(self.step)))
                .unwrap_or(SqlParam::Null);
            values.insert(self.column(), SqlFragment::param(param));
        }
        values
    }

    fn parse_value(&self, raw: &RawValue, _ctx: &FilterContext<'_>) -> Option<ParsedValue> {
        let text = raw.as_str()?.trim();
        match self.handles {
            RangeHandles::Single => parse_number(text).map(ParsedValue::Number),
            RangeHandles::Double => {
                let (start, end) = text.split_once("..")?;
                let start = parse_number(start)?;
                let end = parse_number(end)?;
                (start <= end).then_some(ParsedValue::NumberPair(start, end))
            }
        }
    }

    fn apply(&self, query: &mut IndexQuery, value: &ParsedValue, ctx: &FilterContext<'_>) {
        let (column, bind) = match value {
            ParsedValue::Number(_) | ParsedValue::NumberPair(..) => self.target(query, ctx),
            _ => return,
        };

        let predicate = match (value, self.compare) {
            (ParsedValue::Number(v), RangeCompare::InRange) => {
                SqlFragment::with_params(format!("{} <= ?", column), vec![bind(*v)])
            }
            (ParsedValue::Number(v), RangeCompare::OutsideRange) => {
                SqlFragment::with_params(format!("{} > ?", column), vec![bind(*v)])
            }
            (ParsedValue::NumberPair(start, end), RangeCompare::InRange) => SqlFragment::with_params(
                format!("{c} >= ? AND {c} <= ?", c = column),
                vec![bind(*start), bind(*end)],
            ),
            (ParsedValue::NumberPair(start, end), RangeCompare::OutsideRange) => {
                SqlFragment::with_params(
                    format!("{c} < ? OR {c} > ?", c = column),
                    vec![bind(*start), bind(*end)],
                )
            }
            _ => return,
        };
        query.filter(predicate);
    }

    fn controls(&self) -> Vec<ControlSpec> {
        let mut controls = common_controls(&self.label);
        controls.push(ControlSpec::select(
            "handles",
            "Handles",
            &[("single", "Single"), ("double", "Double")],
        ));
        controls.push(
            ControlSpec::select(
                "compare",
                "Comparison",
                &[("in_range", "In range"), ("outside_range", "Outside range")],
            )
            .with_default("in_range"),
        );
        controls.push(ControlSpec::number("step", "Step").with_default(self.step));
        controls.push(ControlSpec::number("min", "Minimum"));
        controls.push(ControlSpec::number("max", "Maximum"));
        controls
    }

    fn default_value(&self) -> Option<String> {
        if self.default.is_some() {
            return self.default.clone();
        }
        match (self.handles, self.min, self.max) {
            (RangeHandles::Double, Some(min), Some(max)) => {
                Some(ParsedValue::NumberPair(min, max).to_wire())
            }
            (RangeHandles::Single, _, Some(max)) => Some(ParsedValue::Number(max).to_wire()),
            _ => None,
        }
    }
}
