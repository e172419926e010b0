//! Stepper filter: one number compared with an explicit operator.

use serde::{Deserialize, Serialize};

use crate::query::IndexQuery;
use crate::schema::{ColumnDef, ColumnType, IndexSchemaBuilder, IndexValues, KeyDef, KeyKind, PRIORITY_COLUMN};
use crate::sql::{SqlFragment, SqlParam};
use crate::types::{resolve_path, ContentItem, ParsedValue, RawValue};

use super::controls::{common_controls, ControlSpec};
use super::pricing::{constrain_pricing_column, join_min_price, scaled, step_multiplier, AddonAttribute};
use super::range::parse_number;
use super::{Filter, FilterContext};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepperCompare {
    /// `=`
    Equals,
    /// `>=`
    #[default]
    GreaterOrEqual,
    /// `<=`
    LessOrEqual,
}

impl StepperCompare {
    /// SQL operator.
    pub fn operator(&self) -> &'static str {
        match self {
            StepperCompare::Equals => "=",
            StepperCompare::GreaterOrEqual => ">=",
            StepperCompare::LessOrEqual => "<=",
        }
    }
}

/// Where the compared number comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepperSource {
    /// A numeric item field, indexed into the filter's column.
    Field(String),
    /// Lowest effective price of the item's priced sub-entities.
    Pricing,
    /// The item's listing priority.
    Priority,
    /// A numeric add-on attribute of a priced sub-entity.
    Addon(AddonAttribute),
}

/// Single value numeric filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepperFilter {
    /// Filter key.
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Default wire value.
    #[serde(default)]
    pub default: Option<String>,
    /// Compared number.
    pub source: StepperSource,
    /// Comparison operator.
    #[serde(default)]
    pub compare: StepperCompare,
    /// Step; its decimal precision sets the column scale.
    #[serde(default = "default_step")]
    pub step: f64,
}

fn default_step() -> f64 {
    1.0
}

impl StepperFilter {
    /// Creates a greater-or-equal stepper.
    pub fn new(key: impl Into<String>, source: StepperSource) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            default: None,
            source,
            compare: StepperCompare::default(),
            step: default_step(),
        }
    }

    /// Sets the comparison operator.
    pub fn with_compare(mut self, compare: StepperCompare) -> Self {
        self.compare = compare;
        self
    }
}

impl Filter for StepperFilter {
    fn key(&self) -> &str {
        &self.key
    }

    fn filter_type(&self) -> &'static str {
        "stepper"
    }

    fn setup(&self, schema: &mut IndexSchemaBuilder) {
        if let StepperSource::Field(_) = self.source {
            schema.add_column(ColumnDef::new(self.column(), ColumnType::BigInt));
            schema.add_key(KeyDef::on(KeyKind::Index, self.column()));
        }
    }

    fn index(&self, item: &dyn ContentItem, _ctx: &FilterContext<'_>) -> IndexValues {
        let mut values = IndexValues::new();
        if let StepperSource::Field(path) = &self.source {
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
        parse_number(raw.as_str()?).map(ParsedValue::Number)
    }

    fn apply(&self, query: &mut IndexQuery, value: &ParsedValue, ctx: &FilterContext<'_>) {
        let ParsedValue::Number(number) = value else {
            return;
        };
        let operator = self.compare.operator();
        let (column, param) = match &self.source {
            StepperSource::Field(_) => (
                IndexQuery::column(&self.column()),
                scaled(*number, step_multiplier(self.step)),
            ),
            StepperSource::Pricing => (join_min_price(query, ctx), SqlParam::float(*number)),
            StepperSource::Priority => (IndexQuery::column(PRIORITY_COLUMN), scaled(*number, 1.0)),
            StepperSource::Addon(addon) => {
                constrain_pricing_column(
                    query,
                    ctx,
                    &self.key,
                    addon.column(),
                    operator,
                    SqlParam::float(*number),
                );
                return;
            }
        };
        query.filter(SqlFragment::with_params(
            format!("{} {} ?", column, operator),
            vec![param],
        ));
    }

    fn controls(&self) -> Vec<ControlSpec> {
        let mut controls = common_controls(&self.label);
        controls.push(
            ControlSpec::select(
                "compare",
                "Comparison",
                &[
                    ("equals", "Equals"),
                    ("greater_or_equal", "Greater or equal"),
                    ("less_or_equal", "Less or equal"),
                ],
            )
            .with_default("greater_or_equal"),
        );
        controls.push(ControlSpec::number("step", "Step").with_default(self.step));
        controls
    }

    fn default_value(&self) -> Option<String> {
        self.default.clone()
    }
}
