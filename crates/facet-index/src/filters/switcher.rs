//! Switcher filter.
//!
//! An enabled switch requires a boolean flag; a disabled switch contributes
//! nothing.

use serde::{Deserialize, Serialize};

use crate::query::IndexQuery;
use crate::schema::{ColumnDef, ColumnType, IndexSchemaBuilder, IndexValues, KeyDef, KeyKind};
use crate::sql::{SqlFragment, SqlParam};
use crate::types::{is_truthy, resolve_path, ContentItem, ParsedValue, RawValue};

use super::controls::{common_controls, ControlSpec};
use super::pricing::{constrain_pricing_column, AddonAttribute};
use super::{Filter, FilterContext};

/// Where the flag comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitcherSource {
    /// A boolean item field, indexed into the filter's column.
    Field(String),
    /// A boolean add-on attribute of a priced sub-entity.
    Addon(AddonAttribute),
    /// The stock flag of a priced sub-entity.
    InStock,
}

/// Boolean switch filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitcherFilter {
    /// Filter key.
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Default wire value.
    #[serde(default)]
    pub default: Option<String>,
    /// Flag source.
    pub source: SwitcherSource,
}

impl SwitcherFilter {
    /// Creates a switcher.
    pub fn new(key: impl Into<String>, source: SwitcherSource) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            default: None,
            source,
        }
    }
}

impl Filter for SwitcherFilter {
    fn key(&self) -> &str {
        &self.key
    }

    fn filter_type(&self) -> &'static str {
        "switcher"
    }

    fn setup(&self, schema: &mut IndexSchemaBuilder) {
        if let SwitcherSource::Field(_) = self.source {
            schema.add_column(
                ColumnDef::new(self.column(), ColumnType::Bool)
                    .not_null()
                    .with_default("0"),
            );
            schema.add_key(KeyDef::on(KeyKind::Index, self.column()));
        }
    }

    fn index(&self, item: &dyn ContentItem, _ctx: &FilterContext<'_>) -> IndexValues {
        let mut values = IndexValues::new();
        if let SwitcherSource::Field(path) = &self.source {
            let enabled = resolve_path(item, path).iter().any(|v| v.as_bool());
            values.insert(
                self.column(),
                SqlFragment::param(SqlParam::integer(i64::from(enabled))),
            );
        }
        values
    }

    fn parse_value(&self, raw: &RawValue, _ctx: &FilterContext<'_>) -> Option<ParsedValue> {
        is_truthy(raw.as_str()?).then_some(ParsedValue::Bool(true))
    }

    fn apply(&self, query: &mut IndexQuery, value: &ParsedValue, ctx: &FilterContext<'_>) {
        if value != &ParsedValue::Bool(true) {
            return;
        }
        match &self.source {
            SwitcherSource::Field(_) => query.filter(SqlFragment::with_params(
                format!("{} = ?", IndexQuery::column(&self.column())),
                vec![SqlParam::integer(1)],
            )),
            SwitcherSource::Addon(addon) => constrain_pricing_column(
                query,
                ctx,
                &self.key,
                addon.column(),
                "=",
                SqlParam::integer(1),
            ),
            SwitcherSource::InStock => constrain_pricing_column(
                query,
                ctx,
                &self.key,
                "in_stock".to_string(),
                "=",
                SqlParam::integer(1),
            ),
        }
    }

    fn controls(&self) -> Vec<ControlSpec> {
        let mut controls = common_controls(&self.label);
        controls.push(ControlSpec::switcher("default", "Enabled by default").with_default(
            self.default.as_deref().map(is_truthy).unwrap_or(false),
        ));
        controls
    }

    fn default_value(&self) -> Option<String> {
        self.default.clone()
    }
}
