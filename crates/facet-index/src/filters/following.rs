//! Following filter: items whose author the viewer follows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::query::IndexQuery;
use crate::schema::{ColumnDef, ColumnType, IndexSchemaBuilder, IndexValues, KeyDef, KeyKind, AUTHOR_ID_COLUMN};
use crate::sql::{qualified, quote_identifier, SqlFragment, SqlParam};
use crate::types::{is_truthy, ContentItem, ParsedValue, RawValue};

use super::controls::{common_controls, ControlSpec};
use super::{Filter, FilterContext};

/// Social graph filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowingFilter {
    /// Filter key.
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Default wire value.
    #[serde(default)]
    pub default: Option<String>,
    /// Relation status that counts as following.
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "approved".to_string()
}

impl FollowingFilter {
    /// Creates a following filter.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            default: None,
            status: default_status(),
        }
    }
}

impl Filter for FollowingFilter {
    fn key(&self) -> &str {
        &self.key
    }

    fn filter_type(&self) -> &'static str {
        "following"
    }

    fn setup(&self, schema: &mut IndexSchemaBuilder) {
        schema.add_column(
            ColumnDef::new(AUTHOR_ID_COLUMN, ColumnType::BigIntUnsigned)
                .not_null()
                .with_default("0"),
        );
        schema.add_key(KeyDef::on(KeyKind::Index, AUTHOR_ID_COLUMN));
    }

    fn index(&self, item: &dyn ContentItem, _ctx: &FilterContext<'_>) -> IndexValues {
        let mut values = IndexValues::new();
        values.insert(
            AUTHOR_ID_COLUMN.to_string(),
            SqlFragment::param(SqlParam::integer(item.author_id() as i64)),
        );
        values
    }

    fn parse_value(&self, raw: &RawValue, _ctx: &FilterContext<'_>) -> Option<ParsedValue> {
        is_truthy(raw.as_str()?).then_some(ParsedValue::Bool(true))
    }

    fn apply(&self, query: &mut IndexQuery, value: &ParsedValue, ctx: &FilterContext<'_>) {
        if value != &ParsedValue::Bool(true) {
            return;
        }
        let Some(viewer_id) = ctx.viewer_id else {
            debug!(filter = %self.key, "no viewer, following filter skipped");
            return;
        };

        let alias = format!("following_{}", self.key);
        query.join(
            alias.clone(),
            SqlFragment::with_params(
                format!(
                    "INNER JOIN {} AS {} ON {} = {} AND {} = ? AND {} = ?",
                    quote_identifier(&ctx.config.tables.followers),
                    quote_identifier(&alias),
                    qualified(&alias, "object_id"),
                    IndexQuery::column(AUTHOR_ID_COLUMN),
                    qualified(&alias, "follower_id"),
                    qualified(&alias, "status"),
                ),
                vec![
                    SqlParam::integer(viewer_id as i64),
                    SqlParam::string(self.status.clone()),
                ],
            ),
        );
    }

    fn controls(&self) -> Vec<ControlSpec> {
        let mut controls = common_controls(&self.label);
        controls.push(ControlSpec::text("status", "Follow status").with_default(self.status.clone()));
        controls
    }

    fn default_value(&self) -> Option<String> {
        self.default.clone()
    }
}
