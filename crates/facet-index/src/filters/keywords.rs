//! Keywords filter.
//!
//! Indexes the text of its source fields into one full-text column and
//! matches submitted text in boolean mode, every token a required prefix.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::keywords::{boolean_query, normalize_index};
use crate::query::{Direction, IndexQuery};
use crate::schema::{ColumnDef, ColumnType, IndexSchemaBuilder, IndexValues, KeyDef, KeyKind};
use crate::sql::{SqlFragment, SqlParam};
use crate::types::{resolve_path, ContentItem, FieldValue, ParsedValue, RawValue};

use super::controls::{common_controls, ControlSpec};
use super::{Filter, FilterContext};

/// Full-text keywords filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsFilter {
    /// Filter key.
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Default wire value.
    #[serde(default)]
    pub default: Option<String>,
    /// Source field paths; `repeater.subfield` reaches into rows.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Also index the labels of ancestors of assigned terms.
    #[serde(default)]
    pub include_term_ancestors: bool,
}

impl KeywordsFilter {
    /// Creates a keywords filter over source paths.
    pub fn new(key: impl Into<String>, sources: &[&str]) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            default: None,
            sources: sources.iter().map(|s| s.to_string()).collect(),
            include_term_ancestors: false,
        }
    }

    fn relevance_name(&self) -> String {
        format!("{}_relevance", self.key)
    }

    fn match_expression(&self, query_text: String) -> SqlFragment {
        SqlFragment::with_params(
            format!(
                "MATCH({}) AGAINST(? IN BOOLEAN MODE)",
                IndexQuery::column(&self.column())
            ),
            vec![SqlParam::string(query_text)],
        )
    }

    fn collect_text(&self, value: &FieldValue, ctx: &FilterContext<'_>, out: &mut Vec<String>) {
        match value {
            FieldValue::Text(text) => out.push(text.clone()),
            FieldValue::Number(n) => out.push(n.to_string()),
            FieldValue::Terms { taxonomy, ids } => {
                let list = ctx.terms.term_list(ctx.content_type, &self.key, taxonomy);
                for id in ids {
                    out.extend(list.label(*id).map(str::to_string));
                    if self.include_term_ancestors {
                        out.extend(
                            list.ancestors(*id)
                                .into_iter()
                                .filter_map(|a| list.label(a).map(str::to_string)),
                        );
                    }
                }
            }
            FieldValue::Location(location) => out.push(location.address.clone()),
            FieldValue::Rows(rows) => {
                for row in rows {
                    for child in row.values() {
                        self.collect_text(child, ctx, out);
                    }
                }
            }
            FieldValue::Empty | FieldValue::Bool(_) | FieldValue::Recurrence(_) => {}
        }
    }

    /// Raw text gathered from the item's sources.
    pub fn source_text(&self, item: &dyn ContentItem, ctx: &FilterContext<'_>) -> String {
        let mut parts = Vec::new();
        for source in &self.sources {
            for value in resolve_path(item, source) {
                self.collect_text(&value, ctx, &mut parts);
            }
        }
        parts.join(" ")
    }

    fn boolean_query(&self, raw: Option<&RawValue>, ctx: &FilterContext<'_>) -> Option<String> {
        match raw.and_then(|raw| self.parse_value(raw, ctx)) {
            Some(ParsedValue::Text(text)) => boolean_query(&text, &ctx.config.keywords),
            _ => None,
        }
    }
}

impl Filter for KeywordsFilter {
    fn key(&self) -> &str {
        &self.key
    }

    fn filter_type(&self) -> &'static str {
        "keywords"
    }

    fn setup(&self, schema: &mut IndexSchemaBuilder) {
        schema.add_column(ColumnDef::new(self.column(), ColumnType::Text));
        schema.add_key(KeyDef::on(KeyKind::Fulltext, self.column()));
    }

    fn index(&self, item: &dyn ContentItem, ctx: &FilterContext<'_>) -> IndexValues {
        let text = normalize_index(&self.source_text(item, ctx));
        let mut values = IndexValues::new();
        values.insert(self.column(), SqlFragment::param(SqlParam::string(text)));
        values
    }

    fn parse_value(&self, raw: &RawValue, _ctx: &FilterContext<'_>) -> Option<ParsedValue> {
        let text = raw.as_str()?.trim();
        if text.is_empty() {
            return None;
        }
        Some(ParsedValue::Text(text.to_string()))
    }

    fn apply(&self, query: &mut IndexQuery, value: &ParsedValue, ctx: &FilterContext<'_>) {
        let ParsedValue::Text(text) = value else {
            return;
        };
        match boolean_query(text, &ctx.config.keywords) {
            Some(expression) => query.filter(self.match_expression(expression)),
            None => debug!(filter = %self.key, "no searchable keywords left"),
        }
    }

    fn order(&self, query: &mut IndexQuery, raw: Option<&RawValue>, ctx: &FilterContext<'_>) -> bool {
        let Some(expression) = self.boolean_query(raw, ctx) else {
            return false;
        };
        let name = self.relevance_name();
        query.select(name.clone(), self.match_expression(expression));
        query.order_by_select(&name, Direction::Desc);
        true
    }

    fn controls(&self) -> Vec<ControlSpec> {
        let mut controls = common_controls(&self.label);
        controls.push(ControlSpec::text("sources", "Source fields"));
        controls.push(
            ControlSpec::switcher("include_term_ancestors", "Index parent terms")
                .with_default(self.include_term_ancestors),
        );
        controls
    }

    fn default_value(&self) -> Option<String> {
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::SearchConfig;
    use crate::filters::test_support::{context, term_cache};
    use crate::types::{Location, StaticItem};

    fn item() -> StaticItem {
        let mut row = BTreeMap::new();
        row.insert("name".to_string(), FieldValue::Text("Margherita".to_string()));
        StaticItem::new(1)
            .with_field("title", FieldValue::Text("Tom's Diner, #1!".to_string()))
            .with_field(
                "cuisine",
                FieldValue::Terms {
                    taxonomy: "cuisine".to_string(),
                    ids: vec![3],
                },
            )
            .with_field(
                "address",
                FieldValue::Location(Location {
                    address: "12 Main St.".to_string(),
                    point: None,
                }),
            )
            .with_field("menu", FieldValue::Rows(vec![row]))
    }

    fn indexed_text(filter: &KeywordsFilter) -> SqlParam {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let values = filter.index(&item(), &ctx);
        values["filter_q"].params[0].clone()
    }

    #[test]
    fn test_index_normalizes_sources() {
        let filter = KeywordsFilter::new("q", &["title", "cuisine", "address", "menu.name", "missing"]);
        assert_eq!(
            indexed_text(&filter),
            SqlParam::string("toms diner U_23 1 U_21 pizza 12 main st margherita")
        );
    }

    #[test]
    fn test_index_term_ancestors() {
        let mut filter = KeywordsFilter::new("q", &["cuisine"]);
        filter.include_term_ancestors = true;
        assert_eq!(indexed_text(&filter), SqlParam::string("pizza italian food"));
    }

    #[test]
    fn test_setup_declares_fulltext_column() {
        let mut schema = IndexSchemaBuilder::new("facets_place", &crate::sql::MySqlDialect);
        let filter = KeywordsFilter::new("q", &["title"]);
        filter.setup(&mut schema);
        filter.setup(&mut schema);
        assert!(schema.has_column("filter_q"));
        assert_eq!(schema.columns().len(), 3);
        assert!(schema.create_table_sql().contains("FULLTEXT KEY `filter_q` (`filter_q`)"));
    }

    #[test]
    fn test_query_matches_in_boolean_mode() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let filter = KeywordsFilter::new("q", &["title"]);

        let mut query = IndexQuery::new("facets_place");
        filter.query(&mut query, Some(&RawValue::single("Tom's")), &ctx);
        let compiled = query.compile();
        assert!(compiled
            .statement
            .sql
            .contains("MATCH(`idx`.`filter_q`) AGAINST(? IN BOOLEAN MODE)"));
        assert_eq!(compiled.statement.params, vec![SqlParam::string("+toms*")]);
    }

    #[test]
    fn test_absent_and_stopword_only_values_are_inert() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let filter = KeywordsFilter::new("q", &["title"]);

        let mut query = IndexQuery::new("facets_place");
        filter.query(&mut query, None, &ctx);
        filter.query(&mut query, Some(&RawValue::single("   ")), &ctx);
        filter.query(&mut query, Some(&RawValue::single("the of")), &ctx);
        assert_eq!(query.predicate_count(), 0);
    }

    #[test]
    fn test_relevance_order() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let filter = KeywordsFilter::new("q", &["title"]);

        let mut query = IndexQuery::new("facets_place");
        assert!(filter.order(&mut query, Some(&RawValue::single("diner")), &ctx));
        assert!(!filter.order(&mut query, None, &ctx));
        let sql = query.compile().statement.sql;
        assert!(sql.contains("AGAINST(? IN BOOLEAN MODE) AS `q_relevance`"));
        assert!(sql.contains("ORDER BY `q_relevance` DESC"));
    }
}
