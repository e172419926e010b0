//! Taxonomy terms filter.
//!
//! Submitted slugs resolve to term ids through the term cache. `and` requires
//! every term through one existence check each; `or` joins the relationships
//! table once with an IN list. Unknown slugs are dropped.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::query::IndexQuery;
use crate::schema::ITEM_ID_COLUMN;
use crate::sql::{placeholders, qualified, quote_identifier, SqlFragment, SqlParam};
use crate::types::{ParsedValue, RawValue};

use super::controls::{common_controls, ControlSpec};
use super::{Filter, FilterContext};

/// How several selected terms combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermsOperator {
    /// Items must carry every term.
    And,
    /// Items must carry any term.
    #[default]
    Or,
}

/// Taxonomy terms filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsFilter {
    /// Filter key.
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Default wire value.
    #[serde(default)]
    pub default: Option<String>,
    /// Taxonomy name.
    pub taxonomy: String,
    /// Whether several terms may be selected.
    #[serde(default = "default_multiple")]
    pub multiple: bool,
    /// Combination of selected terms.
    #[serde(default)]
    pub operator: TermsOperator,
    /// Whether a term also matches items carrying its descendants.
    #[serde(default = "default_include_children")]
    pub include_children: bool,
}

fn default_multiple() -> bool {
    true
}

fn default_include_children() -> bool {
    true
}

impl TermsFilter {
    /// Creates an OR terms filter.
    pub fn new(key: impl Into<String>, taxonomy: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            default: None,
            taxonomy: taxonomy.into(),
            multiple: default_multiple(),
            operator: TermsOperator::default(),
            include_children: default_include_children(),
        }
    }

    /// Sets the operator.
    pub fn with_operator(mut self, operator: TermsOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Term ids matched by each selected slug.
    fn term_groups(&self, slugs: &[String], ctx: &FilterContext<'_>) -> Vec<Vec<u64>> {
        let list = ctx.terms.term_list(ctx.content_type, &self.key, &self.taxonomy);
        let ids = list.resolve_slugs(slugs);
        if ids.len() < slugs.len() {
            warn!(
                filter = %self.key,
                taxonomy = %self.taxonomy,
                dropped = slugs.len() - ids.len(),
                "unknown term slugs dropped"
            );
        }
        ids.into_iter()
            .map(|id| {
                let mut group = vec![id];
                if self.include_children {
                    group.extend(list.descendants(id));
                }
                group
            })
            .collect()
    }

    fn relationship_table(&self, ctx: &FilterContext<'_>) -> String {
        quote_identifier(&ctx.config.tables.term_relationships)
    }
}

fn id_params(ids: &[u64]) -> Vec<SqlParam> {
    ids.iter().map(|id| SqlParam::integer(*id as i64)).collect()
}

impl Filter for TermsFilter {
    fn key(&self) -> &str {
        &self.key
    }

    fn filter_type(&self) -> &'static str {
        "terms"
    }

    fn parse_value(&self, raw: &RawValue, _ctx: &FilterContext<'_>) -> Option<ParsedValue> {
        let mut slugs: Vec<String> = Vec::new();
        for item in raw.items() {
            if !slugs.iter().any(|s| s == item) {
                slugs.push(item.to_string());
            }
        }
        if !self.multiple {
            slugs.truncate(1);
        }
        (!slugs.is_empty()).then_some(ParsedValue::Terms(slugs))
    }

    fn apply(&self, query: &mut IndexQuery, value: &ParsedValue, ctx: &FilterContext<'_>) {
        let ParsedValue::Terms(slugs) = value else {
            return;
        };
        let groups = self.term_groups(slugs, ctx);
        if groups.is_empty() {
            return;
        }

        let table = self.relationship_table(ctx);
        match self.operator {
            TermsOperator::And => {
                for group in &groups {
                    query.filter(SqlFragment::with_params(
                        format!(
                            "EXISTS (SELECT 1 FROM {table} AS `tr` WHERE `tr`.`object_id` = {item} \
                             AND `tr`.`term_id` IN ({ids}))",
                            table = table,
                            item = IndexQuery::column(ITEM_ID_COLUMN),
                            ids = placeholders(group.len()),
                        ),
                        id_params(group),
                    ));
                }
            }
            TermsOperator::Or => {
                let mut ids: Vec<u64> = Vec::new();
                for id in groups.into_iter().flatten() {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                let alias = format!("terms_{}", self.key);
                query.join(
                    alias.clone(),
                    SqlFragment::with_params(
                        format!(
                            "INNER JOIN {} AS {} ON {} = {} AND {} IN ({})",
                            table,
                            quote_identifier(&alias),
                            qualified(&alias, "object_id"),
                            IndexQuery::column(ITEM_ID_COLUMN),
                            qualified(&alias, "term_id"),
                            placeholders(ids.len()),
                        ),
                        id_params(&ids),
                    ),
                );
                query.group_by_item();
            }
        }
    }

    fn controls(&self) -> Vec<ControlSpec> {
        let mut controls = common_controls(&self.label);
        controls.push(ControlSpec::text("taxonomy", "Taxonomy"));
        controls.push(ControlSpec::switcher("multiple", "Allow multiple").with_default(self.multiple));
        controls.push(
            ControlSpec::select("operator", "Match", &[("or", "Any term"), ("and", "All terms")])
                .with_default("or"),
        );
        controls
    }

    fn default_value(&self) -> Option<String> {
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::filters::test_support::{context, term_cache};

    fn compile(filter: &TermsFilter, raw: &str) -> crate::query::CompiledQuery {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let mut query = IndexQuery::new("facets_place");
        filter.query(&mut query, Some(&RawValue::single(raw)), &ctx);
        query.compile()
    }

    #[test]
    fn test_parse_slugs() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let mut filter = TermsFilter::new("cuisine", "cuisine");

        let value = filter.parse_value(&RawValue::single("pizza, thai,pizza"), &ctx).unwrap();
        assert_eq!(value, ParsedValue::Terms(vec!["pizza".to_string(), "thai".to_string()]));
        assert_eq!(value.to_wire(), "pizza,thai");

        filter.multiple = false;
        assert_eq!(
            filter.parse_value(&RawValue::single("pizza,thai"), &ctx),
            Some(ParsedValue::Terms(vec!["pizza".to_string()]))
        );
        assert_eq!(filter.parse_value(&RawValue::single(" , "), &ctx), None);
    }

    #[test]
    fn test_or_joins_once_with_in_list() {
        let filter = TermsFilter::new("cuisine", "cuisine");
        let compiled = compile(&filter, "italian,thai");
        assert!(compiled.statement.sql.contains(
            "INNER JOIN `term_relationships` AS `terms_cuisine` ON `terms_cuisine`.`object_id` = `idx`.`item_id` \
             AND `terms_cuisine`.`term_id` IN (?, ?, ?)"
        ));
        assert!(compiled.statement.sql.contains("GROUP BY `idx`.`item_id`"));
        assert_eq!(
            compiled.statement.params,
            vec![SqlParam::integer(2), SqlParam::integer(3), SqlParam::integer(4)]
        );
    }

    #[test]
    fn test_and_adds_one_exists_per_term() {
        let mut filter = TermsFilter::new("cuisine", "cuisine").with_operator(TermsOperator::And);
        filter.include_children = false;
        let compiled = compile(&filter, "pizza,thai");
        assert_eq!(compiled.statement.sql.matches("EXISTS (SELECT 1 FROM `term_relationships`").count(), 2);
        assert!(!compiled.statement.sql.contains("JOIN"));
        assert_eq!(
            compiled.statement.params,
            vec![SqlParam::integer(3), SqlParam::integer(4)]
        );
    }

    #[test]
    fn test_query_twice_compiles_like_once() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let raw = RawValue::single("pizza,thai");

        for operator in [TermsOperator::And, TermsOperator::Or] {
            let filter = TermsFilter::new("cuisine", "cuisine").with_operator(operator);
            let mut twice = IndexQuery::new("facets_place");
            filter.query(&mut twice, Some(&raw), &ctx);
            filter.query(&mut twice, Some(&raw), &ctx);
            assert_eq!(twice.compile(), compile(&filter, "pizza,thai"));
        }
    }

    #[test]
    fn test_unknown_slugs_are_dropped() {
        let filter = TermsFilter::new("cuisine", "cuisine");
        let compiled = compile(&filter, "missing");
        assert!(!compiled.statement.sql.contains("JOIN"));

        let compiled = compile(&filter, "missing,thai");
        assert_eq!(compiled.statement.params, vec![SqlParam::integer(4)]);
    }
}
