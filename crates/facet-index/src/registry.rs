//! Filter registry.
//!
//! Holds the configured filter list of every content type, validates it once
//! at registration and answers the two questions asked per request: which
//! filters are active, and which columns the index table needs.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::conditions::ParsedValues;
use crate::filters::{Filter, FilterContext, FilterDefinition};
use crate::schema::IndexSchemaBuilder;
use crate::sql::dialect_for;
use crate::types::{RawValue, SearchRequest};

/// Filter keys and content type names end up in column names, table names
/// and request parameters.
fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 48
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// The validated filter list of one content type.
#[derive(Debug, Clone)]
pub struct ContentTypeFilters {
    content_type: String,
    filters: Vec<FilterDefinition>,
}

impl ContentTypeFilters {
    /// Validates a filter list.
    ///
    /// Keys must be unique identifiers. Conditions referencing unknown filters
    /// are kept; they simply never hold.
    pub fn new(content_type: impl Into<String>, filters: Vec<FilterDefinition>) -> ConfigResult<Self> {
        let content_type = content_type.into();
        if !is_valid_identifier(&content_type) {
            return Err(ConfigError::InvalidContentType { content_type });
        }

        let mut seen = HashSet::new();
        for definition in &filters {
            let key = definition.key();
            if !is_valid_identifier(key) {
                return Err(ConfigError::InvalidFilterKey { key: key.to_string() });
            }
            if !seen.insert(key.to_string()) {
                return Err(ConfigError::DuplicateFilterKey {
                    content_type,
                    key: key.to_string(),
                });
            }
        }

        for definition in &filters {
            for referenced in definition.conditions.referenced_filters() {
                if referenced == definition.key() || !seen.contains(referenced) {
                    warn!(
                        content_type = %content_type,
                        filter = definition.key(),
                        referenced,
                        "condition references an unusable filter"
                    );
                }
            }
        }

        Ok(Self {
            content_type,
            filters,
        })
    }

    /// Parses a JSON filter list.
    pub fn from_json(content_type: impl Into<String>, json: &str) -> ConfigResult<Self> {
        let filters: Vec<FilterDefinition> = serde_json::from_str(json)?;
        Self::new(content_type, filters)
    }

    /// Content type name.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// All configured filters in order.
    pub fn filters(&self) -> &[FilterDefinition] {
        &self.filters
    }

    /// Looks up a filter by key.
    pub fn get(&self, key: &str) -> Option<&FilterDefinition> {
        self.filters.iter().find(|f| f.key() == key)
    }

    /// Number of configured filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if no filters are configured.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Parses every submitted value with its filter; malformed and unknown
    /// values are left out.
    pub fn parse_values(&self, values: &BTreeMap<String, RawValue>, ctx: &FilterContext<'_>) -> ParsedValues {
        self.filters
            .iter()
            .filter_map(|definition| {
                let filter = definition.as_filter();
                let parsed = filter.parse_value(values.get(filter.key())?, ctx)?;
                Some((filter.key().to_string(), parsed))
            })
            .collect()
    }

    /// Filters whose conditions hold for the submitted values, in order.
    pub fn active_filters<'a>(
        &'a self,
        values: &BTreeMap<String, RawValue>,
        ctx: &FilterContext<'_>,
    ) -> Vec<&'a dyn Filter> {
        let parsed = self.parse_values(values, ctx);
        self.filters
            .iter()
            .filter(|definition| {
                let visible = definition.conditions.evaluate(&parsed);
                if !visible {
                    debug!(filter = definition.key(), "conditions not met, filter inactive");
                }
                visible
            })
            .map(FilterDefinition::as_filter)
            .collect()
    }

    /// Active filters for a request.
    pub fn active_for(&self, request: &SearchRequest, ctx: &FilterContext<'_>) -> Vec<&dyn Filter> {
        self.active_filters(&request.values, ctx)
    }

    /// Collects every filter's columns into the content type's table schema.
    pub fn schema(&self, config: &SearchConfig) -> IndexSchemaBuilder {
        let mut schema = IndexSchemaBuilder::new(
            config.index_table(&self.content_type),
            dialect_for(config.dialect),
        );
        for definition in &self.filters {
            definition.as_filter().setup(&mut schema);
        }
        schema
    }
}

/// Filter lists of all registered content types.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    content_types: BTreeMap<String, ContentTypeFilters>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a content type, replacing any earlier filter list.
    pub fn register(&mut self, filters: ContentTypeFilters) -> Option<ContentTypeFilters> {
        debug!(
            content_type = filters.content_type(),
            filters = filters.len(),
            "registered content type filters"
        );
        self.content_types
            .insert(filters.content_type.clone(), filters)
    }

    /// Removes a content type.
    pub fn unregister(&mut self, content_type: &str) -> Option<ContentTypeFilters> {
        self.content_types.remove(content_type)
    }

    /// Filter list of a content type.
    pub fn get(&self, content_type: &str) -> Option<&ContentTypeFilters> {
        self.content_types.get(content_type)
    }

    /// Registered content type names.
    pub fn content_types(&self) -> impl Iterator<Item = &str> {
        self.content_types.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{Condition, ConditionGroups, ConditionOperator};
    use crate::filters::test_support::{context, term_cache};
    use crate::filters::{
        FilterKind, KeywordsFilter, LocationFilter, RangeFilter, RangeSource, SwitcherFilter, SwitcherSource,
    };

    fn keywords(key: &str) -> FilterDefinition {
        FilterDefinition::new(FilterKind::Keywords(KeywordsFilter::new(key, &["title"])))
    }

    fn price() -> FilterDefinition {
        FilterDefinition::new(FilterKind::Range(RangeFilter::new("price", RangeSource::Pricing)))
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let err = ContentTypeFilters::new("place", vec![keywords("q"), keywords("q")]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateFilterKey { ref key, .. } if key == "q"));
    }

    #[test]
    fn test_rejects_invalid_identifiers() {
        assert!(matches!(
            ContentTypeFilters::new("place", vec![keywords("Search Box")]),
            Err(ConfigError::InvalidFilterKey { .. })
        ));
        assert!(matches!(
            ContentTypeFilters::new("place`; DROP", vec![]),
            Err(ConfigError::InvalidContentType { .. })
        ));
    }

    #[test]
    fn test_active_filters_follow_conditions() {
        let conditions = ConditionGroups(vec![vec![Condition::new("q", ConditionOperator::NotEmpty, "")]]);
        let filters = ContentTypeFilters::new(
            "place",
            vec![keywords("q"), price().with_conditions(conditions)],
        )
        .unwrap();
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);

        let empty = SearchRequest::new();
        let keys: Vec<&str> = filters.active_for(&empty, &ctx).iter().map(|f| f.key()).collect();
        assert_eq!(keys, vec!["q"]);

        let searched = SearchRequest::new().with_value("q", RawValue::single("pizza"));
        let keys: Vec<&str> = filters.active_for(&searched, &ctx).iter().map(|f| f.key()).collect();
        assert_eq!(keys, vec!["q", "price"]);
    }

    #[test]
    fn test_malformed_values_count_as_empty() {
        let near = FilterDefinition::new(FilterKind::Location(LocationFilter::new("near", "address")));
        let conditions = ConditionGroups(vec![vec![Condition::new("near", ConditionOperator::NotEmpty, "")]]);
        let filters = ContentTypeFilters::new("place", vec![near, keywords("q").with_conditions(conditions)]).unwrap();
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);

        let malformed = SearchRequest::new().with_value("near", "NYC");
        let keys: Vec<&str> = filters.active_for(&malformed, &ctx).iter().map(|f| f.key()).collect();
        assert_eq!(keys, vec!["near"]);
        assert!(filters.parse_values(&malformed.values, &ctx).is_empty());

        let area = SearchRequest::new().with_value("near", "NYC;40.1,-74.1..40.9,-73.1");
        let keys: Vec<&str> = filters.active_for(&area, &ctx).iter().map(|f| f.key()).collect();
        assert_eq!(keys, vec!["near", "q"]);
    }

    #[test]
    fn test_conditions_match_whole_submitted_values() {
        let conditions = ConditionGroups(vec![vec![Condition::new(
            "q",
            ConditionOperator::Equals,
            "Tom's Diner, #1",
        )]]);
        let filters =
            ContentTypeFilters::new("place", vec![keywords("q"), price().with_conditions(conditions)]).unwrap();
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);

        let request = SearchRequest::new().with_value("q", "Tom's Diner, #1");
        let keys: Vec<&str> = filters.active_for(&request, &ctx).iter().map(|f| f.key()).collect();
        assert_eq!(keys, vec!["q", "price"]);
    }

    #[test]
    fn test_schema_collects_filter_columns() {
        let filters = ContentTypeFilters::new(
            "place",
            vec![
                keywords("q"),
                FilterDefinition::new(FilterKind::Switcher(SwitcherFilter::new(
                    "open",
                    SwitcherSource::Field("open_now".to_string()),
                ))),
            ],
        )
        .unwrap();

        let schema = filters.schema(&SearchConfig::default());
        assert_eq!(schema.table(), "facets_place");
        assert!(schema.has_column("filter_q"));
        assert!(schema.has_column("filter_open"));
        assert!(schema.has_column("priority"));
    }

    #[test]
    fn test_from_json_and_register() {
        let filters = ContentTypeFilters::from_json(
            "event",
            r#"[{"type": "recurring_date", "key": "when", "source": "dates"}]"#,
        )
        .unwrap();

        let mut registry = FilterRegistry::new();
        assert!(registry.register(filters).is_none());
        assert_eq!(registry.get("event").map(|f| f.len()), Some(1));
        assert_eq!(registry.content_types().collect::<Vec<_>>(), vec!["event"]);
        assert!(registry.unregister("event").is_some());
        assert!(registry.get("event").is_none());
    }
}
