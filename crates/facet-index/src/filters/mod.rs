//! Search filters.
//!
//! Every filter variant implements [`Filter`]:
//!
//! - `setup` declares index columns and keys, once per content type
//! - `index` turns a content item into column values
//! - `parse_value` validates a submitted wire value, returning `None` for
//!   anything malformed
//! - `apply` compiles a parsed value into query fragments
//! - `order` is the opt-in ordering some variants provide
//!
//! [`FilterKind`] is the closed set of variants as configured per content
//! type; [`FilterDefinition`] adds visibility conditions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conditions::ConditionGroups;
use crate::config::SearchConfig;
use crate::query::IndexQuery;
use crate::schema::{IndexSchemaBuilder, IndexValues};
use crate::sql::{dialect_for, SpatialDialect};
use crate::terms::TermCache;
use crate::types::{ContentItem, ParsedValue, RawValue};

pub mod controls;
pub mod following;
pub mod keywords;
pub mod location;
pub mod pricing;
pub mod range;
pub mod recurring_date;
pub mod stepper;
pub mod switcher;
pub mod terms;

pub use controls::{ControlOption, ControlSpec, ControlType};
pub use following::FollowingFilter;
pub use keywords::KeywordsFilter;
pub use location::LocationFilter;
pub use pricing::AddonAttribute;
pub use range::{RangeCompare, RangeFilter, RangeHandles, RangeSource};
pub use recurring_date::{DatePreset, RecurringDateFilter};
pub use stepper::{StepperCompare, StepperFilter, StepperSource};
pub use switcher::{SwitcherFilter, SwitcherSource};
pub use terms::{TermsFilter, TermsOperator};

/// Index table column holding a filter's value.
pub fn filter_column(key: &str) -> String {
    format!("filter_{}", key)
}

/// Everything a filter may read besides its own configuration.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// Content type being indexed or searched.
    pub content_type: &'a str,
    /// Search configuration.
    pub config: &'a SearchConfig,
    /// Spatial dialect of the backend.
    pub dialect: &'static dyn SpatialDialect,
    /// Term list cache.
    pub terms: &'a TermCache,
    /// User performing the search.
    pub viewer_id: Option<u64>,
    /// Reference time for relative values.
    pub now: DateTime<Utc>,
}

impl<'a> FilterContext<'a> {
    /// Creates a context for the configured dialect at the current time.
    pub fn new(content_type: &'a str, config: &'a SearchConfig, terms: &'a TermCache) -> Self {
        Self {
            content_type,
            config,
            dialect: dialect_for(config.dialect),
            terms,
            viewer_id: None,
            now: Utc::now(),
        }
    }

    /// Sets the viewer.
    pub fn with_viewer(mut self, viewer_id: Option<u64>) -> Self {
        self.viewer_id = viewer_id;
        self
    }

    /// Sets the reference time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Name of a per content type satellite table.
    pub fn satellite_table(&self, suffix: &str) -> String {
        self.config.satellite_table(self.content_type, suffix)
    }
}

/// The filter contract.
pub trait Filter: fmt::Debug + Send + Sync {
    /// Unique key within the content type; also the request parameter name.
    fn key(&self) -> &str;

    /// Type tag.
    fn filter_type(&self) -> &'static str;

    /// Index table column of this filter.
    fn column(&self) -> String {
        filter_column(self.key())
    }

    /// Declares columns and keys.
    fn setup(&self, _schema: &mut IndexSchemaBuilder) {}

    /// Column values for one content item.
    fn index(&self, _item: &dyn ContentItem, _ctx: &FilterContext<'_>) -> IndexValues {
        IndexValues::new()
    }

    /// Validates a submitted value.
    fn parse_value(&self, raw: &RawValue, ctx: &FilterContext<'_>) -> Option<ParsedValue>;

    /// Compiles a parsed value into the query.
    fn apply(&self, query: &mut IndexQuery, value: &ParsedValue, ctx: &FilterContext<'_>);

    /// Parses and applies a submitted value. Absent values leave the query
    /// unchanged.
    fn query(&self, query: &mut IndexQuery, raw: Option<&RawValue>, ctx: &FilterContext<'_>) {
        match raw.and_then(|raw| self.parse_value(raw, ctx)) {
            Some(value) => self.apply(query, &value, ctx),
            None => debug!(filter = self.key(), "no usable value, filter skipped"),
        }
    }

    /// Orders results by this filter. Returns false if the filter cannot
    /// order or has no usable value.
    fn order(&self, _query: &mut IndexQuery, _raw: Option<&RawValue>, _ctx: &FilterContext<'_>) -> bool {
        false
    }

    /// Editor controls.
    fn controls(&self) -> Vec<ControlSpec>;

    /// Default wire value.
    fn default_value(&self) -> Option<String> {
        None
    }
}

/// The configured variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterKind {
    /// Full-text keywords.
    Keywords(KeywordsFilter),
    /// Area or radius location.
    Location(LocationFilter),
    /// Numeric range.
    Range(RangeFilter),
    /// Single numeric value.
    Stepper(StepperFilter),
    /// Taxonomy terms.
    Terms(TermsFilter),
    /// Boolean switch.
    Switcher(SwitcherFilter),
    /// Recurring dates.
    RecurringDate(RecurringDateFilter),
    /// Items by authors the viewer follows.
    Following(FollowingFilter),
}

impl FilterKind {
    /// The variant as a trait object.
    pub fn as_filter(&self) -> &dyn Filter {
        match self {
            FilterKind::Keywords(f) => f,
            FilterKind::Location(f) => f,
            FilterKind::Range(f) => f,
            FilterKind::Stepper(f) => f,
            FilterKind::Terms(f) => f,
            FilterKind::Switcher(f) => f,
            FilterKind::RecurringDate(f) => f,
            FilterKind::Following(f) => f,
        }
    }
}

/// A filter as configured on a content type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDefinition {
    /// The filter.
    #[serde(flatten)]
    pub filter: FilterKind,
    /// Visibility conditions.
    #[serde(default, skip_serializing_if = "ConditionGroups::is_empty")]
    pub conditions: ConditionGroups,
}

impl FilterDefinition {
    /// Wraps a filter without conditions.
    pub fn new(filter: FilterKind) -> Self {
        Self {
            filter,
            conditions: ConditionGroups::default(),
        }
    }

    /// Sets visibility conditions.
    pub fn with_conditions(mut self, conditions: ConditionGroups) -> Self {
        self.conditions = conditions;
        self
    }

    /// The filter key.
    pub fn key(&self) -> &str {
        self.filter.as_filter().key()
    }

    /// The filter as a trait object.
    pub fn as_filter(&self) -> &dyn Filter {
        self.filter.as_filter()
    }
}
