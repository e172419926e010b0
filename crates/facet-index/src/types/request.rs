//! Search request types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value::RawValue;

/// An opt-in ordering requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "filter", rename_all = "snake_case")]
pub enum OrderRequest {
    /// Order by full-text relevance of a keywords filter.
    Relevance(String),
    /// Order by distance from a location filter's reference point.
    Distance(String),
    /// Order by the next occurrence of a recurring date filter.
    Upcoming(String),
}

/// One search request against a content type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Submitted values keyed by filter key.
    #[serde(default)]
    pub values: BTreeMap<String, RawValue>,
    /// Requested ordering.
    #[serde(default)]
    pub order: Option<OrderRequest>,
    /// Zero-based page number.
    #[serde(default)]
    pub page: u32,
    /// Page size; falls back to the configured default.
    #[serde(default)]
    pub per_page: Option<u32>,
    /// The user performing the search, if signed in.
    #[serde(default)]
    pub viewer_id: Option<u64>,
}

impl SearchRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a submitted value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Sets the ordering.
    pub fn with_order(mut self, order: OrderRequest) -> Self {
        self.order = Some(order);
        self
    }

    /// Sets the page.
    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = Some(per_page);
        self
    }

    /// Sets the viewer.
    pub fn with_viewer(mut self, viewer_id: u64) -> Self {
        self.viewer_id = Some(viewer_id);
        self
    }

    /// Returns the submitted value for a filter key.
    pub fn value(&self, key: &str) -> Option<&RawValue> {
        self.values.get(key)
    }
}
