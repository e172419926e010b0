//! Recording backend and service construction helpers.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use facet_index::config::{DialectKind, SearchConfig};
use facet_index::error::BackendError;
use facet_index::registry::ContentTypeFilters;
use facet_index::sql::SqlFragment;
use facet_index::terms::StaticTermStore;
use facet_index::{FacetIndex, IndexBackend};

use super::fixtures::{place_filters, term_store};

/// Backend that records statements and answers from canned results.
#[derive(Debug)]
pub struct RecordingBackend {
    dialect: DialectKind,
    statements: Mutex<Vec<SqlFragment>>,
    item_ids: Mutex<Vec<u64>>,
    count: Mutex<u64>,
    failure: Mutex<Option<String>>,
}

impl RecordingBackend {
    /// Creates a backend speaking the given dialect.
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            dialect,
            statements: Mutex::new(Vec::new()),
            item_ids: Mutex::new(Vec::new()),
            count: Mutex::new(0),
            failure: Mutex::new(None),
        }
    }

    /// Sets the rows returned by searches.
    pub fn respond_with(&self, item_ids: Vec<u64>, count: u64) {
        *self.item_ids.lock() = item_ids;
        *self.count.lock() = count;
    }

    /// Makes every following statement fail.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock() = Some(message.to_string());
    }

    /// Statements received so far.
    pub fn statements(&self) -> Vec<SqlFragment> {
        self.statements.lock().clone()
    }

    /// The last statement received.
    pub fn last_statement(&self) -> Option<SqlFragment> {
        self.statements.lock().last().cloned()
    }

    fn record(&self, statement: &SqlFragment) -> Result<(), BackendError> {
        if let Some(message) = self.failure.lock().clone() {
            return Err(BackendError::query_failed(self.name(), message));
        }
        self.statements.lock().push(statement.clone());
        Ok(())
    }
}

#[async_trait]
impl IndexBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn dialect(&self) -> DialectKind {
        self.dialect
    }

    async fn execute(&self, statement: &SqlFragment) -> Result<u64, BackendError> {
        self.record(statement)?;
        Ok(1)
    }

    async fn fetch_item_ids(&self, statement: &SqlFragment) -> Result<Vec<u64>, BackendError> {
        self.record(statement)?;
        Ok(self.item_ids.lock().clone())
    }

    async fn fetch_count(&self, statement: &SqlFragment) -> Result<u64, BackendError> {
        self.record(statement)?;
        Ok(*self.count.lock())
    }
}

/// Service over a recording backend with the `place` content type registered.
pub fn create_service(dialect: DialectKind) -> (FacetIndex, Arc<RecordingBackend>, Arc<StaticTermStore>) {
    let backend = Arc::new(RecordingBackend::new(dialect));
    let store = Arc::new(term_store());
    let mut service = FacetIndex::new(SearchConfig::default(), backend.clone(), store.clone());
    let filters = ContentTypeFilters::from_json("place", place_filters())
        .expect("fixture filters are valid");
    service.register(filters);
    (service, backend, store)
}
