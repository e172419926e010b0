//! Facet index service.
//!
//! [`FacetIndex`] ties the pieces together for a host application: it owns the
//! filter registry and the term cache, installs index tables, keeps rows in
//! sync with content items and turns search requests into executed queries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::backend::IndexBackend;
use crate::config::SearchConfig;
use crate::error::{ConfigError, FacetResult};
use crate::filters::FilterContext;
use crate::query::{AddonFilters, CompiledQuery, IndexQuery};
use crate::registry::{ContentTypeFilters, FilterRegistry};
use crate::schema::IndexRow;
use crate::sql::SqlFragment;
use crate::terms::{TermCache, TermStore};
use crate::types::{ContentItem, OrderRequest, SearchRequest};

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matching item ids in result order.
    pub item_ids: Vec<u64>,
    /// Number of matching items across all pages.
    pub total: u64,
    /// Zero-based page number.
    pub page: u32,
    /// Page size used.
    pub per_page: u32,
    /// Add-on constraints applied by the request.
    pub addons: AddonFilters,
}

/// Search and indexing entry point.
#[derive(Debug)]
pub struct FacetIndex {
    config: SearchConfig,
    registry: FilterRegistry,
    terms: TermCache,
    backend: Arc<dyn IndexBackend>,
}

impl FacetIndex {
    /// Creates a service. The backend's dialect overrides the configured one.
    pub fn new(config: SearchConfig, backend: Arc<dyn IndexBackend>, term_store: Arc<dyn TermStore>) -> Self {
        let config = config.with_dialect(backend.dialect());
        let terms = TermCache::new(term_store, config.term_cache.ttl);
        Self {
            config,
            registry: FilterRegistry::new(),
            terms,
            backend,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Registered filter lists.
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Term list cache.
    pub fn terms(&self) -> &TermCache {
        &self.terms
    }

    /// Registers or replaces a content type's filters.
    pub fn register(&mut self, filters: ContentTypeFilters) {
        self.registry.register(filters);
    }

    fn filters(&self, content_type: &str) -> FacetResult<&ContentTypeFilters> {
        self.registry.get(content_type).ok_or_else(|| {
            ConfigError::UnknownContentType {
                content_type: content_type.to_string(),
            }
            .into()
        })
    }

    /// Creates the content type's index table if it does not exist.
    #[instrument(skip(self))]
    pub async fn install(&self, content_type: &str) -> FacetResult<()> {
        let schema = self.filters(content_type)?.schema(&self.config);
        self.backend
            .execute(&SqlFragment::new(schema.create_table_sql()))
            .await?;
        debug!(table = schema.table(), columns = schema.columns().len(), "index table installed");
        Ok(())
    }

    /// Drops and recreates the content type's index table.
    #[instrument(skip(self))]
    pub async fn reinstall(&self, content_type: &str) -> FacetResult<()> {
        let schema = self.filters(content_type)?.schema(&self.config);
        self.backend
            .execute(&SqlFragment::new(schema.drop_table_sql()))
            .await?;
        self.backend
            .execute(&SqlFragment::new(schema.create_table_sql()))
            .await?;
        Ok(())
    }

    /// Builds the index row of an item without writing it.
    pub fn index_row(&self, content_type: &str, item: &dyn ContentItem) -> FacetResult<IndexRow> {
        let filters = self.filters(content_type)?;
        let ctx = FilterContext::new(content_type, &self.config, &self.terms);
        let mut row = IndexRow::new(self.config.index_table(content_type), item.id(), item.priority());
        for definition in filters.filters() {
            row.extend(definition.as_filter().index(item, &ctx));
        }
        Ok(row)
    }

    /// Writes an item's index row.
    pub async fn index_item(&self, content_type: &str, item: &dyn ContentItem) -> FacetResult<()> {
        let row = self.index_row(content_type, item)?;
        self.backend.execute(&row.upsert()).await?;
        debug!(content_type, item_id = row.item_id, "item indexed");
        Ok(())
    }

    /// Removes an item's index row.
    pub async fn remove_item(&self, content_type: &str, item_id: u64) -> FacetResult<()> {
        self.filters(content_type)?;
        let statement = IndexRow::delete(&self.config.index_table(content_type), item_id);
        self.backend.execute(&statement).await?;
        Ok(())
    }

    /// Compiles a search request without executing it.
    pub fn compile(&self, content_type: &str, request: &SearchRequest) -> FacetResult<CompiledQuery> {
        let filters = self.filters(content_type)?;
        let ctx = FilterContext::new(content_type, &self.config, &self.terms).with_viewer(request.viewer_id);
        let active = filters.active_for(request, &ctx);

        let mut query = IndexQuery::new(self.config.index_table(content_type));
        for filter in &active {
            filter.query(&mut query, request.value(filter.key()), &ctx);
        }

        if let Some(order) = &request.order {
            let (key, filter_type) = match order {
                OrderRequest::Relevance(key) => (key, "keywords"),
                OrderRequest::Distance(key) => (key, "location"),
                OrderRequest::Upcoming(key) => (key, "recurring_date"),
            };
            let ordered = active
                .iter()
                .find(|f| f.key() == key && f.filter_type() == filter_type)
                .is_some_and(|f| f.order(&mut query, request.value(key), &ctx));
            if !ordered {
                debug!(filter = %key, filter_type, "ordering not applicable, default order kept");
            }
        }

        query.paginate(request.page, self.config.page_size(request.per_page));
        Ok(query.compile())
    }

    /// Compiles and executes a search request.
    #[instrument(skip(self, request), fields(filters = request.values.len()))]
    pub async fn search(&self, content_type: &str, request: &SearchRequest) -> FacetResult<SearchResults> {
        let compiled = self.compile(content_type, request)?;
        let item_ids = self.backend.fetch_item_ids(&compiled.statement).await?;
        let total = self.backend.fetch_count(&compiled.count).await?;
        debug!(results = item_ids.len(), total, "search executed");

        Ok(SearchResults {
            item_ids,
            total,
            page: request.page,
            per_page: self.config.page_size(request.per_page),
            addons: compiled.addons,
        })
    }
}
