//! Faceted search over denormalized index tables.
//!
//! Each content type gets one index table. Its columns are declared by the
//! filters configured for the content type, its rows are produced from content
//! items by the same filters, and search requests are compiled by them into a
//! single SQL statement against it.
//!
//! # Architecture
//!
//! - [`config`] - search configuration and defaults
//! - [`types`] - content item contract, raw and parsed filter values, requests
//! - [`sql`] - parameterized fragments and the spatial dialect abstraction
//! - [`schema`] - index table schema builder and row upserts
//! - [`query`] - index query compiler
//! - [`keywords`] - keyword normalization shared by indexing and querying
//! - [`geo`] - bounding box decomposition and radius buffers
//! - [`terms`] - term store contract and term list cache
//! - [`conditions`] - conditional filter visibility
//! - [`filters`] - the filter contract and its variants
//! - [`registry`] - per content type filter lists
//! - [`backend`] - relational backend contract
//! - [`service`] - the [`FacetIndex`] entry point
//!
//! # Compiling a search
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use facet_index::config::SearchConfig;
//! use facet_index::filters::FilterContext;
//! use facet_index::query::IndexQuery;
//! use facet_index::registry::ContentTypeFilters;
//! use facet_index::terms::{StaticTermStore, TermCache};
//! use facet_index::types::SearchRequest;
//!
//! let filters = ContentTypeFilters::from_json(
//!     "place",
//!     r#"[
//!         {"type": "keywords", "key": "q", "sources": ["title"]},
//!         {"type": "range", "key": "price", "source": "pricing"}
//!     ]"#,
//! )
//! .unwrap();
//!
//! let config = SearchConfig::default();
//! let terms = TermCache::new(Arc::new(StaticTermStore::new()), Duration::from_secs(60));
//! let ctx = FilterContext::new("place", &config, &terms);
//!
//! let request = SearchRequest::new()
//!     .with_value("q", "pizza")
//!     .with_value("price", "10..25");
//!
//! let mut query = IndexQuery::new(config.index_table("place"));
//! for filter in filters.active_for(&request, &ctx) {
//!     filter.query(&mut query, request.value(filter.key()), &ctx);
//! }
//! let compiled = query.compile();
//!
//! assert!(compiled.statement.sql.starts_with("SELECT `idx`.`item_id`"));
//! assert!(compiled.statement.sql.contains("MATCH(`idx`.`filter_q`)"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod conditions;
pub mod config;
pub mod error;
pub mod filters;
pub mod geo;
pub mod keywords;
pub mod query;
pub mod registry;
pub mod schema;
pub mod service;
pub mod sql;
pub mod terms;
pub mod types;

// Re-export commonly used types at crate root
pub use backend::IndexBackend;
pub use config::SearchConfig;
pub use error::{BackendError, ConfigError, FacetError, FacetResult};
pub use filters::{Filter, FilterContext, FilterDefinition, FilterKind};
pub use query::{CompiledQuery, IndexQuery};
pub use registry::{ContentTypeFilters, FilterRegistry};
pub use schema::{IndexRow, IndexSchemaBuilder};
pub use service::{FacetIndex, SearchResults};
pub use terms::{TermCache, TermStore};
pub use types::{ContentItem, FieldValue, ParsedValue, RawValue, SearchRequest};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
