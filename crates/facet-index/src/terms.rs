//! Taxonomy term lookups.
//!
//! [`TermStore`] is the platform's taxonomy service. [`TermCache`] is a
//! read-through cache of whole term lists keyed by content type, filter and
//! taxonomy version. A version bump makes old entries unreachable; they are
//! evicted on the next write for the same filter or by [`TermCache::invalidate`].
//! Concurrent writers race and the last one wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// A taxonomy term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Term identifier.
    pub id: u64,
    /// URL slug, unique within the taxonomy.
    pub slug: String,
    /// Display label.
    pub label: String,
    /// Parent term identifier.
    #[serde(default)]
    pub parent: Option<u64>,
}

impl Term {
    /// Creates a top-level term.
    pub fn new(id: u64, slug: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            label: label.into(),
            parent: None,
        }
    }

    /// Sets the parent term.
    pub fn with_parent(mut self, parent: u64) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// The platform taxonomy service.
pub trait TermStore: Send + Sync {
    /// All terms of a taxonomy. Unknown taxonomies yield an empty list.
    fn terms(&self, taxonomy: &str) -> Vec<Term>;

    /// Version of a taxonomy; changes whenever its terms change.
    fn version(&self, taxonomy: &str) -> u64;
}

/// An indexed term list with slug, label and hierarchy lookups.
#[derive(Debug, Clone, Default)]
pub struct TermList {
    terms: Vec<Term>,
    by_id: HashMap<u64, usize>,
    by_slug: HashMap<String, usize>,
}

impl TermList {
    /// Indexes a list of terms.
    pub fn new(terms: Vec<Term>) -> Self {
        let by_id = terms.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        let by_slug = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.slug.clone(), i))
            .collect();
        Self {
            terms,
            by_id,
            by_slug,
        }
    }

    /// All terms.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Looks up a term by id.
    pub fn get(&self, id: u64) -> Option<&Term> {
        self.by_id.get(&id).map(|&i| &self.terms[i])
    }

    /// Looks up a term by slug.
    pub fn by_slug(&self, slug: &str) -> Option<&Term> {
        self.by_slug.get(slug).map(|&i| &self.terms[i])
    }

    /// Resolves slugs to ids, dropping unknown slugs and duplicates.
    pub fn resolve_slugs<S: AsRef<str>>(&self, slugs: &[S]) -> Vec<u64> {
        let mut ids = Vec::new();
        for slug in slugs {
            match self.by_slug(slug.as_ref()) {
                Some(term) if !ids.contains(&term.id) => ids.push(term.id),
                Some(_) => {}
                None => trace!(slug = slug.as_ref(), "unknown term slug"),
            }
        }
        ids
    }

    /// Label of a term.
    pub fn label(&self, id: u64) -> Option<&str> {
        self.get(id).map(|t| t.label.as_str())
    }

    /// Ancestor ids from parent to root. Cycles are cut.
    pub fn ancestors(&self, id: u64) -> Vec<u64> {
        let mut ancestors = Vec::new();
        let mut current = self.get(id).and_then(|t| t.parent);
        while let Some(parent) = current {
            if parent == id || ancestors.contains(&parent) {
                break;
            }
            ancestors.push(parent);
            current = self.get(parent).and_then(|t| t.parent);
        }
        ancestors
    }

    /// Descendant ids, breadth first.
    pub fn descendants(&self, id: u64) -> Vec<u64> {
        let mut descendants: Vec<u64> = Vec::new();
        let mut frontier = vec![id];
        while let Some(parent) = frontier.pop() {
            for term in &self.terms {
                if term.parent == Some(parent) && term.id != id && !descendants.contains(&term.id) {
                    descendants.push(term.id);
                    frontier.push(term.id);
                }
            }
        }
        descendants
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    content_type: String,
    filter_key: String,
    taxonomy: String,
}

#[derive(Debug)]
struct CacheEntry {
    version: u64,
    stored_at: Instant,
    list: Arc<TermList>,
}

/// Read-through cache of term lists.
pub struct TermCache {
    store: Arc<dyn TermStore>,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl std::fmt::Debug for TermCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl TermCache {
    /// Creates a cache in front of a term store.
    pub fn new(store: Arc<dyn TermStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn TermStore> {
        &self.store
    }

    /// Returns the term list of `taxonomy` as seen by one filter.
    pub fn term_list(&self, content_type: &str, filter_key: &str, taxonomy: &str) -> Arc<TermList> {
        let key = CacheKey {
            content_type: content_type.to_string(),
            filter_key: filter_key.to_string(),
            taxonomy: taxonomy.to_string(),
        };
        let version = self.store.version(taxonomy);

        if let Some(entry) = self.entries.read().get(&key) {
            if entry.version == version && entry.stored_at.elapsed() < self.ttl {
                trace!(content_type, filter_key, taxonomy, "term cache hit");
                return Arc::clone(&entry.list);
            }
        }

        debug!(content_type, filter_key, taxonomy, version, "term cache miss");
        let list = Arc::new(TermList::new(self.store.terms(taxonomy)));
        self.entries.write().insert(
            key,
            CacheEntry {
                version,
                stored_at: Instant::now(),
                list: Arc::clone(&list),
            },
        );
        list
    }

    /// Drops every cached list of a taxonomy.
    pub fn invalidate(&self, taxonomy: &str) {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.taxonomy != taxonomy);
        debug!(taxonomy, evicted = before - entries.len(), "term cache invalidated");
    }

    /// Number of cached lists.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// A fixed in-memory term store.
#[derive(Debug, Default)]
pub struct StaticTermStore {
    taxonomies: RwLock<HashMap<String, (u64, Vec<Term>)>>,
}

impl StaticTermStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a taxonomy's terms and bumps its version.
    pub fn set_terms(&self, taxonomy: impl Into<String>, terms: Vec<Term>) {
        let mut taxonomies = self.taxonomies.write();
        let entry = taxonomies.entry(taxonomy.into()).or_default();
        entry.0 += 1;
        entry.1 = terms;
    }
}

impl TermStore for StaticTermStore {
    fn terms(&self, taxonomy: &str) -> Vec<Term> {
        self.taxonomies
            .read()
            .get(taxonomy)
            .map(|(_, terms)| terms.clone())
            .unwrap_or_default()
    }

    fn version(&self, taxonomy: &str) -> u64 {
        self.taxonomies
            .read()
            .get(taxonomy)
            .map(|(version, _)| *version)
            .unwrap_or_default()
    }
}
