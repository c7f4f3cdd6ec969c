//! A node hosting named indices behind the security filter.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docshield_core::query::{CacheStats, ResultCache, ResultKey, SearchQuery, SearchResponse, Searcher};
use docshield_core::security::{CacheKeyMode, IndexSettings, RequestContext, WrapOrchestrator};
use docshield_core::segment::{IndexReader, MemoryIndex};
use docshield_proto::{FilterExpr, Value};
use tracing::{debug, info};

use crate::config::NodeConfig;
use crate::error::{Error, Result};

struct IndexEntry {
    index: MemoryIndex,
    settings: IndexSettings,
    orchestrator: WrapOrchestrator,
}

impl IndexEntry {
    /// Whether responses for this index may be cached.
    ///
    /// Passthrough keys do not distinguish security contexts, so caching
    /// would share results between callers.
    fn cacheable(&self) -> bool {
        !self.settings.security.enabled || self.settings.security.cache_key_mode == CacheKeyMode::Composite
    }
}

/// Named indices plus a shared result cache.
///
/// Every read takes the caller's [`RequestContext`] and goes through the
/// index's [`WrapOrchestrator`], so callers only ever see what their
/// security context permits.
pub struct Node {
    indices: DashMap<String, Arc<IndexEntry>>,
    cache: ResultCache,
}

impl Node {
    /// Create a node.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            indices: DashMap::new(),
            cache: ResultCache::new(config.result_cache_entries),
        }
    }

    /// Create an index.
    pub fn create_index(&self, name: &str, settings: IndexSettings) -> Result<()> {
        match self.indices.entry(name.to_string()) {
            Entry::Occupied(_) => Err(Error::IndexExists(name.to_string())),
            Entry::Vacant(slot) => {
                info!(
                    index = name,
                    filtering = settings.security.enabled,
                    "created index"
                );
                slot.insert(Arc::new(IndexEntry {
                    index: MemoryIndex::new(name),
                    orchestrator: WrapOrchestrator::new(name, &settings),
                    settings,
                }));
                Ok(())
            }
        }
    }

    /// Create an index from a JSON settings document.
    ///
    /// See [`IndexSettings::from_json`] for the accepted format.
    pub fn create_index_from_json(&self, name: &str, settings: &str) -> Result<()> {
        self.create_index(name, IndexSettings::from_json(settings)?)
    }

    /// Names of all indices, sorted.
    pub fn indices(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indices.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Settings of an index.
    pub fn settings(&self, name: &str) -> Result<IndexSettings> {
        Ok(self.entry(name)?.settings.clone())
    }

    /// Buffer a document. It becomes searchable after [`refresh`](Self::refresh).
    pub fn index(&self, name: &str, fields: Vec<(&str, Value)>) -> Result<()> {
        self.entry(name)?.index.add(fields);
        Ok(())
    }

    /// Delete documents whose `field` contains `term`.
    pub fn delete_by_term(&self, name: &str, field: &str, term: &str) -> Result<usize> {
        Ok(self.entry(name)?.index.delete_by_term(field, term))
    }

    /// Publish buffered changes and return the new generation.
    pub fn refresh(&self, name: &str) -> Result<u64> {
        let entry = self.entry(name)?;
        let before = entry.index.snapshot().generation();
        let generation = entry.index.refresh().generation();
        if generation != before {
            self.cache.invalidate_index(name);
        }
        Ok(generation)
    }

    /// Open the current snapshot of an index for `request`.
    pub fn open(&self, request: &RequestContext, name: &str) -> Result<Arc<dyn IndexReader>> {
        let entry = self.entry(name)?;
        self.open_entry(request, &entry)
    }

    /// Search an index.
    pub fn search(&self, request: &RequestContext, name: &str, query: &SearchQuery) -> Result<Arc<SearchResponse>> {
        let entry = self.entry(name)?;
        let reader = self.open_entry(request, &entry)?;

        let key = if entry.cacheable() {
            ResultKey::new(reader.reader_cache_key(), query)
        } else {
            None
        };

        if let Some(key) = &key {
            if let Some(response) = self.cache.get(key) {
                debug!(index = name, request = request.id(), "result cache hit");
                return Ok(response);
            }
        }

        let response = Arc::new(Searcher::search(reader.as_ref(), query)?);
        if let Some(key) = key {
            self.cache.insert(key, Arc::clone(&response));
        }
        Ok(response)
    }

    /// Count documents matching `filter`.
    pub fn count(&self, request: &RequestContext, name: &str, filter: Option<&FilterExpr>) -> Result<u64> {
        let reader = self.open(request, name)?;
        Ok(Searcher::count(reader.as_ref(), filter)?)
    }

    /// Names of the fields visible to `request`.
    pub fn field_names(&self, request: &RequestContext, name: &str) -> Result<Vec<String>> {
        let reader = self.open(request, name)?;
        Ok(Searcher::field_names(reader.as_ref()))
    }

    /// Result cache statistics.
    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    fn entry(&self, name: &str) -> Result<Arc<IndexEntry>> {
        self.indices
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::IndexNotFound(name.to_string()))
    }

    fn open_entry(&self, request: &RequestContext, entry: &IndexEntry) -> Result<Arc<dyn IndexReader>> {
        let snapshot: Arc<dyn IndexReader> = entry.index.snapshot();
        Ok(entry.orchestrator.wrap_index(request, snapshot)?)
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(NodeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshield_core::security::SecurityError;

    #[test]
    fn test_create_index_twice() {
        let node = Node::default();
        node.create_index("a", IndexSettings::default()).unwrap();
        assert!(matches!(
            node.create_index("a", IndexSettings::default()),
            Err(Error::IndexExists(_))
        ));
        assert_eq!(node.indices(), vec!["a".to_string()]);
    }

    #[test]
    fn test_unknown_index() {
        let node = Node::default();
        let request = RequestContext::new();
        assert!(matches!(
            node.search(&request, "missing", &SearchQuery::all()),
            Err(Error::IndexNotFound(name)) if name == "missing"
        ));
        assert!(matches!(node.refresh("missing"), Err(Error::IndexNotFound(_))));
    }

    #[test]
    fn test_invalid_settings() {
        let node = Node::default();
        let result = node.create_index_from_json("a", r#"{"docshield":{"enable":1}}"#);
        assert!(matches!(result, Err(Error::Security(SecurityError::Configuration(_)))));
        assert!(node.indices().is_empty());
    }

    #[test]
    fn test_refresh_invalidates_cache() {
        let node = Node::default();
        node.create_index("a", IndexSettings::default()).unwrap();
        node.index("a", vec![("title", "a1".into())]).unwrap();
        assert_eq!(node.refresh("a").unwrap(), 1);

        let request = RequestContext::new();
        assert_eq!(node.search(&request, "a", &SearchQuery::all()).unwrap().total, 1);
        assert_eq!(node.search(&request, "a", &SearchQuery::all()).unwrap().total, 1);
        assert_eq!(node.cache_stats().hits(), 1);

        node.index("a", vec![("title", "a2".into())]).unwrap();
        assert_eq!(node.refresh("a").unwrap(), 2);
        assert_eq!(node.search(&request, "a", &SearchQuery::all()).unwrap().total, 2);
    }
}
