//! Parsed-template caching with LRU eviction.
//!
//! Parsing is pure and a parsed tree is immutable, so templates can be
//! parsed once and rendered many times. The cache is keyed by the raw
//! template text; the integration layer that reads template files can use
//! it to amortize parsing across calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::SqlTemplate;

/// Configuration for the template cache.
#[derive(Debug, Clone)]
pub struct TemplateCacheConfig {
    /// Maximum number of cached templates
    pub max_entries: usize,
    /// Whether caching is enabled
    pub enabled: bool,
}

impl Default for TemplateCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            enabled: true,
        }
    }
}

impl TemplateCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone, Default)]
pub struct TemplateCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_entries: usize,
}

impl TemplateCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A single cached template.
struct CacheEntry {
    template: Arc<SqlTemplate>,
    /// Last access time (for LRU)
    last_accessed: Instant,
}

/// Cache of parsed templates keyed by template text.
pub struct TemplateCache {
    config: TemplateCacheConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
    stats: RwLock<TemplateCacheStats>,
}

impl TemplateCache {
    pub fn new(config: TemplateCacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(TemplateCacheStats::default()),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(TemplateCacheConfig::default())
    }

    /// Get the parsed template for the given text, parsing and caching it
    /// on first use. Parse errors are never cached.
    pub fn get_or_parse(&self, sql: &str) -> Result<Arc<SqlTemplate>> {
        if !self.config.enabled {
            return Ok(Arc::new(SqlTemplate::parse(sql)?));
        }

        {
            let mut entries = self.entries.write();
            if let Some(entry) = entries.get_mut(sql) {
                entry.last_accessed = Instant::now();
                let template = entry.template.clone();
                drop(entries);
                self.stats.write().hits += 1;
                debug!(len = sql.len(), "template cache hit");
                return Ok(template);
            }
        }

        debug!(len = sql.len(), "template cache miss");
        let template = Arc::new(SqlTemplate::parse(sql)?);

        let mut entries = self.entries.write();
        if entries.len() >= self.config.max_entries && !entries.contains_key(sql) {
            // Evict the least recently used entry.
            if let Some(lru_key) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone())
            {
                entries.remove(&lru_key);
                self.stats.write().evictions += 1;
            }
        }
        entries.insert(
            sql.to_string(),
            CacheEntry {
                template: template.clone(),
                last_accessed: Instant::now(),
            },
        );
        let total_entries = entries.len();
        drop(entries);

        let mut stats = self.stats.write();
        stats.misses += 1;
        stats.total_entries = total_entries;

        Ok(template)
    }

    /// Clear all cached templates.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.stats.write().total_entries = 0;
    }

    /// Current number of cached templates.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the cache statistics.
    pub fn stats(&self) -> TemplateCacheStats {
        self.stats.read().clone()
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::with_default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_tree() {
        let cache = TemplateCache::with_default_config();
        let first = cache.get_or_parse("SELECT 1").unwrap();
        let second = cache.get_or_parse("SELECT 1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_parse_errors_are_not_cached() {
        let cache = TemplateCache::with_default_config();
        assert!(cache.get_or_parse("/*IF a*/x").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_eviction_at_capacity() {
        let cache = TemplateCache::new(TemplateCacheConfig::new().with_max_entries(2));
        cache.get_or_parse("SELECT 1").unwrap();
        cache.get_or_parse("SELECT 2").unwrap();
        cache.get_or_parse("SELECT 3").unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_disabled_cache_parses_every_time() {
        let cache = TemplateCache::new(TemplateCacheConfig::disabled());
        cache.get_or_parse("SELECT 1").unwrap();
        cache.get_or_parse("SELECT 1").unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = TemplateCache::with_default_config();
        cache.get_or_parse("SELECT 1").unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
