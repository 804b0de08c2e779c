/*!
 * In-process city cache.
 *
 * Keeps a set of city names per province in a shared map. Clones share the
 * same storage, so one handle can be given to the coordinator while another
 * is kept for inspection.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{CacheResult, CityCache};

/// Snapshot of cache usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups that found a non-empty entry
    pub hits: usize,
    /// Lookups that found nothing
    pub misses: usize,
    /// hits / (hits + misses), 0.0 when nothing was looked up
    pub hit_rate: f64,
    /// Number of provinces with a non-empty entry
    pub entries: usize,
}

/// City cache backed by a shared in-memory map
#[derive(Clone)]
pub struct MemoryCityCache {
    /// Province id -> city names
    entries: Arc<RwLock<HashMap<i64, HashSet<String>>>>,

    /// Cache hit counter
    hits: Arc<RwLock<usize>>,

    /// Cache miss counter
    misses: Arc<RwLock<usize>>,

    /// Whether caching is enabled
    enabled: bool,
}

impl MemoryCityCache {
    /// Create a new city cache
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
            enabled,
        }
    }

    /// Check if the cache is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            hit_rate,
            entries: self.len(),
        }
    }

    /// Number of provinces with a non-empty entry
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Members of a province's entry without touching the counters
    pub fn peek(&self, province_id: i64) -> HashSet<String> {
        self.entries
            .read()
            .get(&province_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop every entry and reset the counters
    pub fn clear_all(&self) {
        self.entries.write().clear();
        *self.hits.write() = 0;
        *self.misses.write() = 0;

        debug!("City cache cleared");
    }

    /// Remove up to `limit` members of a province's entry, returning how many went
    pub(crate) fn remove_some(&self, province_id: i64, limit: usize) -> usize {
        let mut entries = self.entries.write();
        let Some(members) = entries.get_mut(&province_id) else {
            return 0;
        };

        let doomed: Vec<String> = members.iter().take(limit).cloned().collect();
        for name in &doomed {
            members.remove(name);
        }
        if members.is_empty() {
            entries.remove(&province_id);
        }

        doomed.len()
    }
}

impl Default for MemoryCityCache {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl CityCache for MemoryCityCache {
    async fn members(&self, province_id: i64) -> CacheResult<Vec<String>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let members: Vec<String> = self
            .entries
            .read()
            .get(&province_id)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default();

        if members.is_empty() {
            *self.misses.write() += 1;
            debug!("Cache miss for province {}", province_id);
        } else {
            *self.hits.write() += 1;
            debug!("Cache hit for province {} ({} cities)", province_id, members.len());
        }

        Ok(members)
    }

    async fn add(&self, province_id: i64, city_name: &str) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.entries
            .write()
            .entry(province_id)
            .or_default()
            .insert(city_name.to_string());

        debug!("Cached city '{}' for province {}", city_name, province_id);
        Ok(())
    }

    async fn remove(&self, province_id: i64, city_name: &str) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let mut entries = self.entries.write();
        if let Some(members) = entries.get_mut(&province_id) {
            members.remove(city_name);
            if members.is_empty() {
                entries.remove(&province_id);
            }
        }

        Ok(())
    }

    async fn clear(&self, province_id: i64) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.entries.write().remove(&province_id);
        debug!("Evicted cache entry for province {}", province_id);
        Ok(())
    }
}
