/*!
 * City cache layer.
 *
 * The cache holds, per province id, the set of city names currently known
 * for that province. It is never authoritative: entries may be missing,
 * stale or unreachable, and every call may fail independently.
 *
 * - `memory`: in-process implementation with hit/miss statistics
 * - `mock`: fault-injecting wrapper for exercising failure paths
 */

use async_trait::async_trait;

use crate::errors::CacheError;

pub mod memory;
pub mod mock;

pub use memory::{CacheStats, MemoryCityCache};
pub use mock::{CacheFault, MockCityCache};

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Per-province set of city names
///
/// An empty member list and a missing entry mean the same thing to callers.
#[async_trait]
pub trait CityCache: Send + Sync {
    /// All city names cached for a province (no ordering guarantee)
    async fn members(&self, province_id: i64) -> CacheResult<Vec<String>>;

    /// Add a city name to a province's entry
    async fn add(&self, province_id: i64, city_name: &str) -> CacheResult<()>;

    /// Remove a city name from a province's entry
    async fn remove(&self, province_id: i64, city_name: &str) -> CacheResult<()>;

    /// Drop every member of a province's entry
    async fn clear(&self, province_id: i64) -> CacheResult<()>;
}
