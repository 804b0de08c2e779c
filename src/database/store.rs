/*!
 * Relational store contract used by the directory coordinator.
 *
 * The coordinator only depends on these traits, so the SQLite repository can
 * be swapped for another backend (or a test double) without touching the
 * consistency logic.
 */

use async_trait::async_trait;

use super::models::CityRecord;
use crate::errors::StoreError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Authoritative record of provinces and cities
///
/// Implementations must enforce uniqueness of `province.name` and of the
/// `(city.name, city.province_id)` pair, reporting violations as
/// [`StoreError::UniqueViolation`].
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Look up a province id by its unique name
    async fn find_province_id(&self, name: &str) -> StoreResult<Option<i64>>;

    /// Insert a province and return its generated id
    async fn insert_province(&self, name: &str) -> StoreResult<i64>;

    /// Insert a city and return its generated id
    async fn insert_city(&self, name: &str, province_id: i64) -> StoreResult<i64>;

    /// Fetch a single city row by id
    async fn find_city(&self, city_id: i64) -> StoreResult<Option<CityRecord>>;

    /// Delete a single city row, returning the number of rows affected
    async fn delete_city(&self, city_id: i64) -> StoreResult<u64>;

    /// Names of all cities belonging to a province
    async fn city_names(&self, province_id: i64) -> StoreResult<Vec<String>>;

    /// Open a multi-statement transaction
    async fn begin(&self) -> StoreResult<Box<dyn DirectoryTransaction>>;
}

/// A relational transaction spanning several directory statements
///
/// Dropping a transaction without calling [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) must discard its changes.
#[async_trait]
pub trait DirectoryTransaction: Send {
    /// Delete every city of a province, returning the number of rows affected
    async fn delete_cities_of_province(&mut self, province_id: i64) -> StoreResult<u64>;

    /// Delete a province row, returning the number of rows affected
    async fn delete_province(&mut self, province_id: i64) -> StoreResult<u64>;

    /// Make the transaction's changes durable
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard the transaction's changes
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
