/*!
 * Database module for the authoritative province/city records.
 *
 * This module provides SQLite-based persistence for:
 * - Provinces and their cities, with uniqueness enforced by the schema
 * - A bounded connection pool with async-safe access
 * - Transactions that can stay open across awaits
 */

pub mod schema;
pub mod connection;
pub mod store;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{ConnectionPool, PoolOptions};
pub use repository::Repository;
pub use store::{DirectoryStore, DirectoryTransaction, StoreResult};
