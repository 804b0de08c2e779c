/*!
 * # cityinfo - province and city directory
 *
 * A two-level geographic directory (provinces containing cities) kept in an
 * authoritative SQLite store and mirrored into a best-effort cache.
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `directory`: the consistency coordinator
 *   - `directory::coordinator`: cache-aside lookup, write-through add,
 *     per-item removal and cache-gated province deletion
 *   - `directory::outcome`: per-item status codes
 * - `database`: relational store (connection pool, schema, repository)
 * - `cache`: city cache trait, in-memory backend and fault-injecting mock
 * - `app_config`: Configuration management
 * - `app_controller`: wiring and command dispatch for the CLI
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod cache;
pub mod database;
pub mod directory;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use cache::{CityCache, MemoryCityCache};
pub use database::{DirectoryStore, Repository};
pub use directory::{DirectoryCoordinator, NewCity, OperationResult, OutcomeStatus};
pub use errors::{AppError, CacheError, StoreError};
