/*!
 * Province/city directory operations.
 *
 * - `coordinator`: lookup, add, remove and province deletion across the
 *   relational store and the city cache
 * - `outcome`: per-item status codes returned by write operations
 */

pub mod coordinator;
pub mod outcome;

pub use coordinator::{DirectoryCoordinator, NewCity};
pub use outcome::{OperationResult, OutcomeStatus};
