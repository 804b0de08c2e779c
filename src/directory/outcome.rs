/*!
 * Per-item results of directory write operations.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single write/delete item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The change was applied to both stores
    Ok,
    /// The `(city, province)` pair is already recorded
    CityAlreadyExists,
    /// No city row has the requested id
    CityNotExist,
    /// No province row has the requested id
    ProvinceNotExist,
    /// The relational store rejected or failed the statement
    StorageError,
    /// The relational change stands but the cache write-through failed
    CacheSyncFailed,
    /// Cache eviction failed and the relational change was rolled back
    CacheError,
}

impl OutcomeStatus {
    /// Numeric status code used on the wire
    pub fn code(self) -> i32 {
        match self {
            OutcomeStatus::Ok => 0,
            OutcomeStatus::CityAlreadyExists => -10000,
            OutcomeStatus::CityNotExist => -10001,
            OutcomeStatus::ProvinceNotExist => -10002,
            OutcomeStatus::CacheSyncFailed | OutcomeStatus::CacheError => -10003,
            OutcomeStatus::StorageError => -10004,
        }
    }

    /// Whether the item's relational change is in effect
    pub fn is_applied(self) -> bool {
        matches!(self, OutcomeStatus::Ok | OutcomeStatus::CacheSyncFailed)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeStatus::Ok => "ok",
            OutcomeStatus::CityAlreadyExists => "city_already_exists",
            OutcomeStatus::CityNotExist => "city_not_exist",
            OutcomeStatus::ProvinceNotExist => "province_not_exist",
            OutcomeStatus::StorageError => "storage_error",
            OutcomeStatus::CacheSyncFailed => "cache_sync_failed",
            OutcomeStatus::CacheError => "cache_error",
        };
        write!(f, "{}", name)
    }
}

/// Status plus human-readable message for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub status: OutcomeStatus,
    pub code: i32,
    pub message: String,
}

impl OperationResult {
    /// Build a result with an explicit status and message
    pub fn new(status: OutcomeStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            code: status.code(),
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(OutcomeStatus::Ok, "ok")
    }

    pub fn city_already_exists(city_name: &str, province_name: &str) -> Self {
        Self::new(
            OutcomeStatus::CityAlreadyExists,
            format!("city '{}' already exists in province '{}'", city_name, province_name),
        )
    }

    pub fn city_not_exist(city_id: i64) -> Self {
        Self::new(
            OutcomeStatus::CityNotExist,
            format!("city {} does not exist", city_id),
        )
    }

    pub fn province_not_exist(province_id: i64) -> Self {
        Self::new(
            OutcomeStatus::ProvinceNotExist,
            format!("province {} does not exist", province_id),
        )
    }

    pub fn storage_error(error: impl fmt::Display) -> Self {
        Self::new(OutcomeStatus::StorageError, error.to_string())
    }

    pub fn cache_sync_failed(error: impl fmt::Display) -> Self {
        Self::new(OutcomeStatus::CacheSyncFailed, error.to_string())
    }

    pub fn cache_error(error: impl fmt::Display) -> Self {
        Self::new(OutcomeStatus::CacheError, error.to_string())
    }

    /// Whether the item's relational change is in effect
    pub fn is_applied(&self) -> bool {
        self.status.is_applied()
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.code, self.message)
    }
}
