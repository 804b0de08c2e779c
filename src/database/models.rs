/*!
 * Database entity models.
 *
 * These structures map directly to the province and city tables.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// A row of the `province` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvinceRecord {
    /// Generated identifier
    pub id: i64,
    /// Unique province name
    pub name: String,
    /// Creation timestamp (SQLite datetime text)
    pub created_at: String,
}

/// A row of the `city` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRecord {
    /// Generated identifier
    pub id: i64,
    /// City name, unique within its province
    pub name: String,
    /// Owning province
    pub province_id: i64,
    /// Creation timestamp (SQLite datetime text)
    pub created_at: String,
}

/// A province together with how many cities it currently holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvinceSummary {
    pub id: i64,
    pub name: String,
    pub city_count: i64,
}

/// Row counts of the directory tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryCounts {
    /// Number of province rows
    pub provinces: i64,
    /// Number of city rows
    pub cities: i64,
}

impl fmt::Display for DirectoryCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provinces: {}, Cities: {}", self.provinces, self.cities)
    }
}
