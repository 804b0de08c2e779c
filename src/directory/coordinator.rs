/*!
 * Consistency coordinator between the relational store and the city cache.
 *
 * Reads go cache-first and repopulate the cache from the store on a miss.
 * Writes go to the store first and are then pushed into the cache; a cache
 * failure after a successful relational write is reported but never undone.
 * Province deletion is the exception: its relational transaction only
 * commits once the province's cache entry has been evicted.
 */

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::outcome::OperationResult;
use crate::cache::CityCache;
use crate::database::{DirectoryStore, DirectoryTransaction};
use crate::errors::StoreError;

/// A city to add, named together with its province
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCity {
    pub city: String,
    pub province: String,
}

impl NewCity {
    pub fn new(city: impl Into<String>, province: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            province: province.into(),
        }
    }
}

/// Stateless coordinator over an injected store and cache
///
/// Cloning is cheap; clones share the same store and cache handles and may
/// be used concurrently.
#[derive(Clone)]
pub struct DirectoryCoordinator {
    store: Arc<dyn DirectoryStore>,
    cache: Arc<dyn CityCache>,
}

impl DirectoryCoordinator {
    pub fn new(store: Arc<dyn DirectoryStore>, cache: Arc<dyn CityCache>) -> Self {
        Self { store, cache }
    }

    /// All city names of a province.
    ///
    /// Never fails: a cache error falls back to the store, and a store error
    /// yields an empty list. An unknown province also yields an empty list.
    pub async fn lookup(&self, province_id: i64) -> Vec<String> {
        match self.cache.members(province_id).await {
            Ok(members) if !members.is_empty() => {
                debug!("Serving province {} from cache", province_id);
                return members;
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read province {} from cache: {}", province_id, e),
        }

        let names = match self.store.city_names(province_id).await {
            Ok(names) => names,
            Err(e) => {
                error!("Could not query cities of province {}: {}", province_id, e);
                return Vec::new();
            }
        };

        for name in &names {
            if let Err(e) = self.cache.add(province_id, name).await {
                warn!("Could not sync city '{}' to cache: {}", name, e);
            }
        }

        names
    }

    /// Add each city independently, one result per item in input order
    pub async fn add_cities(&self, cities: &[NewCity]) -> Vec<OperationResult> {
        let mut results = Vec::with_capacity(cities.len());
        for item in cities {
            results.push(self.add_city(&item.city, &item.province).await);
        }
        results
    }

    /// Add one city, creating its province on first use
    pub async fn add_city(&self, city_name: &str, province_name: &str) -> OperationResult {
        let province_id = match self.resolve_province(province_name).await {
            Ok(id) => id,
            Err(e) => {
                error!("Could not resolve province '{}': {}", province_name, e);
                return OperationResult::storage_error(e);
            }
        };

        match self.store.insert_city(city_name, province_id).await {
            Ok(_) => {}
            Err(StoreError::UniqueViolation(_)) => {
                debug!("City '{}' already exists in '{}'", city_name, province_name);
                return OperationResult::city_already_exists(city_name, province_name);
            }
            Err(e) => {
                error!("Could not insert city '{}': {}", city_name, e);
                return OperationResult::storage_error(e);
            }
        }

        if let Err(e) = self.cache.add(province_id, city_name).await {
            warn!("City '{}' added but cache sync failed: {}", city_name, e);
            return OperationResult::cache_sync_failed(e);
        }

        OperationResult::ok()
    }

    /// Find a province by name, inserting it if absent.
    ///
    /// When a concurrent caller inserts the same name first, the insert hits
    /// the unique constraint and the winner's id is read back instead.
    async fn resolve_province(&self, province_name: &str) -> Result<i64, StoreError> {
        if let Some(id) = self.store.find_province_id(province_name).await? {
            return Ok(id);
        }

        match self.store.insert_province(province_name).await {
            Ok(id) => {
                info!("Created province '{}' with id {}", province_name, id);
                Ok(id)
            }
            Err(StoreError::UniqueViolation(_)) => {
                debug!("Province '{}' created concurrently, re-reading", province_name);
                self.store
                    .find_province_id(province_name)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Database(format!(
                            "province '{}' vanished after a conflicting insert",
                            province_name
                        ))
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Remove each city independently, one result per id in input order
    pub async fn remove_cities(&self, city_ids: &[i64]) -> Vec<OperationResult> {
        let mut results = Vec::with_capacity(city_ids.len());
        for &city_id in city_ids {
            results.push(self.remove_city(city_id).await);
        }
        results
    }

    /// Remove one city from the store, then from its province's cache entry
    pub async fn remove_city(&self, city_id: i64) -> OperationResult {
        let city = match self.store.find_city(city_id).await {
            Ok(Some(city)) => city,
            Ok(None) => return OperationResult::city_not_exist(city_id),
            Err(e) => {
                error!("Could not query city {}: {}", city_id, e);
                return OperationResult::storage_error(e);
            }
        };

        match self.store.delete_city(city_id).await {
            Ok(0) => return OperationResult::city_not_exist(city_id),
            Ok(_) => {}
            Err(e) => {
                error!("Could not delete city {}: {}", city_id, e);
                return OperationResult::storage_error(e);
            }
        }

        if let Err(e) = self.cache.remove(city.province_id, &city.name).await {
            warn!("City {} deleted but cache sync failed: {}", city_id, e);
            return OperationResult::cache_sync_failed(e);
        }

        OperationResult::ok()
    }

    /// Delete a province and all of its cities.
    ///
    /// The relational deletes run in one transaction that only commits after
    /// the province's cache entry is evicted. Any failure before the commit
    /// rolls back, leaving the province and its cities in place. An eviction
    /// that fails halfway may still have dropped some cached members.
    pub async fn remove_province(&self, province_id: i64) -> OperationResult {
        let mut tx = match self.store.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                error!("Could not begin transaction: {}", e);
                return OperationResult::storage_error(e);
            }
        };

        if let Err(e) = tx.delete_cities_of_province(province_id).await {
            error!("Could not delete cities of province {}: {}", province_id, e);
            Self::rollback(tx, province_id).await;
            return OperationResult::storage_error(e);
        }

        match tx.delete_province(province_id).await {
            Ok(0) => {
                Self::rollback(tx, province_id).await;
                return OperationResult::province_not_exist(province_id);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Could not delete province {}: {}", province_id, e);
                Self::rollback(tx, province_id).await;
                return OperationResult::storage_error(e);
            }
        }

        if let Err(e) = self.cache.clear(province_id).await {
            error!("Could not evict province {} from cache: {}", province_id, e);
            Self::rollback(tx, province_id).await;
            return OperationResult::cache_error(e);
        }

        if let Err(e) = tx.commit().await {
            error!("Could not commit deletion of province {}: {}", province_id, e);
            return OperationResult::storage_error(e);
        }

        info!("Deleted province {}", province_id);
        OperationResult::ok()
    }

    async fn rollback(tx: Box<dyn DirectoryTransaction>, province_id: i64) {
        if let Err(e) = tx.rollback().await {
            warn!("Rollback for province {} failed: {}", province_id, e);
        }
    }
}
