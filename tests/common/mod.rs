/*!
 * Common test utilities for the cityinfo test suite
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cityinfo::cache::MockCityCache;
use cityinfo::database::models::{CityRecord, DirectoryCounts};
use cityinfo::database::{DirectoryStore, DirectoryTransaction, StoreResult};
use cityinfo::{DirectoryCoordinator, Repository, StoreError};

/// Route library logs through env_logger when RUST_LOG is set
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Coordinator wired to an in-memory store and a fault-injecting cache,
/// with handles kept for seeding and inspection
pub struct Harness {
    pub coordinator: DirectoryCoordinator,
    pub repo: Repository,
    pub cache: MockCityCache,
}

impl Harness {
    pub fn new() -> Self {
        init_logging();
        let repo = Repository::new_in_memory().expect("Failed to create in-memory repository");
        let cache = MockCityCache::working();
        let coordinator =
            DirectoryCoordinator::new(Arc::new(repo.clone()), Arc::new(cache.clone()));
        Self {
            coordinator,
            repo,
            cache,
        }
    }

    /// Coordinator over a different store, sharing this harness's cache
    pub fn coordinator_over(&self, store: impl DirectoryStore + 'static) -> DirectoryCoordinator {
        DirectoryCoordinator::new(Arc::new(store), Arc::new(self.cache.clone()))
    }

    /// Run raw SQL on the store, e.g. to install a failing trigger
    pub async fn exec_sql(&self, sql: &str) {
        let sql = sql.to_string();
        self.repo
            .pool()
            .execute_async(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .expect("Failed to run test SQL");
    }

    /// Make the store abort any insert of a city with this name
    pub async fn reject_city_insert(&self, city_name: &str) {
        self.exec_sql(&format!(
            "CREATE TRIGGER reject_insert_{tag} BEFORE INSERT ON city WHEN NEW.name = '{name}'
             BEGIN SELECT RAISE(ABORT, 'insert rejected by test'); END;",
            tag = sql_tag(city_name),
            name = city_name
        ))
        .await;
    }

    /// Make the store abort any delete of a city with this name
    pub async fn reject_city_delete(&self, city_name: &str) {
        self.exec_sql(&format!(
            "CREATE TRIGGER reject_delete_{tag} BEFORE DELETE ON city WHEN OLD.name = '{name}'
             BEGIN SELECT RAISE(ABORT, 'delete rejected by test'); END;",
            tag = sql_tag(city_name),
            name = city_name
        ))
        .await;
    }

    /// Make the store abort every province delete
    pub async fn reject_province_delete(&self) {
        self.exec_sql(
            "CREATE TRIGGER reject_province_delete BEFORE DELETE ON province
             BEGIN SELECT RAISE(ABORT, 'province delete rejected by test'); END;",
        )
        .await;
    }

    /// Row counts straight from the store
    pub async fn counts(&self) -> DirectoryCounts {
        self.repo.counts().await.expect("Failed to count rows")
    }

    /// Sorted city names of a province straight from the store
    pub async fn stored_names(&self, province_id: i64) -> Vec<String> {
        let cities = self
            .repo
            .list_cities(province_id)
            .await
            .expect("Failed to list cities");
        sorted(cities.into_iter().map(|c| c.name).collect())
    }

    /// Sorted cached names of a province, bypassing faults and counters
    pub fn cached_names(&self, province_id: i64) -> Vec<String> {
        sorted(self.cache.inner().peek(province_id).into_iter().collect())
    }

    /// Id of a province that must already exist
    pub async fn province_id(&self, name: &str) -> i64 {
        self.repo
            .list_provinces()
            .await
            .expect("Failed to list provinces")
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
            .unwrap_or_else(|| panic!("Province {} should exist", name))
    }

    /// Id of a city that must already exist in the given province
    pub async fn city_id(&self, province_id: i64, name: &str) -> i64 {
        self.repo
            .list_cities(province_id)
            .await
            .expect("Failed to list cities")
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .unwrap_or_else(|| panic!("City {} should exist", name))
    }
}

fn sql_tag(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Sort a list of names for order-independent comparison
pub fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

/// Owned, sorted list of names from literals
pub fn names(items: &[&str]) -> Vec<String> {
    sorted(items.iter().map(|s| s.to_string()).collect())
}

/// Store that delegates to a repository but can be told to misbehave in
/// ways SQLite triggers cannot express
pub struct ScriptedStore {
    inner: Repository,
    /// `begin` fails before any statement runs
    fail_begin: AtomicBool,
    /// `commit` rolls back and reports an error
    fail_commit: AtomicBool,
    /// `delete_city` removes the row but reports zero affected rows,
    /// as if a concurrent caller deleted it first
    lose_delete_race: AtomicBool,
}

impl ScriptedStore {
    pub fn new(inner: Repository) -> Self {
        Self {
            inner,
            fail_begin: AtomicBool::new(false),
            fail_commit: AtomicBool::new(false),
            lose_delete_race: AtomicBool::new(false),
        }
    }

    pub fn failing_begin(self) -> Self {
        self.fail_begin.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_commit(self) -> Self {
        self.fail_commit.store(true, Ordering::SeqCst);
        self
    }

    pub fn losing_delete_race(self) -> Self {
        self.lose_delete_race.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl DirectoryStore for ScriptedStore {
    async fn find_province_id(&self, name: &str) -> StoreResult<Option<i64>> {
        self.inner.find_province_id(name).await
    }

    async fn insert_province(&self, name: &str) -> StoreResult<i64> {
        self.inner.insert_province(name).await
    }

    async fn insert_city(&self, name: &str, province_id: i64) -> StoreResult<i64> {
        self.inner.insert_city(name, province_id).await
    }

    async fn find_city(&self, city_id: i64) -> StoreResult<Option<CityRecord>> {
        self.inner.find_city(city_id).await
    }

    async fn delete_city(&self, city_id: i64) -> StoreResult<u64> {
        let affected = self.inner.delete_city(city_id).await?;
        if self.lose_delete_race.load(Ordering::SeqCst) {
            return Ok(0);
        }
        Ok(affected)
    }

    async fn city_names(&self, province_id: i64) -> StoreResult<Vec<String>> {
        self.inner.city_names(province_id).await
    }

    async fn begin(&self) -> StoreResult<Box<dyn DirectoryTransaction>> {
        if self.fail_begin.load(Ordering::SeqCst) {
            return Err(StoreError::Database("database is locked".to_string()));
        }
        let inner = self.inner.begin().await?;
        Ok(Box::new(ScriptedTransaction {
            inner,
            fail_commit: self.fail_commit.load(Ordering::SeqCst),
        }))
    }
}

struct ScriptedTransaction {
    inner: Box<dyn DirectoryTransaction>,
    fail_commit: bool,
}

#[async_trait]
impl DirectoryTransaction for ScriptedTransaction {
    async fn delete_cities_of_province(&mut self, province_id: i64) -> StoreResult<u64> {
        self.inner.delete_cities_of_province(province_id).await
    }

    async fn delete_province(&mut self, province_id: i64) -> StoreResult<u64> {
        self.inner.delete_province(province_id).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.fail_commit {
            self.inner.rollback().await?;
            return Err(StoreError::Database("disk I/O error during commit".to_string()));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.inner.rollback().await
    }
}
