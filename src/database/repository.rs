/*!
 * Repository layer for database operations.
 *
 * This module provides the SQLite implementation of the directory store
 * contract, plus a few read-only listing queries used by the CLI.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, OptionalExtension, Row};

use super::connection::{ConnectionPool, PoolOptions, PooledTransaction};
use super::models::{CityRecord, DirectoryCounts, ProvinceRecord, ProvinceSummary};
use super::store::{DirectoryStore, DirectoryTransaction, StoreResult};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Connection pool
    db: ConnectionPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = ConnectionPool::new_default(PoolOptions::default())?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = ConnectionPool::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &ConnectionPool {
        &self.db
    }

    fn parse_city_row(row: &Row) -> rusqlite::Result<CityRecord> {
        Ok(CityRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            province_id: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    // =========================================================================
    // Listing Operations
    // =========================================================================

    /// Get a province by ID
    pub async fn get_province(&self, province_id: i64) -> Result<Option<ProvinceRecord>> {
        self.db
            .execute_async(move |conn| {
                let province = conn
                    .query_row(
                        "SELECT id, name, created_at FROM province WHERE id = ?1",
                        [province_id],
                        |row| {
                            Ok(ProvinceRecord {
                                id: row.get(0)?,
                                name: row.get(1)?,
                                created_at: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(province)
            })
            .await
    }

    /// List all provinces with the number of cities each holds
    pub async fn list_provinces(&self) -> Result<Vec<ProvinceSummary>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT p.id, p.name, COUNT(c.id)
                    FROM province p
                    LEFT JOIN city c ON c.province_id = p.id
                    GROUP BY p.id, p.name
                    ORDER BY p.id
                    "#,
                )?;

                let provinces = stmt
                    .query_map([], |row| {
                        Ok(ProvinceSummary {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            city_count: row.get(2)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(provinces)
            })
            .await
    }

    /// List the city rows of a province, ordered by id
    pub async fn list_cities(&self, province_id: i64) -> Result<Vec<CityRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, name, province_id, created_at
                    FROM city
                    WHERE province_id = ?1
                    ORDER BY id
                    "#,
                )?;

                let cities = stmt
                    .query_map([province_id], Self::parse_city_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(cities)
            })
            .await
    }

    /// Count the rows of both directory tables
    pub async fn counts(&self) -> Result<DirectoryCounts> {
        self.db
            .execute_async(|conn| {
                let provinces: i64 =
                    conn.query_row("SELECT COUNT(*) FROM province", [], |row| row.get(0))?;
                let cities: i64 =
                    conn.query_row("SELECT COUNT(*) FROM city", [], |row| row.get(0))?;
                Ok(DirectoryCounts { provinces, cities })
            })
            .await
    }
}

#[async_trait]
impl DirectoryStore for Repository {
    async fn find_province_id(&self, name: &str) -> StoreResult<Option<i64>> {
        let name = name.to_string();

        let id = self
            .db
            .execute_async(move |conn| {
                let id = conn
                    .query_row("SELECT id FROM province WHERE name = ?1", [&name], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(id)
            })
            .await?;

        Ok(id)
    }

    async fn insert_province(&self, name: &str) -> StoreResult<i64> {
        let name = name.to_string();

        let id = self
            .db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO province (name, created_at) VALUES (?1, datetime('now'))",
                    [&name],
                )?;
                let id = conn.last_insert_rowid();
                debug!("Inserted province '{}' with id {}", name, id);
                Ok(id)
            })
            .await?;

        Ok(id)
    }

    async fn insert_city(&self, name: &str, province_id: i64) -> StoreResult<i64> {
        let name = name.to_string();

        let id = self
            .db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO city (name, province_id, created_at) VALUES (?1, ?2, datetime('now'))",
                    params![name, province_id],
                )?;
                let id = conn.last_insert_rowid();
                debug!("Inserted city '{}' into province {} with id {}", name, province_id, id);
                Ok(id)
            })
            .await?;

        Ok(id)
    }

    async fn find_city(&self, city_id: i64) -> StoreResult<Option<CityRecord>> {
        let city = self
            .db
            .execute_async(move |conn| {
                let city = conn
                    .query_row(
                        "SELECT id, name, province_id, created_at FROM city WHERE id = ?1",
                        [city_id],
                        Self::parse_city_row,
                    )
                    .optional()?;
                Ok(city)
            })
            .await?;

        Ok(city)
    }

    async fn delete_city(&self, city_id: i64) -> StoreResult<u64> {
        let affected = self
            .db
            .execute_async(move |conn| {
                let affected = conn.execute("DELETE FROM city WHERE id = ?1", [city_id])?;
                Ok(affected as u64)
            })
            .await?;

        Ok(affected)
    }

    async fn city_names(&self, province_id: i64) -> StoreResult<Vec<String>> {
        let names = self
            .db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare("SELECT name FROM city WHERE province_id = ?1")?;
                let names = stmt
                    .query_map([province_id], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(names)
            })
            .await?;

        Ok(names)
    }

    async fn begin(&self) -> StoreResult<Box<dyn DirectoryTransaction>> {
        let tx = self.db.begin_async().await?;
        Ok(Box::new(SqliteDirectoryTransaction { tx }))
    }
}

/// SQLite transaction over the directory tables
struct SqliteDirectoryTransaction {
    tx: PooledTransaction,
}

#[async_trait]
impl DirectoryTransaction for SqliteDirectoryTransaction {
    async fn delete_cities_of_province(&mut self, province_id: i64) -> StoreResult<u64> {
        let affected = self
            .tx
            .execute_async(move |conn| {
                let affected =
                    conn.execute("DELETE FROM city WHERE province_id = ?1", [province_id])?;
                Ok(affected as u64)
            })
            .await?;

        Ok(affected)
    }

    async fn delete_province(&mut self, province_id: i64) -> StoreResult<u64> {
        let affected = self
            .tx
            .execute_async(move |conn| {
                let affected = conn.execute("DELETE FROM province WHERE id = ?1", [province_id])?;
                Ok(affected as u64)
            })
            .await?;

        Ok(affected)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
