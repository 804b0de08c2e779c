use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::app_config::Config;
use crate::cache::MemoryCityCache;
use crate::database::{ConnectionPool, Repository};
use crate::directory::{DirectoryCoordinator, NewCity};
use crate::errors::AppError;

// @module: Application controller wiring config, stores and coordinator

/// A directory command, as issued from the CLI or the interactive shell
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// List the city names of a province
    Lookup(i64),
    /// Add cities, creating provinces as needed
    Add(Vec<NewCity>),
    /// Remove cities by id
    RemoveCities(Vec<i64>),
    /// Remove a province and all of its cities
    RemoveProvince(i64),
    /// List provinces with city counts
    Provinces,
    /// List the city rows of a province
    Cities(i64),
    /// Add the cities listed in a JSON file
    Import(PathBuf),
    /// Row counts and cache statistics
    Stats,
}

/// Parse a `CITY@PROVINCE` argument
pub fn parse_city_spec(spec: &str) -> Result<NewCity, String> {
    let (city, province) = spec
        .rsplit_once('@')
        .ok_or_else(|| format!("expected CITY@PROVINCE, got '{}'", spec))?;

    validate_city(NewCity::new(city, province))
        .map_err(|e| format!("{} in '{}'", e, spec))
}

/// Trim both names and reject empty ones
fn validate_city(item: NewCity) -> Result<NewCity, String> {
    let city = item.city.trim();
    let province = item.province.trim();
    if city.is_empty() || province.is_empty() {
        return Err("city and province must not be empty".to_string());
    }

    Ok(NewCity::new(city, province))
}

fn parse_id(token: &str) -> Result<i64, AppError> {
    token
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("'{}' is not a valid id", token)))
}

fn single_id(args: &[&str], command: &str) -> Result<i64, AppError> {
    match args {
        [id] => parse_id(id),
        _ => Err(AppError::InvalidInput(format!("{} takes exactly one id", command))),
    }
}

impl FromStr for Command {
    type Err = AppError;

    /// Parse one shell line, e.g. `lookup 3` or `add Springfield@Lakeland, Ogdenville@Hillside`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let args: Vec<&str> = rest.split_whitespace().collect();

        match name.to_lowercase().as_str() {
            "lookup" => Ok(Command::Lookup(single_id(&args, "lookup")?)),
            "add" => {
                // Names may contain spaces, so items are comma-separated
                let cities = rest
                    .split(',')
                    .filter(|item| !item.trim().is_empty())
                    .map(parse_city_spec)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(AppError::InvalidInput)?;
                if cities.is_empty() {
                    return Err(AppError::InvalidInput("add needs at least one CITY@PROVINCE".to_string()));
                }
                Ok(Command::Add(cities))
            }
            "remove-cities" => {
                if args.is_empty() {
                    return Err(AppError::InvalidInput("remove-cities needs at least one id".to_string()));
                }
                let ids = args.iter().map(|a| parse_id(a)).collect::<Result<Vec<_>, _>>()?;
                Ok(Command::RemoveCities(ids))
            }
            "remove-province" => Ok(Command::RemoveProvince(single_id(&args, "remove-province")?)),
            "provinces" => Ok(Command::Provinces),
            "cities" => Ok(Command::Cities(single_id(&args, "cities")?)),
            "import" => {
                let path = rest.trim();
                if path.is_empty() {
                    return Err(AppError::InvalidInput("import needs a file path".to_string()));
                }
                Ok(Command::Import(PathBuf::from(path)))
            }
            "stats" => Ok(Command::Stats),
            other => Err(AppError::InvalidInput(format!("unknown command '{}'", other))),
        }
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Relational store
    repository: Repository,
    // @field: City cache handle shared with the coordinator
    cache: MemoryCityCache,
    // @field: Consistency coordinator
    coordinator: DirectoryCoordinator,
}

impl Controller {
    /// Create a new controller for test purposes with an in-memory database
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::in_memory())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let pool = if config.database.in_memory {
            ConnectionPool::new_in_memory()?
        } else {
            let options = config.database.pool_options();
            match config.database.explicit_path() {
                Some(path) => ConnectionPool::new(path, options)?,
                None => ConnectionPool::new_default(options)?,
            }
        };

        let repository = Repository::new(pool);
        let cache = MemoryCityCache::new(config.cache.enabled);
        let coordinator =
            DirectoryCoordinator::new(Arc::new(repository.clone()), Arc::new(cache.clone()));

        debug!(
            "Controller ready (database: {:?}, cache enabled: {})",
            repository.pool().path(),
            cache.is_enabled()
        );

        Ok(Self {
            config,
            repository,
            cache,
            coordinator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn coordinator(&self) -> &DirectoryCoordinator {
        &self.coordinator
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn cache(&self) -> &MemoryCityCache {
        &self.cache
    }

    /// Run one command and return its JSON response
    pub async fn execute(&self, command: Command) -> Result<Value> {
        match command {
            Command::Lookup(province_id) => {
                let cities = self.coordinator.lookup(province_id).await;
                Ok(json!({ "province_id": province_id, "cities": cities }))
            }
            Command::Add(cities) => {
                let results = self.coordinator.add_cities(&cities).await;
                Ok(json!({ "results": results }))
            }
            Command::RemoveCities(ids) => {
                let results = self.coordinator.remove_cities(&ids).await;
                Ok(json!({ "results": results }))
            }
            Command::RemoveProvince(province_id) => {
                let result = self.coordinator.remove_province(province_id).await;
                Ok(json!({ "result": result }))
            }
            Command::Provinces => {
                let provinces = self
                    .repository
                    .list_provinces()
                    .await
                    .map_err(|e| AppError::Store(e.into()))?;
                Ok(json!({ "provinces": provinces }))
            }
            Command::Cities(province_id) => {
                let cities = self
                    .repository
                    .list_cities(province_id)
                    .await
                    .map_err(|e| AppError::Store(e.into()))?;
                Ok(json!({ "province_id": province_id, "cities": cities }))
            }
            Command::Import(path) => {
                let cities = Self::read_import_file(&path)?;
                info!("Importing {} cities from {:?}", cities.len(), path);
                let results = self.coordinator.add_cities(&cities).await;
                let applied = results.iter().filter(|r| r.is_applied()).count();
                info!("Import finished: {}/{} applied", applied, results.len());
                Ok(json!({ "results": results }))
            }
            Command::Stats => {
                let counts = self
                    .repository
                    .counts()
                    .await
                    .map_err(|e| AppError::Store(e.into()))?;
                Ok(json!({ "database": counts, "cache": self.cache.stats() }))
            }
        }
    }

    /// Read a JSON array of `{"city": .., "province": ..}` objects
    ///
    /// Names are trimmed, and an item with an empty city or province name
    /// rejects the whole file.
    pub fn read_import_file(path: &Path) -> Result<Vec<NewCity>, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::File(format!("Failed to read import file {:?}: {}", path, e)))?;

        let items: Vec<NewCity> = serde_json::from_str(&content).map_err(|e| {
            AppError::InvalidInput(format!("Failed to parse import file {:?}: {}", path, e))
        })?;

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                validate_city(item).map_err(|e| {
                    AppError::InvalidInput(format!("Import item {} in {:?}: {}", index, path, e))
                })
            })
            .collect()
    }

    /// Interactive session: one command per input line, one JSON line per response.
    ///
    /// Blank lines and lines starting with `#` are skipped; `quit` or `exit`
    /// ends the session. Returns the number of commands executed.
    pub async fn run_shell<R, W>(&self, input: R, mut output: W) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut executed = 0;

        while let Some(line) = lines.next_line().await.context("Failed to read shell input")? {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                break;
            }

            let response = match line.parse::<Command>() {
                Ok(command) => match self.execute(command).await {
                    Ok(value) => {
                        executed += 1;
                        value
                    }
                    Err(e) => {
                        warn!("Command failed: {:#}", e);
                        json!({ "error": format!("{:#}", e) })
                    }
                },
                Err(e) => json!({ "error": e.to_string() }),
            };

            let mut rendered = serde_json::to_string(&response)
                .map_err(|e| anyhow!("Failed to render response: {}", e))?;
            rendered.push('\n');
            output
                .write_all(rendered.as_bytes())
                .await
                .context("Failed to write shell output")?;
        }

        output.flush().await.context("Failed to flush shell output")?;
        Ok(executed)
    }
}
