// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use cityinfo::app_config::{Config, LogLevel};
use cityinfo::app_controller::{parse_city_spec, Command, Controller};
use cityinfo::NewCity;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the city names of a province (cache first, then database)
    Lookup {
        /// Province id
        province_id: i64,
    },

    /// Add cities, creating their provinces on first use
    Add {
        /// Cities as CITY@PROVINCE
        #[arg(value_name = "CITY@PROVINCE", required = true, value_parser = parse_city_spec)]
        cities: Vec<NewCity>,
    },

    /// Remove cities by id
    RemoveCities {
        /// City ids
        #[arg(required = true)]
        city_ids: Vec<i64>,
    },

    /// Remove a province together with all of its cities
    RemoveProvince {
        /// Province id
        province_id: i64,
    },

    /// List provinces with their city counts
    Provinces,

    /// List the city rows (with ids) of a province
    Cities {
        /// Province id
        province_id: i64,
    },

    /// Add every city listed in a JSON file
    Import {
        /// JSON array of {"city": "...", "province": "..."}
        file: PathBuf,
    },

    /// Show row counts and cache statistics
    Stats,

    /// Read commands from stdin, one per line, keeping the cache warm
    Shell,

    /// Generate shell completions for cityinfo
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// cityinfo - province and city directory
///
/// Keeps provinces and their cities in SQLite and serves lookups through a
/// read-through cache.
#[derive(Parser, Debug)]
#[command(name = "cityinfo")]
#[command(version)]
#[command(about = "Province and city directory backed by SQLite and a city cache")]
#[command(long_about = "cityinfo stores provinces and their cities in SQLite and mirrors city names into a cache.

EXAMPLES:
    cityinfo add Springfield@Lakeland Shelbyville@Lakeland
    cityinfo provinces
    cityinfo lookup 1
    cityinfo cities 1
    cityinfo remove-cities 2 3
    cityinfo remove-province 1
    cityinfo import cities.json
    cityinfo shell < commands.txt
    cityinfo completions bash > cityinfo.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Use a throwaway in-memory database
    #[arg(long, global = true, conflicts_with = "database")]
    in_memory: bool,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; log::set_max_level does the filtering
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(level) = &cli.log_level {
        let level: LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let command = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "cityinfo", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Lookup { province_id } => Some(Command::Lookup(province_id)),
        Commands::Add { cities } => Some(Command::Add(cities)),
        Commands::RemoveCities { city_ids } => Some(Command::RemoveCities(city_ids)),
        Commands::RemoveProvince { province_id } => Some(Command::RemoveProvince(province_id)),
        Commands::Provinces => Some(Command::Provinces),
        Commands::Cities { province_id } => Some(Command::Cities(province_id)),
        Commands::Import { file } => Some(Command::Import(file)),
        Commands::Stats => Some(Command::Stats),
        Commands::Shell => None,
    };

    let (mut config, created) = Config::load_or_create(&cli.config_path)?;
    if created {
        warn!("Config file not found at '{}', created default config.", cli.config_path);
    }

    if let Some(path) = &cli.database {
        config.database.path = Some(path.to_string_lossy().to_string());
        config.database.in_memory = false;
    }
    if cli.in_memory {
        config.database.in_memory = true;
    }
    match &cli.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    let controller = Controller::with_config(config)?;

    match command {
        Some(command) => {
            let response = controller.execute(command).await?;
            let rendered =
                serde_json::to_string_pretty(&response).context("Failed to render response")?;
            println!("{}", rendered);
        }
        None => {
            info!("Reading commands from stdin (quit or EOF to stop)");
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let executed = controller.run_shell(stdin, tokio::io::stdout()).await?;
            info!("Shell finished after {} commands", executed);
        }
    }

    Ok(())
}
