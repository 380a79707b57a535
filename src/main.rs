// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use settings::{Profile, Settings};
use std::net::SocketAddr;
use std::path::PathBuf;

mod database;
mod error;
mod recipe_card;
mod settings;
mod unit_conversion;
mod web;

pub use error::Error;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
#[command(version, about = "Recipe book web service")]
struct Args {
    /// Which settings profile to run with.
    #[arg(long, env = "GALLEY_MATE_SETTINGS", value_enum, default_value_t = Profile::Development)]
    settings: Profile,

    /// SQLite database file. Defaults to `data.sqlite` in the user data directory.
    #[arg(long, env = "GALLEY_MATE_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the cookbook, API and admin endpoints.
    Run {
        #[arg(long, env = "GALLEY_MATE_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,

        /// Token accepted for writes. May be repeated.
        #[arg(
            long = "api-token",
            env = "GALLEY_MATE_API_TOKENS",
            value_delimiter = ',',
            hide_env_values = true
        )]
        api_tokens: Vec<String>,
    },
    /// Apply pending migrations and exit.
    Migrate,
}

/// This is where the database lives on-disk by default. On Linux it should be like:
/// `~/.local/share/galley_mate/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "failed to get user home directory",
        ))
    })?;
    let path = dirs.data_dir().join("galley_mate");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn init_logging(settings: &Settings) -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(settings.log_level())
        .env()
        .init()?;
    Ok(())
}

async fn run(settings: Settings, bind: SocketAddr) -> Result<()> {
    if settings.api_tokens.is_empty() {
        if settings.debug() {
            log::info!("no API tokens configured, writes will be refused");
        } else {
            log::warn!("no API tokens configured, writes will be refused");
        }
    }
    let conn = database::establish_connection(&settings.database)?;
    web::serve(web::AppState::new(conn, settings), bind).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let database = match args.database {
        Some(path) => path,
        None => data_path()?.join("data.sqlite"),
    };
    let api_tokens = match &args.commands {
        Commands::Run { api_tokens, .. } => api_tokens
            .iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect(),
        Commands::Migrate => vec![],
    };
    let settings = Settings {
        profile: args.settings,
        database,
        api_tokens,
    };
    init_logging(&settings)?;
    log::info!(
        "settings profile {}, database {}",
        settings.profile,
        settings.database.display()
    );

    match args.commands {
        Commands::Run { bind, .. } => run(settings, bind).await?,
        Commands::Migrate => {
            database::establish_connection(&settings.database)?;
            log::info!("database is up to date");
        }
    }
    Ok(())
}
