//! Smart Money CLI - log in, inspect and manage the Smart Money session
//! from a terminal.

mod commands;

use std::io;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smartmoney_core::Config;

/// Log file prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "smartmoney.log";

#[derive(Parser)]
#[command(name = "smartmoney")]
#[command(about = "Smart Money session client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        /// Date of birth, YYYY-MM-DD
        #[arg(long)]
        birth_date: NaiveDate,
    },
    /// End the session
    Logout,
    /// Show the logged-in user's profile
    Whoami,
    /// Show the local session state
    Status,
    /// Exchange the current token for a new one
    Refresh,
    /// Show what the route guard does for a path
    Navigate { path: String },
    /// Update profile fields
    UpdateProfile {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Date of birth, YYYY-MM-DD
        #[arg(long)]
        birth_date: Option<NaiveDate>,
    },
    /// Change the account password
    ChangePassword {
        #[arg(long)]
        id: i64,
    },
    /// Upload a new profile picture
    UploadPicture {
        #[arg(long)]
        id: i64,
        file: std::path::PathBuf,
    },
}

/// Initialize the tracing subscriber for logging.
/// Logs go to stderr and to a daily file in the cache directory.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match Config::default_cache_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing();

    let mut config = Config::load()?;
    for message in config.apply_env_overrides(|key| std::env::var(key).ok()) {
        warn!("{}", message);
    }
    info!(api = %config.api_base_url, "Smart Money CLI starting");

    let manager = commands::build_manager(&config).await?;

    match cli.command {
        Commands::Login { email } => commands::login(&manager, &mut config, email).await?,
        Commands::Register {
            name,
            last_name,
            email,
            birth_date,
        } => commands::register(&manager, &mut config, name, last_name, email, birth_date).await?,
        Commands::Logout => commands::logout(&manager).await,
        Commands::Whoami => commands::whoami(&manager).await?,
        Commands::Status => commands::status(&manager).await?,
        Commands::Refresh => commands::refresh(&manager).await?,
        Commands::Navigate { path } => commands::navigate(&manager, &path),
        Commands::UpdateProfile {
            id,
            name,
            last_name,
            email,
            birth_date,
        } => commands::update_profile(&manager, id, name, last_name, email, birth_date).await?,
        Commands::ChangePassword { id } => commands::change_password(&manager, id).await?,
        Commands::UploadPicture { id, file } => commands::upload_picture(&manager, id, &file).await?,
    }

    Ok(())
}
