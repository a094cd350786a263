// locker - command-line front end for a smart-locker bank

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smartlocker::config::{LockerConfig, StorageConfig};
use smartlocker::storage::AssignmentStore;
use smartlocker::transport::BtleplugTransport;
use smartlocker::LockerSession;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "locker")]
#[command(about = "Request a smart locker over BLE and reopen it with its code", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the JSON file holding the last assignment
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the bank for a locker and print its code
    Request,
    /// Send a code to open its locker
    Open {
        /// Code as printed by `request`; surrounding whitespace is ignored
        code: String,
        /// Keep the stored code after opening
        #[arg(long)]
        keep: bool,
    },
    /// Show the stored assignment without touching the radio
    Status,
    /// Forget the stored code
    Forget,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => LockerConfig::default_path()?,
    };
    let mut config = LockerConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(path) = cli.store {
        config.storage = StorageConfig::Json { path };
    }
    let store = config.storage.open().context("Failed to open assignment store")?;

    match cli.command {
        Commands::Status => {
            print_assignment(&store.load());
            Ok(())
        }
        Commands::Forget => {
            let mut record = store.load();
            record.code = None;
            store.write(&record).context("Failed to persist assignment")?;
            println!("Code cleared.");
            Ok(())
        }
        Commands::Request => {
            let transport = BtleplugTransport::new(config.timing.scan_window())
                .await
                .context("Bluetooth unavailable")?;
            let mut session = LockerSession::new(config, transport, store);
            session.register_door_callback(|door| info!(door, "door assigned"));
            session.register_available_callback(|count| info!(?count, "lockers available"));

            let code = session.request_locker().await.map_err(describe)?;
            println!("Code:      {code}");
            println!("Door:      {}", session.door().unwrap_or("N/A"));
            println!("Available: {}", show_count(session.available()));
            Ok(())
        }
        Commands::Open { code, keep } => {
            let transport = BtleplugTransport::new(config.timing.scan_window())
                .await
                .context("Bluetooth unavailable")?;
            let mut session = LockerSession::new(config, transport, store);

            session.open_locker(&code).await.map_err(describe)?;
            println!("Locker opened.");
            if !keep {
                session.forget_code();
            }
            Ok(())
        }
    }
}

fn describe(error: smartlocker::LockerError) -> anyhow::Error {
    if error.is_connection_error() {
        anyhow::Error::new(error).context("Could not connect to the locker")
    } else {
        anyhow::Error::new(error).context("Locker operation failed")
    }
}

fn show_count(count: Option<i64>) -> String {
    count.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

fn print_assignment(record: &smartlocker::LockerAssignment) {
    println!("Code:      {}", record.code.as_deref().unwrap_or("N/A"));
    println!("Door:      {}", record.door.as_deref().unwrap_or("N/A"));
    println!("Available: {}", show_count(record.available));
}
