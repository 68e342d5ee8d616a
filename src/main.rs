use clap::{Parser, Subcommand};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use device_monitor::config::MonitorConfig;
use device_monitor::db::models::{DeviceUpdate, NewMonitorDevice};
use device_monitor::db::services::{SeaOrmDeviceStore, ensure_schema};
use device_monitor::monitoring::prober::NetworkProber;
use device_monitor::monitoring::resolver::DnsResolver;
use device_monitor::monitoring::{MonitorCycle, start_periodic_monitoring};
use device_monitor::notifications::NotificationService;
use device_monitor::services::DeviceService;
use device_monitor::version::VERSION;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor on its schedule until Ctrl-C (default)
    Run,
    /// Run a single monitor cycle and exit
    RunOnce,
    /// Manage the monitor queue
    Devices {
        #[command(subcommand)]
        action: DeviceCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DeviceCommand {
    /// List queued devices
    List {
        /// Only these device ids
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i32>,
    },
    /// Queue devices from a JSON array of device requests
    Add {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        requested_by: String,
    },
    /// Apply a JSON array of partial device updates
    Update {
        #[arg(long)]
        file: PathBuf,
    },
    /// Remove devices by id
    Remove {
        #[arg(required = true)]
        ids: Vec<i32>,
    },
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "device-monitor.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    let config = MonitorConfig::load(args.config.as_deref());
    init_logging(
        config
            .as_ref()
            .map(|c| c.log_dir.as_str())
            .unwrap_or("logs"),
    );
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load monitor configuration.");
            return Err(e.into());
        }
    };
    info!(version = VERSION, "Starting device monitor.");

    let db = connect(&config.database_url).await?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_scheduler(build_cycle(&config, db), &config).await,
        Command::RunOnce => {
            let report = build_cycle(&config, db).run().await?;
            print_json(&report)
        }
        Command::Devices { action } => manage_devices(DeviceService::new(db), action).await,
    }
}

async fn connect(database_url: &str) -> Result<DatabaseConnection, BoxError> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(10).sqlx_logging(false);

    let db = Database::connect(opt).await.map_err(|e| {
        error!(error = %e, "Failed to create database connection.");
        e
    })?;
    ensure_schema(&db).await?;
    Ok(db)
}

fn build_cycle(config: &MonitorConfig, db: DatabaseConnection) -> Arc<MonitorCycle> {
    info!(notifier = config.channel.kind(), "Notification channel selected.");
    Arc::new(MonitorCycle::new(
        Arc::new(SeaOrmDeviceStore::new(db)),
        Arc::new(NotificationService::new(config.channel.clone())),
        Arc::new(DnsResolver),
        Arc::new(NetworkProber::new(config.icmp_timeout())),
    ))
}

async fn run_scheduler(cycle: Arc<MonitorCycle>, config: &MonitorConfig) -> Result<(), BoxError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let scheduler = tokio::spawn(start_periodic_monitoring(
        cycle,
        config.monitor_interval(),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, waiting for the current cycle to finish.");
    // Receiver gone means the scheduler already stopped.
    let _ = shutdown_tx.send(());
    scheduler.await?;
    info!("Device monitor stopped.");
    Ok(())
}

async fn manage_devices(service: DeviceService, action: DeviceCommand) -> Result<(), BoxError> {
    match action {
        DeviceCommand::List { ids } => {
            let filter = (!ids.is_empty()).then_some(ids.as_slice());
            print_json(&service.get_devices(filter).await?)
        }
        DeviceCommand::Add { file, requested_by } => {
            let requests: Vec<NewMonitorDevice> = read_json(&file)?;
            let ids = service.add_devices(&requested_by, requests).await?;
            print_json(&ids)
        }
        DeviceCommand::Update { file } => {
            let updates: Vec<DeviceUpdate> = read_json(&file)?;
            print_json(&service.update_devices(updates).await?)
        }
        DeviceCommand::Remove { ids } => {
            let removed = service.remove_devices(&ids).await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, BoxError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {e}", path.display()).into())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), BoxError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
