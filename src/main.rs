use std::process::ExitCode;

use chrono::Utc;
use tracing::{error, info};

use cloudshelf::{format_file_size, Config, Drive};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = cloudshelf::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        cloudshelf::logging::init_console_only(&config.logging.level);
    }

    info!("cloudshelf starting");

    let drive = match Drive::open_local(&config).await {
        Ok(drive) => drive,
        Err(e) => {
            error!("Failed to open drive: {e}");
            return ExitCode::FAILURE;
        }
    };

    let listing = drive.listing();
    listing.refresh().await;

    if let Some(message) = listing.error().await {
        error!("{message}");
        return ExitCode::FAILURE;
    }

    let now = Utc::now();
    println!("{}", listing.path().await.display());
    for item in drive.default_view("").await {
        let kind = if item.is_folder() { "d" } else { "-" };
        let star = if item.starred { "*" } else { " " };
        println!(
            "{kind}{star} {:>10}  {:<12}  {}",
            format_file_size(item.size_bytes),
            drive.format_modified(&item, &now),
            item.name
        );
    }

    let usage = listing.storage_usage().await;
    println!(
        "{} of {} used ({:.1}%), {} files",
        format_file_size(usage.used_bytes),
        format_file_size(usage.total_bytes),
        usage.percent_used(),
        usage.file_count
    );

    ExitCode::SUCCESS
}
