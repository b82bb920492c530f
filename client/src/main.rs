//! VM Lab client - Entry Point
//!
//! Provisions lab deployments from templates and follows their provisioning
//! tasks against the VM Lab backend.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use colored::Colorize;
use tracing::{error, info};

use vmlab::app::options::{AppOptions, Command};
use vmlab::app::run::run;
use vmlab::filesys::file::File;
use vmlab::logs::{init_logging, LogLevel, LogOptions};
use vmlab::storage::layout::StorageLayout;
use vmlab::storage::settings::Settings;
use vmlab::utils::version_info;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    let command = match Command::from_args(&cli_args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(2);
        }
    };

    // Retrieve the settings file
    let layout = StorageLayout::default();
    let settings_file = match cli_args.get("settings") {
        Some(path) => File::new(PathBuf::from(path)),
        None => layout.settings_file(),
    };
    let settings = match Settings::load(&settings_file).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} unable to read settings file: {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let log_dir = if settings.log_to_file {
        let logs_dir = layout.logs_dir();
        match logs_dir.create().await {
            Ok(()) => Some(logs_dir.path().to_path_buf()),
            Err(e) => {
                eprintln!("Failed to create log directory: {e}");
                None
            }
        }
    } else {
        None
    };
    let log_level = match cli_args.get("log-level").map(|raw| raw.parse::<LogLevel>()) {
        Some(Ok(level)) => level,
        Some(Err(e)) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(2);
        }
        None => settings.log_level,
    };
    let log_options = LogOptions {
        log_level,
        log_dir,
        json_format: settings.log_json,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let mut options = AppOptions::from_settings(&settings, layout);
    options.token_override = cli_args
        .get("token")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| env::var("VMLAB_TOKEN").ok().filter(|t| !t.trim().is_empty()));

    info!("VM Lab client {} ({})", version.version, version.git_hash);
    if let Err(e) = run(command, options, await_shutdown_signal()).await {
        error!("Command failed: {e}");
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
