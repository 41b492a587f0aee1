//! Deckhand - Entry Point
//!
//! Runs deployment scripts against configured hosts and serves the
//! resulting per-host history over a local HTTP API.

use std::collections::HashMap;
use std::env;

use deckhand::app::run::run;
use deckhand::filesys::file::File;
use deckhand::logs::{init_logging, LogOptions};
use deckhand::storage::layout::StorageLayout;
use deckhand::storage::settings::Settings;
use deckhand::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            cli_args.insert(key.trim_start_matches('-').to_string(), value.to_string());
        } else if arg.starts_with("--") {
            cli_args.insert(arg.trim_start_matches('-').to_string(), "true".to_string());
        }
    }

    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Unable to print version: {e}"),
        }
        return;
    }

    let layout = match cli_args.get("data-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    let config_file = match cli_args.get("config") {
        Some(path) => File::new(path),
        None => layout.config_file(),
    };
    let settings = match config_file.read_json_opt::<Settings>().await {
        Ok(Some(settings)) => settings,
        Ok(None) => Settings::default(),
        Err(e) => {
            eprintln!(
                "Unable to read settings file {}: {e}",
                config_file.path().display()
            );
            return;
        }
    };

    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.log_json,
        log_dir: settings.log_to_file.then(|| layout.service_log_dir()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    info!("Running deckhand {} ({})", version.version, version.git_hash);
    if let Err(e) = run(settings, layout, await_shutdown_signal()).await {
        error!("Deckhand stopped with an error: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    error!("Unable to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
        info!("Ctrl+C received, shutting down...");
    }
}
