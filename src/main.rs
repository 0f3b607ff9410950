//! gesture-console
//!
//! Terminal control console for a gesture-recognition engine. Keeps a local
//! view of the engine's run state, gesture registry and recording workflow in
//! sync with the backend through requests, status polling and pushed events.

mod api;
mod config;
mod device;
mod logging;
mod push;
mod sync;
mod ui;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use api::HttpBackend;
use config::Config;
use sync::{create_console_channels, Command, Coordinator};

/// Options taken from the command line
#[derive(Debug, Default)]
struct CliArgs {
    help: bool,
    config_path: Option<PathBuf>,
    backend_url: Option<String>,
    no_push: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => cli.help = true,
            "-c" | "--config" => {
                let path = iter.next().context("--config needs a path")?;
                cli.config_path = Some(PathBuf::from(path));
            }
            "-b" | "--backend" => {
                let url = iter.next().context("--backend needs a URL")?;
                cli.backend_url = Some(url.clone());
            }
            "--no-push" => cli.no_push = true,
            other => bail!("unknown argument '{}', see --help", other),
        }
    }

    Ok(cli)
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    if cli.help {
        print_help();
        return Ok(());
    }

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = logging::init_logging()?;

    info!("gesture-console starting...");

    // Load configuration
    let mut config = match cli.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Configuration loaded from {:?}", config.config_path());

    if let Some(url) = cli.backend_url {
        config.set_base_url(url);
    }
    if cli.no_push {
        config.push.enabled = false;
    }
    info!("Using backend at {}", config.backend.base_url);

    let runtime = Arc::new(tokio::runtime::Runtime::new()?);
    let backend = HttpBackend::new(&config)?;

    let (cmd_tx, cmd_rx, push_tx, push_rx) = create_console_channels();

    // Push channel is optional; without it retrain and recording never resolve
    let push_rx = if config.push.enabled {
        let url = backend.url(&config.push.events_path);
        let client = backend.client().clone();
        let _guard = runtime.enter();
        push::spawn_push_listener(client, url, push_tx);
        Some(push_rx)
    } else {
        warn!("Push events disabled; retrain and recording results will not arrive");
        drop(push_tx);
        None
    };

    // Camera check reports into the feed once the coordinator starts
    if let Some(device) = config.camera.device.clone() {
        let device_tx = cmd_tx.clone();
        runtime.spawn(async move {
            let status = device::check_camera(&device).await;
            let _ = device_tx.send(Command::Device(status)).await;
        });
    }

    let coordinator = Coordinator::new(&config, Arc::new(backend), cmd_rx, push_rx);
    let view_rx = coordinator.subscribe_view();
    let feed_rx = coordinator.subscribe_feed();

    // Set up Ctrl+C handler that sends shutdown command
    let ctrl_c_tx = cmd_tx.clone();
    let ctrl_c_runtime = runtime.clone();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        let tx = ctrl_c_tx.clone();
        ctrl_c_runtime.spawn(async move {
            let _ = tx.send(Command::Shutdown).await;
        });
    })?;

    runtime.block_on(async move {
        let mut coordinator_handle = tokio::spawn(coordinator.run());
        ui::spawn_printers(feed_rx, view_rx.clone());

        tokio::select! {
            result = ui::run_console(cmd_tx.clone(), view_rx) => {
                if let Err(e) = result {
                    error!("Console error: {}", e);
                }
                let _ = cmd_tx.send(Command::Shutdown).await;
                if let Err(e) = coordinator_handle.await {
                    error!("Coordinator task failed: {}", e);
                }
            }
            result = &mut coordinator_handle => {
                if let Err(e) = result {
                    error!("Coordinator task failed: {}", e);
                }
            }
        }
    });

    info!("Shutdown complete");
    Ok(())
}

fn print_help() {
    println!("gesture-console - Control console for the gesture recognition engine");
    println!();
    println!("USAGE:");
    println!("    gesture-console [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help            Print this help message");
    println!("    -c, --config <PATH>   Use this config file instead of the default");
    println!("    -b, --backend <URL>   Override the backend base URL");
    println!("        --no-push         Do not subscribe to pushed events");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                  Set log level (e.g., debug, info, warn)");
    println!("    GESTURE_CONSOLE_LOG_PATH  Directory for log files");
    println!();
    println!("Type 'help' at the prompt for console commands.");
}
