// Operator console for the signal controller.
//
// Usage: atlas_signal <config.toml> [--start]
//
// Commands on stdin:
//   start    sample every approach and (re)seed the rotation
//   capture  store a fresh frame per approach without scheduling
//   status   print the signal board
//   quit     stop the controller and exit

use anyhow::{Context, Result};
use atlas_signal::{ControllerConfig, SignalController, SignalEvent};
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("atlas_signal=info")),
        )
        .init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    let Some(config_path) = args.get(1) else {
        println!("Usage: atlas_signal <config.toml> [--start]");
        return Ok(());
    };
    let start_now = args.iter().skip(2).any(|a| a == "--start");

    let config = ControllerConfig::load(config_path)
        .with_context(|| format!("loading configuration from {config_path}"))?;
    let controller = Arc::new(SignalController::from_config(&config).context("starting controller")?);

    // --- 2. Board Printer ---
    let printer = {
        let controller = Arc::clone(&controller);
        let mut events = controller.subscribe().await;
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SignalEvent::StayedIdle) => {
                        println!("No vehicles detected on any approach; signals stay red.");
                    }
                    Ok(_) => print!("{}", controller.board().await),
                    Err(RecvError::Lagged(missed)) => warn!(missed, "board printer fell behind"),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    if start_now {
        run_start(&controller).await;
    }

    // --- 3. Operator Commands ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "start" => run_start(&controller).await,
            "capture" => {
                for capture in controller.capture_frames().await {
                    match capture.stored_at {
                        Some(path) => println!("{}: {}", capture.name, path.display()),
                        None => println!("{}: no frame", capture.name),
                    }
                }
            }
            "status" => {
                print!("{}", controller.board().await);
                if let Some(dwell) = controller.dwell_elapsed().await {
                    println!("green for {:.1}s", dwell.as_secs_f64());
                }
            }
            "quit" | "exit" => break,
            other => println!("unknown command {other:?} (start, capture, status, quit)"),
        }
    }

    controller.shutdown();
    printer.abort();
    info!("controller stopped");
    Ok(())
}

async fn run_start(controller: &SignalController) {
    info!("starting cycle");
    match controller.run_cycle().await {
        Ok(state) => info!(?state, "cycle complete"),
        Err(err) => error!(error = %err, "cycle failed"),
    }
}
