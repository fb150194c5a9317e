use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use device_watch::{DeviceWatch, WatchConfig, WatchEvent};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Window class name prefix used for the notification window
    #[arg(long, default_value = "device-notification")]
    class_prefix: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a line for every device attach or removal
    Watch {
        /// Stop after this many device changes
        #[arg(short, long)]
        count: Option<u64>,
        /// Stop after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Report whether device notifications are supported here
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    match args.command {
        Commands::Check => {
            if device_watch::is_supported() {
                println!("Device notifications are supported.");
            } else {
                println!("Device notifications are not supported on {}.", std::env::consts::OS);
            }
        }
        Commands::Watch { count, timeout } => {
            let config = WatchConfig::default().with_class_prefix(args.class_prefix);
            run_watch(config, count, timeout.map(Duration::from_secs)).await?;
        }
    }

    Ok(())
}

async fn run_watch(config: WatchConfig, count: Option<u64>, timeout: Option<Duration>) -> Result<()> {
    let mut watch = DeviceWatch::spawn(config);
    let cancel = watch.cancellation_token();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping...");
                cancel.cancel();
            }
        }
    });
    if let Some(timeout) = timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            info!("Timeout reached, stopping...");
            cancel.cancel();
        });
    }

    info!("Waiting for device changes (Ctrl-C to stop)...");
    let mut seen = 0u64;
    while let Some(event) = watch.next().await {
        match event {
            WatchEvent::DeviceChanged => {
                seen += 1;
                println!("Device change #{}", seen);
                if count.is_some_and(|limit| seen >= limit) {
                    watch.stop();
                }
            }
            WatchEvent::Diagnostic(message) => warn!("{}", message),
        }
    }

    if let Err(e) = watch.finish().await {
        error!("Device watch failed: {}", e);
        return Err(e.into());
    }
    info!("Saw {} device change(s)", seen);
    Ok(())
}
