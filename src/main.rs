use phototray::clipboard::SystemClipboard;
use phototray::config::Config;
use phototray::library::PhotoKitClient;
use phototray::optimizer::JpegOptimizer;
use phototray::pipeline::Pipeline;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.general.log_level.clone())),
        )
        .with_target(false)
        .init();

    info!("Phototray starting");
    info!("Config path: {}", Config::default_config_path().display());
    info!("Cache directory: {}", config.cache_dir().display());

    if !config.general.enabled {
        info!("Disabled in config, exiting");
        return Ok(());
    }

    // The optimizer is mandatory: without it every save would fail closed,
    // so refuse to start instead of running a pipeline that caches nothing.
    let optimizer = match JpegOptimizer::from_config(&config.optimizer) {
        Some(optimizer) => {
            info!("Using optimizer at {}", optimizer.binary_path().display());
            optimizer
        }
        None => {
            error!(
                "{} not found on PATH. Install it with: brew install jpegoptim",
                config.optimizer.binary_name
            );
            return Err(phototray::PipelineError::OptimizerMissing.into());
        }
    };

    let clipboard = Arc::new(SystemClipboard::new());
    let library = Arc::new(PhotoKitClient::new());
    if !library.is_available() {
        warn!("photokit-helper not found, photo resolution will be unavailable");
    }

    let mut pipeline = Pipeline::new(config.clone(), clipboard, library, Some(optimizer));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut ticker = tokio::time::interval(config.poll_interval());
    info!(
        "Watching clipboard every {:?}, press Ctrl+C to stop",
        config.poll_interval()
    );

    while running.load(Ordering::SeqCst) {
        ticker.tick().await;
        pipeline.tick().await;
    }

    info!("Shutting down");
    Ok(())
}
