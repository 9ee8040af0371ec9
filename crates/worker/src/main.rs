use std::sync::Arc;
use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trade_agg_controller::Controller;
use trade_agg_core::config::Config;
use trade_agg_hub::Hub;
use trade_agg_store::ConnectionStatusCache;
use trade_agg_worker::{port_loop, ReloadDebugToggle};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    let (filter, reload_handle) =
        tracing_subscriber::reload::Layer::new(EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting trade-agg worker over stdio message port");

    let hub = Hub::new();
    let hub_handle = hub.handle();
    let hub_rx = hub_handle.take_receiver().await;

    let status_cache = ConnectionStatusCache::new();
    let debug_toggle = Arc::new(ReloadDebugToggle::new(reload_handle));
    let controller = Arc::new(tokio::sync::Mutex::new(Controller::with_debug_toggle(
        config,
        hub_handle,
        status_cache.handle(),
        debug_toggle,
    )));

    port_loop::run(controller, hub_rx, tokio::io::stdin(), tokio::io::stdout()).await?;

    info!("trade-agg worker shutting down");
    Ok(())
}
