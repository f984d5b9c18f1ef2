//! ==============================================================================
//! main.rs - monitor host entry point
//! ==============================================================================
//!
//! purpose:
//!     aggregates telemetry from the monitoring server for two kinds of
//!     devices: stationary machines (laptops/pcs running the agent) and one
//!     mobile phone with a location history.
//!
//! responsibilities:
//!     - load configuration (config/monitor.toml or defaults)
//!     - initialize logging
//!     - run the device poll loop (2s) and the phone poll loop (5s)
//!     - serve normalized state as json for renderers
//!
//! architecture:
//!
//! ```text
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                    monitor host (this file)                  │
//!     │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//!     │  │ device loop │  │ phone loop  │  │ json api            │  │
//!     │  │ (2s cycle)  │  │ (5s cycle)  │  │ (port 3000)         │  │
//!     │  └──────┬──────┘  └──────┬──────┘  └──────────┬──────────┘  │
//!     │         │ write          │ write              │ read        │
//!     │         └────────────────┼────────────────────┘             │
//!     │                    ┌─────┴─────┐                            │
//!     │                    │ AppState  │ <- state.rs                │
//!     │                    └───────────┘                            │
//!     └─────────────────────────────────────────────────────────────┘
//!              ▲                    ▲
//!         GET /api/data      GET /api/hp-latest
//!              └──── monitoring server ────┘
//! ```
//!
//! ==============================================================================

use monitor_host::config::MonitorConfig;
use monitor_host::poller::{DevicePoller, HttpSource, PhonePoller};
use monitor_host::server;
use monitor_host::state;
use monitor_host::store::DeviceStateStore;

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: logging at RUST_LOG (or info) until the config says otherwise
    let log_filter = init_logging();

    // step 2: load configuration
    let config = MonitorConfig::load_or_default();
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none() {
        let level = &config.logging.level;
        if let Err(e) = log_filter.reload(EnvFilter::new(level)) {
            tracing::warn!("[CONFIG] could not apply log level {}: {}", level, e);
        }
    }

    tracing::info!("===========================================================");
    tracing::info!("  Monitor Host - device telemetry + phone location");
    tracing::info!("===========================================================");
    config.log_summary();

    // step 3: initialize shared state and transport
    let state = state::new_shared();
    let source = Arc::new(HttpSource::new(&config.upstream)?);

    // step 4: start the json api in background
    if config.server.enabled {
        let web_state = state.clone();
        let bind = config.server.bind.clone();
        tokio::spawn(async move {
            tracing::info!("[STARTUP] ✓ API live at http://{}", bind);
            if let Err(e) = server::run_server(web_state, &bind).await {
                tracing::error!("[ERROR] Web server error: {:#}", e);
            }
        });
    }

    // step 5: polling loops, one per stream
    let store = DeviceStateStore::new(config.history.capacity, (&config.thresholds).into());
    let show_device_data = config.logging.show_device_data;
    let devices = DevicePoller::new(source.clone(), store, state.clone(), show_device_data);
    let phone = PhonePoller::new(source, state);

    tokio::spawn(devices.run(config.polling.devices_interval()));
    tokio::spawn(phone.run(config.polling.phone_interval()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("[SHUTDOWN] ctrl-c received, exiting");
    Ok(())
}

fn init_logging() -> reload::Handle<EnvFilter, Registry> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info"),
    };
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    handle
}
