//! ==============================================================================
//! poller.rs - polling loops for device telemetry and phone location
//! ==============================================================================
//!
//! purpose:
//!     two independent loops pull from the upstream server and publish into
//!     the shared state:
//!
//! ```text
//!     device loop (2s):  /api/data      -> DeviceStateStore -> state.devices
//!     phone loop  (5s):  /api/hp-latest -> reconcile + phone::build -> state.geo/phone
//! ```
//!
//! scheduling contract:
//!     a loop sleeps for its period only after the current request settles,
//!     so each stream has at most one request in flight. a slow upstream
//!     just stretches the cycle. the next cycle is scheduled whether the
//!     current one succeeded or failed.
//!
//! failure handling:
//!     transport/parse failures are logged and recorded in the feed status;
//!     the last good snapshot stays published. they never stop the loop.
//!     a "no data" phone report clears the published position.
//!
//! relationships:
//!     - uses: domain.rs, store.rs, route.rs, phone.rs, state.rs
//!     - used by: main.rs (spawns both loops)
//!
//! ==============================================================================

use crate::config::UpstreamConfig;
use crate::domain::{DeviceBatch, DeviceReport, PhoneReport};
use crate::metrics::{format_bytes, format_celsius, format_ghz, format_percent};
use crate::phone::{self, PhoneView};
use crate::route::{self, Coordinates, GeoState};
use crate::state::SharedState;
use crate::store::{DeviceStateStore, SnapshotMap};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ==============================================================================
// transport seam
// ==============================================================================

/// where telemetry comes from. `HttpSource` in production.
pub trait TelemetrySource: Send + Sync + 'static {
    fn fetch_devices(&self) -> impl Future<Output = Result<DeviceBatch>> + Send;
    fn fetch_phone(&self) -> impl Future<Output = Result<PhoneReport>> + Send;
}

pub struct HttpSource {
    client: reqwest::Client,
    devices_url: String,
    phone_url: String,
}

impl HttpSource {
    pub fn new(upstream: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            devices_url: upstream.devices_url(),
            phone_url: upstream.phone_url(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("GET {} returned an error status", url))?
            .json::<T>()
            .await
            .with_context(|| format!("GET {} returned malformed json", url))
    }
}

impl TelemetrySource for HttpSource {
    /// entries are decoded one by one so a malformed device cannot drop the batch
    async fn fetch_devices(&self) -> Result<DeviceBatch> {
        let entries: BTreeMap<String, Value> = self.get_json(&self.devices_url).await?;
        let batch = entries
            .into_iter()
            .map(|(id, entry)| (id, DeviceReport::from_value(entry)))
            .collect();
        Ok(batch)
    }

    async fn fetch_phone(&self) -> Result<PhoneReport> {
        self.get_json(&self.phone_url).await
    }
}

// ==============================================================================
// device loop
// ==============================================================================

pub struct DevicePoller<S> {
    source: Arc<S>,
    store: DeviceStateStore,
    state: SharedState,
    show_device_data: bool,
}

impl<S: TelemetrySource> DevicePoller<S> {
    pub fn new(
        source: Arc<S>,
        store: DeviceStateStore,
        state: SharedState,
        show_device_data: bool,
    ) -> Self {
        Self {
            source,
            store,
            state,
            show_device_data,
        }
    }

    /// one request/ingest/publish cycle; returns the number of devices
    pub async fn poll_once(&mut self) -> Result<usize> {
        let batch = self.source.fetch_devices().await?;
        let snapshots = self.store.ingest(batch);
        let count = snapshots.len();

        if self.show_device_data {
            log_devices(&snapshots);
        }

        let mut guard = self.state.write().await;
        guard.devices = snapshots;
        guard.device_feed = guard.device_feed.succeeded();
        Ok(count)
    }

    async fn cycle(&mut self) {
        match self.poll_once().await {
            Ok(0) => debug!("[DEVICES] no devices reported"),
            Ok(count) => debug!("[DEVICES] {} device(s) updated", count),
            Err(e) => {
                let mut guard = self.state.write().await;
                guard.device_feed = guard.device_feed.failed(format!("{:#}", e));
                warn!("[DEVICES] ⚠ poll failed: {:#}", e);
            }
        }
    }

    pub async fn run(mut self, period: Duration) {
        info!("[DEVICES] polling every {}ms", period.as_millis());
        loop {
            self.cycle().await;
            tokio::time::sleep(period).await;
        }
    }
}

fn log_devices(snapshots: &SnapshotMap) {
    for (id, snap) in snapshots.iter() {
        let r = &snap.readings;
        info!(
            device = %id,
            online = snap.online,
            "CPU={} MEM={} DISK={} TEMP={} FREQ={} BATT={} RAM={}",
            format_percent(r.cpu_percent),
            format_percent(r.memory_percent),
            format_percent(r.disk_percent),
            format_celsius(r.temperature_c),
            format_ghz(r.frequency_mhz),
            format_percent(r.battery_percent),
            format_bytes(snap.info.memory_total_bytes),
        );
    }
}

// ==============================================================================
// phone loop
// ==============================================================================

pub struct PhonePoller<S> {
    source: Arc<S>,
    state: SharedState,
}

impl<S: TelemetrySource> PhonePoller<S> {
    pub fn new(source: Arc<S>, state: SharedState) -> Self {
        Self { source, state }
    }

    /// one request/reconcile/publish cycle; returns whether data was available
    pub async fn poll_once(&mut self) -> Result<bool> {
        let report = self.source.fetch_phone().await?;
        let geo = route::reconcile(
            &report.route,
            &report.snapped_route,
            Coordinates::from_parts(report.lat, report.lng),
        );
        let view = phone::build(&report, &geo);

        // no data means no marker, even when explicit coordinates came along
        let geo = match &view {
            PhoneView::NoData { reason } => {
                info!("[PHONE] no data: {}", reason);
                GeoState::default()
            }
            PhoneView::Available(_) => {
                debug!(
                    "[PHONE] {} route point(s), resolved: {}",
                    geo.route.len(),
                    geo.is_resolved()
                );
                geo
            }
        };

        let available = view.is_available();
        let mut guard = self.state.write().await;
        guard.geo = geo;
        guard.phone = Some(view);
        guard.phone_feed = guard.phone_feed.succeeded();
        Ok(available)
    }

    async fn cycle(&mut self) {
        if let Err(e) = self.poll_once().await {
            let mut guard = self.state.write().await;
            guard.phone_feed = guard.phone_feed.failed(format!("{:#}", e));
            warn!("[PHONE] ⚠ poll failed: {:#}", e);
        }
    }

    pub async fn run(mut self, period: Duration) {
        info!("[PHONE] polling every {}ms", period.as_millis());
        loop {
            self.cycle().await;
            tokio::time::sleep(period).await;
        }
    }
}
