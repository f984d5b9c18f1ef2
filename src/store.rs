//! ==============================================================================
//! store.rs - per-device snapshot store
//! ==============================================================================
//!
//! purpose:
//!     turns one `/api/data` batch into a complete, immutable snapshot map.
//!     each batch is authoritative: devices missing from it disappear, and
//!     nothing from the previous cycle is merged into the new one.
//!
//! relationships:
//!     - uses: metrics.rs (resolve current values), window.rs (trim history)
//!     - used by: poller.rs (ingest each cycle), server.rs (serialize)
//!
//! ==============================================================================

use crate::domain::{raw_number, raw_text, DeviceBatch, DeviceReport};
use crate::metrics::{self, Metric, RawValue};
use crate::window::{self, HistoryWindow};

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// device id -> snapshot, replaced wholesale every cycle
pub type SnapshotMap = BTreeMap<String, DeviceSnapshot>;

/// alerting thresholds for the classification flags
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    /// strictly above this is a warning
    pub temperature_warning_c: f64,
    /// at or below this (and not charging) is low
    pub battery_low_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature_warning_c: 80.0,
            battery_low_percent: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureStatus {
    Unknown,
    Normal,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    Unknown,
    Normal,
    Low,
    Charging,
}

/// resolved current values, `None` renders as "N/A"
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Readings {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub disk_percent: Option<f64>,
    pub temperature_c: Option<f64>,
    pub battery_percent: Option<f64>,
    pub frequency_mhz: Option<f64>,
}

impl Readings {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::CpuPercent => self.cpu_percent,
            Metric::MemoryPercent => self.memory_percent,
            Metric::DiskPercent => self.disk_percent,
            Metric::CpuTemp => self.temperature_c,
            Metric::BatteryPercent => self.battery_percent,
            Metric::CpuFrequency => self.frequency_mhz,
        }
    }

    fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::CpuPercent => &mut self.cpu_percent,
            Metric::MemoryPercent => &mut self.memory_percent,
            Metric::DiskPercent => &mut self.disk_percent,
            Metric::CpuTemp => &mut self.temperature_c,
            Metric::BatteryPercent => &mut self.battery_percent,
            Metric::CpuFrequency => &mut self.frequency_mhz,
        };
        *slot = value;
    }
}

/// descriptive fields pulled from the raw payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceInfo {
    /// `device_label` from the agent, else the device id
    pub label: String,
    pub hostname: Option<String>,
    pub os: Option<String>,
    pub uptime: Option<String>,
    pub last_update: Option<String>,
    pub wifi_ssid: Option<String>,
    pub ip_addrs: Option<String>,
    pub battery_state: Option<String>,
    pub cpu_freq_max_mhz: Option<f64>,
    pub memory_total_bytes: Option<f64>,
    pub disk_total_bytes: Option<f64>,
    /// `disk_root` text before its `percent=` token
    pub disk_detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub device_id: String,
    pub online: bool,
    pub last_update_age_seconds: Option<f64>,
    pub latest: Map<String, Value>,
    pub readings: Readings,
    pub temperature: TemperatureStatus,
    pub battery: BatteryStatus,
    pub info: DeviceInfo,
    /// history stream name -> trimmed window
    pub histories: BTreeMap<String, HistoryWindow>,
}

impl DeviceSnapshot {
    pub fn history(&self, metric: Metric) -> Option<&HistoryWindow> {
        metric.history_key().and_then(|key| self.histories.get(key))
    }
}

/// owns the current snapshot map; each `ingest` replaces it
#[derive(Debug, Clone)]
pub struct DeviceStateStore {
    capacity: usize,
    thresholds: Thresholds,
    current: Arc<SnapshotMap>,
}

impl Default for DeviceStateStore {
    fn default() -> Self {
        Self::new(window::HISTORY_CAPACITY, Thresholds::default())
    }
}

impl DeviceStateStore {
    pub fn new(capacity: usize, thresholds: Thresholds) -> Self {
        Self {
            capacity,
            thresholds,
            current: Arc::new(SnapshotMap::new()),
        }
    }

    /// build the next snapshot map from a complete batch. total: malformed
    /// fields degrade to `None` on the affected field only.
    pub fn ingest(&mut self, batch: DeviceBatch) -> Arc<SnapshotMap> {
        let next: SnapshotMap = batch
            .into_iter()
            .map(|(device_id, report)| {
                let snapshot = build_snapshot(&device_id, report, self.capacity, &self.thresholds);
                (device_id, snapshot)
            })
            .collect();

        self.current = Arc::new(next);
        Arc::clone(&self.current)
    }

    pub fn current(&self) -> Arc<SnapshotMap> {
        Arc::clone(&self.current)
    }
}

pub fn build_snapshot(
    device_id: &str,
    report: DeviceReport,
    capacity: usize,
    thresholds: &Thresholds,
) -> DeviceSnapshot {
    let mut readings = Readings::default();
    for metric in Metric::ALL {
        let history = metric.history_key().and_then(|k| report.history.stream(k));
        let latest = report.latest.get(metric.latest_key());
        let raw = latest.and_then(RawValue::from_json);
        readings.set(metric, metrics::resolve(history, raw, metric.text_key()));
    }

    let info = device_info(device_id, &report);
    let temperature = classify_temperature(readings.temperature_c, thresholds);
    let battery_state = info.battery_state.as_deref();
    let battery = classify_battery(readings.battery_percent, battery_state, thresholds);

    DeviceSnapshot {
        device_id: device_id.to_string(),
        online: report.online,
        last_update_age_seconds: report.time_since_update,
        histories: histories(&report, capacity),
        readings,
        temperature,
        battery,
        info,
        latest: report.latest,
    }
}

/// trim every stream in the payload with one shared window so they stay aligned
fn histories(report: &DeviceReport, capacity: usize) -> BTreeMap<String, HistoryWindow> {
    let names: Vec<&String> = report.history.series.keys().collect();
    let series: Vec<&[Option<f64>]> = report.history.series.values().map(Vec::as_slice).collect();
    let trimmed = window::windowed_with_capacity(&report.history.timestamps, &series, capacity);

    names
        .into_iter()
        .zip(trimmed.series)
        .map(|(name, values)| {
            let window = HistoryWindow::from_aligned(&trimmed.labels, &values, capacity);
            (name.clone(), window)
        })
        .collect()
}

fn device_info(device_id: &str, report: &DeviceReport) -> DeviceInfo {
    let latest = &report.latest;
    let mem_usage = raw_text(latest, "mem_usage");
    let disk_root = raw_text(latest, "disk_root");
    let label = raw_text(latest, "device_label");

    DeviceInfo {
        label: label.unwrap_or_else(|| device_id.to_string()),
        hostname: raw_text(latest, "hostname"),
        os: raw_text(latest, "os"),
        uptime: raw_text(latest, "uptime"),
        last_update: report.last_update.clone(),
        wifi_ssid: raw_text(latest, "wifi_ssid"),
        ip_addrs: raw_text(latest, "ip_addrs"),
        battery_state: raw_text(latest, "battery_state"),
        cpu_freq_max_mhz: raw_number(latest, "cpu_freq_max"),
        memory_total_bytes: total_bytes(mem_usage.as_deref()),
        disk_total_bytes: total_bytes(disk_root.as_deref()),
        disk_detail: disk_root.as_deref().and_then(disk_detail),
    }
}

fn total_bytes(text: Option<&str>) -> Option<f64> {
    text.and_then(|t| metrics::parse_metric_text(t, "total"))
}

fn disk_detail(text: &str) -> Option<String> {
    let head = text.split("percent=").next().unwrap_or_default().trim();
    (!head.is_empty()).then(|| head.to_string())
}

pub fn classify_temperature(celsius: Option<f64>, thresholds: &Thresholds) -> TemperatureStatus {
    match celsius {
        None => TemperatureStatus::Unknown,
        Some(t) if t > thresholds.temperature_warning_c => TemperatureStatus::Warning,
        Some(_) => TemperatureStatus::Normal,
    }
}

/// charging overrides low
pub fn classify_battery(
    percent: Option<f64>,
    state: Option<&str>,
    thresholds: &Thresholds,
) -> BatteryStatus {
    match percent {
        None => BatteryStatus::Unknown,
        Some(_) if state == Some("charging") => BatteryStatus::Charging,
        Some(p) if p <= thresholds.battery_low_percent => BatteryStatus::Low,
        Some(_) => BatteryStatus::Normal,
    }
}
