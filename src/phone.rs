//! ==============================================================================
//! phone.rs - mobile device view
//! ==============================================================================
//!
//! purpose:
//!     normalizes `/api/hp-latest` into a `PhoneView` for renderers.
//!     top-level fields win; each one falls back to the camelCase field in
//!     `raw` (the untouched upstream record).
//!
//! `ok: false` with no usable route is a "no data" state. it is not a
//! transport error: the request itself succeeded.
//!
//! relationships:
//!     - uses: domain.rs (PhoneReport), route.rs (GeoState)
//!     - used by: poller.rs
//!
//! ==============================================================================

use crate::domain::{raw_number, raw_text, PhoneReport};
use crate::route::GeoState;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhoneView {
    NoData { reason: String },
    Available(Box<PhoneDetails>),
}

impl PhoneView {
    pub fn no_data(reason: &str) -> Self {
        PhoneView::NoData {
            reason: reason.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, PhoneView::Available(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargingState {
    Unknown,
    Charging,
    Discharging,
}

/// used/total in GB; `used_gb` is `None` when availability is unknown
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Usage {
    pub used_gb: Option<f64>,
    pub total_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneDetails {
    pub time_human: Option<String>,
    pub timestamp: Option<String>,
    pub battery_percent: Option<f64>,
    pub charging: ChargingState,
    pub wifi_ssid: Option<String>,
    pub network_type: Option<String>,
    pub accuracy_m: Option<f64>,
    pub device_temp_c: Option<f64>,
    pub wifi_link_speed: Option<String>,
    pub ip_address: Option<String>,
    pub android_version: Option<String>,
    pub sdk_level: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub chipset: Option<String>,
    pub memory: Option<Usage>,
    pub storage: Option<Usage>,
    /// "lat, lng" when resolved, otherwise a description of what is missing
    pub location_text: String,
}

const NO_DATA: &str = "no data";
const NO_COORDINATES: &str = "no coordinates reported";

pub fn build(report: &PhoneReport, geo: &GeoState) -> PhoneView {
    if !report.ok && geo.route.is_empty() {
        return PhoneView::no_data(report.error.as_deref().unwrap_or(NO_DATA));
    }

    let raw = &report.raw;
    let text = |top: &Option<String>, key: &str| top.clone().or_else(|| raw_text(raw, key));
    let number = |top: Option<f64>, key: &str| top.or_else(|| raw_number(raw, key));

    let timestamp = report
        .timestamp
        .clone()
        .or_else(|| raw_text(raw, "updated_at"))
        .or_else(|| raw_text(raw, "timestamp"));

    let reported_location = text(&report.location_text, "location_text");
    let location_text = match (geo.coordinates(), reported_location) {
        (Some(c), _) => format!("{:.5}, {:.5}", c.lat, c.lng),
        (None, Some(reported)) => reported,
        (None, None) => NO_COORDINATES.to_string(),
    };

    PhoneView::Available(Box::new(PhoneDetails {
        time_human: report.time_human.clone(),
        timestamp,
        battery_percent: report.battery_percent,
        charging: charging_state(report.battery_percent, report.is_charging),
        wifi_ssid: text(&report.wifi_ssid, "wifiSSID"),
        network_type: text(&report.network_type, "mobileNetworkType"),
        accuracy_m: report.accuracy,
        device_temp_c: number(report.device_temp_c, "deviceTemperatureC"),
        wifi_link_speed: text(&report.wifi_link_speed, "wifiLinkSpeed"),
        ip_address: text(&report.ip_address, "ipAddress"),
        android_version: text(&report.android_version, "androidVersion"),
        sdk_level: text(&report.sdk_level, "sdkLevel"),
        brand: text(&report.brand, "brand"),
        model: text(&report.model, "model"),
        chipset: text(&report.chipset, "chipset"),
        memory: usage(
            number(report.total_ram_mb, "totalRamMb"),
            number(report.available_ram_mb, "availableRamMb"),
        ),
        storage: usage(
            number(report.total_internal_storage_mb, "totalInternalStorageMb"),
            number(report.avail_internal_storage_mb, "availableInternalStorageMb"),
        ),
        location_text,
    }))
}

pub fn charging_state(battery_percent: Option<f64>, is_charging: Option<bool>) -> ChargingState {
    match (battery_percent, is_charging) {
        (None, _) => ChargingState::Unknown,
        (Some(_), Some(true)) => ChargingState::Charging,
        (Some(_), _) => ChargingState::Discharging,
    }
}

/// MB figures -> GB usage; a zero or missing total means nothing to show
pub fn usage(total_mb: Option<f64>, available_mb: Option<f64>) -> Option<Usage> {
    let total_mb = total_mb.filter(|t| *t > 0.0)?;
    Some(Usage {
        used_gb: available_mb.map(|avail| (total_mb - avail) / 1024.0),
        total_gb: total_mb / 1024.0,
    })
}
