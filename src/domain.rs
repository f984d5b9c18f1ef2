//! ==============================================================================
//! domain.rs - upstream data contracts
//! ==============================================================================
//!
//! purpose:
//!     typed views over the two json payloads we poll:
//!     - `GET /api/data`      -> DeviceBatch (device id -> DeviceReport)
//!     - `GET /api/hp-latest` -> PhoneReport (mobile device + route)
//!
//! every field is optional and deserialized leniently: a field with the
//! wrong json type becomes `None` instead of failing the whole payload.
//! this keeps data-shape failures at per-field granularity.
//!
//! relationships:
//!     - used by: poller.rs (decodes transport bodies)
//!     - used by: store.rs (DeviceReport), route.rs + phone.rs (PhoneReport)
//!
//! ==============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// one poll of `/api/data`: the complete set of devices for this cycle
pub type DeviceBatch = BTreeMap<String, DeviceReport>;

/// a single device entry from `/api/data`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceReport {
    #[serde(deserialize_with = "lenient::flag")]
    pub online: bool,
    /// seconds since the agent last reported, as computed upstream
    #[serde(deserialize_with = "lenient::number")]
    pub time_since_update: Option<f64>,
    #[serde(deserialize_with = "lenient::text")]
    pub last_update: Option<String>,
    /// raw agent payload (cpu_percent, mem_usage, disk_root, ...)
    #[serde(deserialize_with = "lenient::object")]
    pub latest: Map<String, Value>,
    #[serde(deserialize_with = "lenient::history")]
    pub history: HistoryPayload,
}

impl DeviceReport {
    /// decode one device entry; anything that is not an object degrades
    /// to an all-empty report rather than poisoning the batch
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// parallel history arrays: `timestamps` plus one array per metric stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPayload {
    pub timestamps: Vec<String>,
    /// stream name (cpu_percent, memory_percent, ...) -> values
    pub series: BTreeMap<String, Vec<Option<f64>>>,
}

impl HistoryPayload {
    pub fn stream(&self, name: &str) -> Option<&[Option<f64>]> {
        self.series.get(name).map(Vec::as_slice)
    }
}

/// one point of `route` / `snapped_route`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutePoint {
    #[serde(deserialize_with = "lenient::number")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub lng: Option<f64>,
    #[serde(deserialize_with = "lenient::text")]
    pub time_human: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub battery_level: Option<f64>,
}

impl RoutePoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            ..Self::default()
        }
    }
}

/// payload of `/api/hp-latest`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhoneReport {
    #[serde(deserialize_with = "lenient::flag")]
    pub ok: bool,
    #[serde(deserialize_with = "lenient::text")]
    pub error: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub time_human: Option<String>,
    #[serde(deserialize_with = "lenient::scalar")]
    pub timestamp: Option<String>,

    #[serde(deserialize_with = "lenient::number")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub lng: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub accuracy: Option<f64>,

    #[serde(deserialize_with = "lenient::number")]
    pub battery_percent: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_flag")]
    pub is_charging: Option<bool>,
    #[serde(deserialize_with = "lenient::number")]
    pub device_temp_c: Option<f64>,

    #[serde(deserialize_with = "lenient::text")]
    pub wifi_ssid: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub network_type: Option<String>,
    #[serde(deserialize_with = "lenient::scalar")]
    pub wifi_link_speed: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub ip_address: Option<String>,

    #[serde(deserialize_with = "lenient::scalar")]
    pub android_version: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub brand: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub model: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub chipset: Option<String>,
    #[serde(deserialize_with = "lenient::scalar")]
    pub sdk_level: Option<String>,

    #[serde(deserialize_with = "lenient::number")]
    pub available_ram_mb: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub total_ram_mb: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub avail_internal_storage_mb: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub total_internal_storage_mb: Option<f64>,

    #[serde(deserialize_with = "lenient::text")]
    pub location_text: Option<String>,

    #[serde(deserialize_with = "lenient::points")]
    pub route: Vec<RoutePoint>,
    #[serde(deserialize_with = "lenient::points")]
    pub snapped_route: Vec<RoutePoint>,

    /// untouched upstream record, camelCase keys (wifiSSID, batteryLevel, ...)
    #[serde(deserialize_with = "lenient::object")]
    pub raw: Map<String, Value>,
}

// ==============================================================================
// raw value accessors
// ==============================================================================

/// numeric field of a raw json object, `None` unless it is a finite number
pub fn raw_number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(lenient::as_number)
}

/// text field of a raw json object; numbers are rendered, empty strings dropped
pub fn raw_text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(lenient::as_scalar)
}

// ==============================================================================
// lenient deserializers
// ==============================================================================

pub(crate) mod lenient {
    use super::{HistoryPayload, RoutePoint};
    use serde::{Deserialize, Deserializer};
    use serde_json::{Map, Value};

    pub fn as_number(value: &Value) -> Option<f64> {
        value.as_f64().filter(|v| v.is_finite())
    }

    pub fn as_scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn as_label(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(as_number(&Value::deserialize(d)?))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        })
    }

    pub fn scalar<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(as_scalar(&Value::deserialize(d)?))
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(Value::deserialize(d)?.as_bool().unwrap_or(false))
    }

    pub fn optional_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(Value::deserialize(d)?.as_bool())
    }

    pub fn object<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Object(map) => map,
            _ => Map::new(),
        })
    }

    pub fn points<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<RoutePoint>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        })
    }

    /// `timestamps` becomes the label array, every other array a metric stream
    pub fn history<'de, D: Deserializer<'de>>(d: D) -> Result<HistoryPayload, D::Error> {
        let map = match Value::deserialize(d)? {
            Value::Object(map) => map,
            _ => return Ok(HistoryPayload::default()),
        };

        let mut payload = HistoryPayload::default();
        for (key, value) in map {
            let items = match value {
                Value::Array(items) => items,
                _ => continue,
            };
            if key == "timestamps" {
                payload.timestamps = items.iter().map(as_label).collect();
            } else {
                payload.series.insert(key, items.iter().map(as_number).collect());
            }
        }
        Ok(payload)
    }
}
