//! ==============================================================================
//! metrics.rs - metric value resolution
//! ==============================================================================
//!
//! purpose:
//!     agents report some metrics as plain numbers (`cpu_percent: 12.5`) and
//!     others as encoded text (`mem_usage: "total=16 used=8 percent=50.0%"`).
//!     `resolve` turns history + raw report into one number (or `None`).
//!
//! precedence (first match wins):
//!
//! ```text
//!     1. last history element, if it is not null
//!     2. raw value, if it is a number
//!     3. raw value, if it is text containing `<field_key>=<number>[%]`
//!     4. None -> rendered as "N/A"
//! ```
//!
//! a null last history element falls through to the raw value, never
//! to an earlier history element.
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// the metrics shown for every monitored machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CpuPercent,
    MemoryPercent,
    DiskPercent,
    CpuTemp,
    BatteryPercent,
    CpuFrequency,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::CpuPercent,
        Metric::MemoryPercent,
        Metric::DiskPercent,
        Metric::CpuTemp,
        Metric::BatteryPercent,
        Metric::CpuFrequency,
    ];

    /// name of the stream in `history`, if the metric has one
    pub fn history_key(self) -> Option<&'static str> {
        match self {
            Metric::CpuPercent => Some("cpu_percent"),
            Metric::MemoryPercent => Some("memory_percent"),
            Metric::DiskPercent => Some("disk_percent"),
            Metric::CpuTemp => Some("cpu_temp"),
            Metric::BatteryPercent => Some("battery_percent"),
            Metric::CpuFrequency => None,
        }
    }

    /// name of the field in the raw `latest` payload
    pub fn latest_key(self) -> &'static str {
        match self {
            Metric::CpuPercent => "cpu_percent",
            Metric::MemoryPercent => "mem_usage",
            Metric::DiskPercent => "disk_root",
            Metric::CpuTemp => "cpu_temp_c",
            Metric::BatteryPercent => "battery_percent",
            Metric::CpuFrequency => "cpu_freq_current",
        }
    }

    /// token to look for when the raw field is encoded text
    pub fn text_key(self) -> Option<&'static str> {
        match self {
            Metric::MemoryPercent | Metric::DiskPercent => Some("percent"),
            _ => None,
        }
    }
}

/// a raw report value that may carry a number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl<'a> RawValue<'a> {
    /// numbers and strings only; null, bools and containers carry nothing
    pub fn from_json(value: &'a Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(RawValue::Number),
            Value::String(s) => Some(RawValue::Text(s)),
            _ => None,
        }
    }
}

/// resolve the current value of a metric. pure and total.
pub fn resolve(
    history: Option<&[Option<f64>]>,
    latest_raw: Option<RawValue<'_>>,
    field_key: Option<&str>,
) -> Option<f64> {
    if let Some(Some(last)) = history.and_then(|h| h.last()) {
        if last.is_finite() {
            return Some(*last);
        }
    }

    match latest_raw? {
        RawValue::Number(n) => Some(n).filter(|n| n.is_finite()),
        RawValue::Text(text) => parse_metric_text(text, field_key?),
    }
}

/// find `key=value` in whitespace separated text and parse the value,
/// ignoring a trailing `%`. tokens that do not parse are skipped.
pub fn parse_metric_text(text: &str, key: &str) -> Option<f64> {
    text.split_whitespace()
        .filter_map(|token| token.split_once('='))
        .filter(|(name, _)| *name == key)
        .find_map(|(_, value)| {
            let value = value.strip_suffix('%').unwrap_or(value);
            value.parse::<f64>().ok().filter(|v| v.is_finite())
        })
}

// ==============================================================================
// display helpers
// ==============================================================================

pub const NOT_AVAILABLE: &str = "N/A";

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_celsius(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}°C", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// MHz -> "2.40 GHz"
pub fn format_ghz(mhz: Option<f64>) -> String {
    match mhz {
        Some(v) => format!("{:.2} GHz", v / 1000.0),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// binary units, two decimals. zero and missing are both "N/A".
pub fn format_bytes(bytes: Option<f64>) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    let bytes = match bytes {
        Some(b) if b.is_finite() && b > 0.0 => b,
        _ => return NOT_AVAILABLE.to_string(),
    };
    let max_exp = (UNITS.len() - 1) as f64;
    let exp = (bytes.ln() / 1024f64.ln()).floor().clamp(0.0, max_exp);
    let value = bytes / 1024f64.powf(exp);
    format!("{:.2} {}", value, UNITS[exp as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_percent_token_from_text() {
        let raw = RawValue::Text("percent=45.5% total=1000");
        let empty: &[Option<f64>] = &[];
        let key = Some("percent");
        assert_eq!(resolve(Some(empty), Some(raw), key), Some(45.5));
        assert_eq!(resolve(None, Some(raw), Some("total")), Some(1000.0));
    }

    #[test]
    fn last_history_value_wins() {
        let history = [Some(10.0), Some(20.0)];
        let raw = Some(RawValue::Number(99.0));
        assert_eq!(resolve(Some(&history[..]), raw, None), Some(20.0));
    }

    #[test]
    fn null_tail_falls_through_to_raw_not_earlier_history() {
        let history: Option<&[Option<f64>]> = Some(&[Some(10.0), Some(20.0), None]);
        let number = Some(RawValue::Number(7.0));
        let text = Some(RawValue::Text("percent=3%"));

        assert_eq!(resolve(history, number, None), Some(7.0));
        assert_eq!(resolve(history, None, None), None);
        assert_eq!(resolve(history, text, Some("percent")), Some(3.0));
    }

    #[test]
    fn text_without_field_key_is_unresolved() {
        assert_eq!(resolve(None, Some(RawValue::Text("percent=3%")), None), None);
    }

    #[test]
    fn malformed_tokens_are_skipped() {
        let text = "garbage percent percent=abc percent=12%";
        assert_eq!(parse_metric_text(text, "percent"), Some(12.0));
        assert_eq!(parse_metric_text("percent=NaN", "percent"), None);
        let lookalikes = "percentage=5 xpercent=6";
        assert_eq!(parse_metric_text(lookalikes, "percent"), None);
        assert_eq!(parse_metric_text("", "percent"), None);
    }

    #[test]
    fn raw_value_from_json() {
        let number = json!(4.5);
        let text = json!("percent=1%");
        assert_eq!(RawValue::from_json(&number), Some(RawValue::Number(4.5)));
        let expected = RawValue::Text("percent=1%");
        assert_eq!(RawValue::from_json(&text), Some(expected));
        assert_eq!(RawValue::from_json(&json!(null)), None);
        assert_eq!(RawValue::from_json(&json!(true)), None);
    }

    #[test]
    fn metric_keys() {
        assert_eq!(Metric::MemoryPercent.latest_key(), "mem_usage");
        assert_eq!(Metric::MemoryPercent.history_key(), Some("memory_percent"));
        assert_eq!(Metric::CpuTemp.latest_key(), "cpu_temp_c");
        assert_eq!(Metric::CpuFrequency.history_key(), None);
        assert_eq!(Metric::DiskPercent.text_key(), Some("percent"));
        assert_eq!(Metric::CpuPercent.text_key(), None);
    }

    #[test]
    fn display_helpers() {
        assert_eq!(format_percent(Some(12.34)), "12.3%");
        assert_eq!(format_percent(None), "N/A");
        assert_eq!(format_celsius(Some(81.0)), "81.0°C");
        assert_eq!(format_ghz(Some(2400.0)), "2.40 GHz");
        assert_eq!(format_ghz(None), "N/A");
        assert_eq!(format_bytes(Some(0.0)), "N/A");
        assert_eq!(format_bytes(None), "N/A");
        assert_eq!(format_bytes(Some(512.0)), "512.00 Bytes");
        assert_eq!(format_bytes(Some(1536.0)), "1.50 KB");
        let sixteen_gib = 16.0 * 1024.0 * 1024.0 * 1024.0;
        assert_eq!(format_bytes(Some(sixteen_gib)), "16.00 GB");
    }
}
