//! ==============================================================================
//! window.rs - fixed-capacity history windows
//! ==============================================================================
//!
//! purpose:
//!     every poll delivers the complete history arrays for a device. the
//!     window is a bounded *view* over that payload: the last `capacity`
//!     samples, index-aligned across the label array and every series.
//!
//! capacity counts samples, not time. with the agent's 3s cadence the
//! default of 100 covers roughly five minutes.
//!
//! ==============================================================================

use serde::Serialize;
use std::collections::VecDeque;

/// maximum samples kept per metric stream
pub const HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub timestamp: String,
    /// `None` only when no source yielded a parseable number
    pub value: Option<f64>,
}

/// labels plus series trimmed to the same window
#[derive(Debug, Clone, PartialEq)]
pub struct Windowed<L> {
    pub labels: Vec<L>,
    pub series: Vec<Vec<Option<f64>>>,
}

/// keep the last `HISTORY_CAPACITY` entries of parallel arrays
pub fn windowed<L: Clone>(labels: &[L], series: &[&[Option<f64>]]) -> Windowed<L> {
    windowed_with_capacity(labels, series, HISTORY_CAPACITY)
}

/// keep the last `capacity` entries of parallel arrays.
///
/// every output series has exactly as many entries as the output labels:
/// a series shorter than the labels is padded with `None`, a longer one is
/// cut at the label length. for well-formed input (equal lengths, at most
/// `capacity` long) this is the identity.
pub fn windowed_with_capacity<L: Clone>(
    labels: &[L],
    series: &[&[Option<f64>]],
    capacity: usize,
) -> Windowed<L> {
    let end = labels.len();
    let start = end.saturating_sub(capacity);

    Windowed {
        labels: labels[start..].to_vec(),
        series: series.iter().map(|v| aligned(v, start, end)).collect(),
    }
}

fn aligned(values: &[Option<f64>], start: usize, end: usize) -> Vec<Option<f64>> {
    (start..end)
        .map(|i| values.get(i).copied().flatten())
        .collect()
}

/// ring buffer of timestamped samples for one (device, metric) stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryWindow {
    samples: VecDeque<MetricSample>,
    #[serde(skip)]
    capacity: usize,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// build a window from already-aligned labels and values
    pub fn from_aligned(labels: &[String], values: &[Option<f64>], capacity: usize) -> Self {
        let mut window = Self::new(capacity);
        for (timestamp, value) in labels.iter().zip(values) {
            window.push(MetricSample {
                timestamp: timestamp.clone(),
                value: *value,
            });
        }
        window
    }

    /// append in arrival order, evicting the oldest sample when full
    pub fn push(&mut self, sample: MetricSample) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// oldest -> newest
    pub fn iter(&self) -> impl Iterator<Item = &MetricSample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.timestamp.as_str()).collect()
    }
}
