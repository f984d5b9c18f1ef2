//! ==============================================================================
//! state.rs - shared state between pollers and the api
//! ==============================================================================
//!
//! the pollers are the only writers; the web server only reads.
//! every write replaces a whole part (snapshot map, geo state, phone view),
//! so readers never observe a half-updated device.
//!
//! arc<rwlock<>> as in the rest of the host:
//! - arc: reference-counted pointer for sharing across tasks
//! - rwlock: multiple readers OR one writer
//!
//! ==============================================================================

use crate::phone::PhoneView;
use crate::route::GeoState;
use crate::store::SnapshotMap;

use serde::{Serialize, Serializer};
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedState = Arc<RwLock<AppState>>;

/// health of one polling stream
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedStatus {
    /// no cycle has settled yet
    #[default]
    Pending,
    /// last cycle succeeded; the published data is current
    Live { cycles: u64 },
    /// last cycle failed; the published data is from the last success
    TransportError {
        message: String,
        consecutive_failures: u32,
    },
}

impl FeedStatus {
    pub fn succeeded(&self) -> Self {
        let cycles = match self {
            FeedStatus::Live { cycles } => cycles + 1,
            _ => 1,
        };
        FeedStatus::Live { cycles }
    }

    pub fn failed(&self, message: String) -> Self {
        let consecutive_failures = match self {
            FeedStatus::TransportError {
                consecutive_failures,
                ..
            } => consecutive_failures + 1,
            _ => 1,
        };
        FeedStatus::TransportError {
            message,
            consecutive_failures,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FeedStatus::TransportError { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppState {
    /// current device snapshots, replaced each device cycle
    #[serde(serialize_with = "serialize_shared")]
    pub devices: Arc<SnapshotMap>,
    pub device_feed: FeedStatus,
    /// current route + position, replaced each phone cycle
    pub geo: GeoState,
    /// `None` until the first phone cycle succeeds
    pub phone: Option<PhoneView>,
    pub phone_feed: FeedStatus,
}

pub fn new_shared() -> SharedState {
    Arc::new(RwLock::new(AppState::default()))
}

pub fn serialize_shared<T: Serialize, S: Serializer>(
    value: &Arc<T>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    value.as_ref().serialize(serializer)
}
