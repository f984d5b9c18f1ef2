//! ==============================================================================
//! monitor-host - telemetry aggregation and windowing engine
//! ==============================================================================
//!
//! pulls device telemetry and phone location from the monitoring server,
//! normalizes it into bounded per-device snapshots and a reconciled route,
//! and publishes both for renderers.
//!
//! ```text
//!     metrics.rs  - value resolution (history -> raw number -> "key=value" text)
//!     window.rs   - fixed-capacity history windows
//!     store.rs    - per-device snapshots, replaced every cycle
//!     route.rs    - raw vs snapped route, current position
//!     phone.rs    - mobile device view
//!     poller.rs   - the two polling loops
//!     server.rs   - read-only json api
//! ```
//!
//! ==============================================================================

pub mod config;
pub mod domain;
pub mod metrics;
pub mod phone;
pub mod poller;
pub mod route;
pub mod server;
pub mod state;
pub mod store;
pub mod window;
