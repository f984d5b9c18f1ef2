//! ==============================================================================
//! server.rs - read-only json api for renderers
//! ==============================================================================
//!
//! routes:
//!     GET /health        -> liveness
//!     GET /api/state     -> everything (devices, geo, phone, feed status)
//!     GET /api/devices   -> device snapshot map + device feed status
//!     GET /api/geo       -> route + current position
//!     GET /api/phone     -> phone view + phone feed status
//!
//! every response is a complete copy of the current state; renderers
//! replace what they show, they never patch it.
//!
//! ==============================================================================

use crate::phone::PhoneView;
use crate::route::GeoState;
use crate::state::{serialize_shared, AppState, FeedStatus, SharedState};
use crate::store::SnapshotMap;

use anyhow::{Context, Result};
use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/state", get(state_handler))
        .route("/api/devices", get(devices_handler))
        .route("/api/geo", get(geo_handler))
        .route("/api/phone", get(phone_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(state: SharedState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[derive(Serialize)]
struct DevicesResponse {
    feed: FeedStatus,
    #[serde(serialize_with = "serialize_shared")]
    devices: Arc<SnapshotMap>,
}

#[derive(Serialize)]
struct PhoneResponse {
    feed: FeedStatus,
    phone: Option<PhoneView>,
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn state_handler(State(state): State<SharedState>) -> Json<AppState> {
    let state = state.read().await;
    Json(state.clone())
}

async fn devices_handler(State(state): State<SharedState>) -> Json<DevicesResponse> {
    let state = state.read().await;
    Json(DevicesResponse {
        feed: state.device_feed.clone(),
        devices: Arc::clone(&state.devices),
    })
}

async fn geo_handler(State(state): State<SharedState>) -> Json<GeoState> {
    let state = state.read().await;
    Json(state.geo.clone())
}

async fn phone_handler(State(state): State<SharedState>) -> Json<PhoneResponse> {
    let state = state.read().await;
    Json(PhoneResponse {
        feed: state.phone_feed.clone(),
        phone: state.phone.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeviceBatch, DeviceReport};
    use crate::route::{reconcile, Coordinates};
    use crate::state;
    use crate::store::DeviceStateStore;
    use axum::body::{self, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt; // for `oneshot`

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn devices_handler_returns_current_map() {
        let shared = state::new_shared();
        {
            let mut store = DeviceStateStore::default();
            let report = DeviceReport::from_value(json!({
                "online": true,
                "latest": { "cpu_temp_c": 90 }
            }));
            let mut guard = shared.write().await;
            guard.devices = store.ingest(DeviceBatch::from([("pc".to_string(), report)]));
            guard.device_feed = guard.device_feed.succeeded();
        }

        let Json(body) = devices_handler(State(shared)).await;
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["feed"]["state"], "live");
        assert_eq!(value["devices"]["pc"]["temperature"], "warning");
        assert_eq!(value["devices"]["pc"]["readings"]["temperature_c"], 90.0);
    }

    #[tokio::test]
    async fn geo_handler_reports_unresolved_position() {
        let shared = state::new_shared();
        let Json(geo) = geo_handler(State(shared.clone())).await;
        let current = serde_json::to_value(&geo).unwrap()["current"].clone();
        assert_eq!(current, json!({ "state": "unresolved" }));

        let explicit = Coordinates::from_parts(Some(1.0), Some(2.0));
        shared.write().await.geo = reconcile(&[], &[], explicit);
        let Json(geo) = geo_handler(State(shared)).await;
        let current = serde_json::to_value(&geo).unwrap()["current"].clone();
        let expected = json!({
            "state": "resolved",
            "lat": 1.0,
            "lng": 2.0,
            "source": "explicit"
        });
        assert_eq!(current, expected);
    }

    #[tokio::test]
    async fn phone_handler_before_first_cycle() {
        let Json(body) = phone_handler(State(state::new_shared())).await;
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["feed"]["state"], "pending");
        assert!(value["phone"].is_null());
    }

    #[tokio::test]
    async fn router_serves_every_route() {
        let app = router(state::new_shared());

        let (status, body) = get_json(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));

        let (status, body) = get_json(app.clone(), "/api/devices").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["feed"]["state"], "pending");
        assert_eq!(body["devices"], json!({}));

        let (status, body) = get_json(app.clone(), "/api/state").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["geo"]["current"]["state"], "unresolved");

        let (status, body) = get_json(app, "/api/phone").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["phone"].is_null());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let request = Request::builder()
            .uri("/api/nope")
            .body(Body::empty())
            .unwrap();
        let resp = router(state::new_shared()).oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
