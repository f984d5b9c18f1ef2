//! ==============================================================================
//! route.rs - route reconciliation for the mobile device
//! ==============================================================================
//!
//! purpose:
//!     the phone endpoint reports an optional explicit position, a raw gps
//!     route and a road-snapped route. `reconcile` picks one authoritative
//!     route and one current position:
//!
//! ```text
//!     route:    snapped (if any valid points) -> raw
//!     position: explicit lat/lng -> last point of the route -> unresolved
//! ```
//!
//! points without numeric lat and lng are dropped before either choice.
//! the function is pure, so equal inputs give equal output.
//!
//! ==============================================================================

use crate::domain::RoutePoint;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// both halves must be present and finite
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some(Self { lat, lng }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    Raw,
    Snapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionSample {
    pub lat: f64,
    pub lng: f64,
    pub source: RouteSource,
}

impl PositionSample {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    Explicit,
    Route,
}

/// `Unresolved` means "no coordinates", not an error
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CurrentPosition {
    Resolved {
        lat: f64,
        lng: f64,
        source: PositionSource,
    },
    #[default]
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GeoState {
    pub current: CurrentPosition,
    pub route: Vec<PositionSample>,
    /// `None` when both routes were empty after filtering
    pub route_source: Option<RouteSource>,
}

impl GeoState {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self.current {
            CurrentPosition::Resolved { lat, lng, .. } => Some(Coordinates { lat, lng }),
            CurrentPosition::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.current, CurrentPosition::Resolved { .. })
    }
}

pub fn reconcile(
    raw: &[RoutePoint],
    snapped: &[RoutePoint],
    explicit: Option<Coordinates>,
) -> GeoState {
    let snapped = valid_points(snapped, RouteSource::Snapped);
    let (route, route_source) = if !snapped.is_empty() {
        (snapped, Some(RouteSource::Snapped))
    } else {
        let raw = valid_points(raw, RouteSource::Raw);
        let source = (!raw.is_empty()).then_some(RouteSource::Raw);
        (raw, source)
    };

    let current = match (explicit, route.last()) {
        (Some(c), _) => CurrentPosition::Resolved {
            lat: c.lat,
            lng: c.lng,
            source: PositionSource::Explicit,
        },
        (None, Some(last)) => CurrentPosition::Resolved {
            lat: last.lat,
            lng: last.lng,
            source: PositionSource::Route,
        },
        (None, None) => CurrentPosition::Unresolved,
    };

    GeoState {
        current,
        route,
        route_source,
    }
}

fn valid_points(points: &[RoutePoint], source: RouteSource) -> Vec<PositionSample> {
    points
        .iter()
        .filter_map(|p| Coordinates::from_parts(p.lat, p.lng))
        .map(|c| PositionSample {
            lat: c.lat,
            lng: c.lng,
            source,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<RoutePoint> {
        coords
            .iter()
            .map(|&(lat, lng)| RoutePoint::new(lat, lng))
            .collect()
    }

    fn at(lat: f64, lng: f64) -> Option<Coordinates> {
        Some(Coordinates { lat, lng })
    }

    #[test]
    fn snapped_route_wins_and_gives_position() {
        let geo = reconcile(&[], &pts(&[(1.0, 2.0), (3.0, 4.0)]), None);
        assert_eq!(geo.coordinates(), at(3.0, 4.0));
        assert_eq!(geo.route_source, Some(RouteSource::Snapped));
        assert_eq!(geo.route.len(), 2);
        assert!(geo.route.iter().all(|p| p.source == RouteSource::Snapped));

        let expected = CurrentPosition::Resolved {
            lat: 3.0,
            lng: 4.0,
            source: PositionSource::Route,
        };
        assert_eq!(geo.current, expected);
    }

    #[test]
    fn explicit_position_beats_route() {
        let geo = reconcile(&pts(&[(5.0, 6.0)]), &[], at(9.0, 9.0));

        let expected = CurrentPosition::Resolved {
            lat: 9.0,
            lng: 9.0,
            source: PositionSource::Explicit,
        };
        assert_eq!(geo.current, expected);
        assert_eq!(geo.route_source, Some(RouteSource::Raw));
        assert_eq!(Some(geo.route[0].coordinates()), at(5.0, 6.0));
    }

    #[test]
    fn snapped_selection_is_all_or_nothing() {
        let raw = pts(&[(1.0, 1.0), (2.0, 2.0)]);
        let geo = reconcile(&raw, &pts(&[(7.0, 7.0)]), None);
        assert_eq!(geo.route.len(), 1);
        assert_eq!(geo.coordinates(), at(7.0, 7.0));
    }

    #[test]
    fn invalid_points_are_dropped() {
        let mut raw = pts(&[(1.0, 1.0)]);
        raw.push(RoutePoint {
            lat: Some(2.0),
            ..RoutePoint::default()
        });
        raw.push(RoutePoint::default());
        let snapped = vec![RoutePoint {
            lng: Some(3.0),
            ..RoutePoint::default()
        }];

        let geo = reconcile(&raw, &snapped, None);
        assert_eq!(geo.route_source, Some(RouteSource::Raw));
        assert_eq!(geo.route.len(), 1);
        assert_eq!(geo.coordinates(), at(1.0, 1.0));
    }

    #[test]
    fn nothing_usable_is_unresolved() {
        let geo = reconcile(&[RoutePoint::default()], &[], None);
        assert!(!geo.is_resolved());
        assert_eq!(geo.current, CurrentPosition::Unresolved);
        assert!(geo.route.is_empty());
        assert_eq!(geo.route_source, None);
        assert_eq!(geo, GeoState::default());
    }

    #[test]
    fn explicit_needs_both_halves() {
        assert_eq!(Coordinates::from_parts(Some(1.0), None), None);
        assert_eq!(Coordinates::from_parts(Some(f64::NAN), Some(1.0)), None);

        let explicit = Coordinates::from_parts(Some(-6.3), Some(107.1));
        let geo = reconcile(&[], &[], explicit);
        assert_eq!(geo.coordinates(), at(-6.3, 107.1));
        assert!(geo.route.is_empty());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let raw = pts(&[(1.0, 2.0), (1.5, 2.5)]);
        let snapped = pts(&[(1.1, 2.1), (1.6, 2.6)]);
        let explicit = at(1.7, 2.7);

        let first = reconcile(&raw, &snapped, explicit);
        assert_eq!(first, reconcile(&raw, &snapped, explicit));
        assert_eq!(reconcile(&raw, &[], None), reconcile(&raw, &[], None));
    }
}
