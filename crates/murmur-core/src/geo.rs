//! Geofence matching.
//!
//! Pure functions of their inputs -- no clock, no storage, no side effects.
//! Distance is great-circle via the Haversine formula with an Earth radius
//! of 6 371 000 m.
//!
//! The condition's own radius is the sole match threshold. Fix accuracy is
//! recorded but not inflated into the comparison, and there is no secondary
//! fixed "nearby" radius OR'd in. A fix exactly on the boundary counts as
//! inside.

use serde::{Deserialize, Serialize};

use crate::events::PositionFix;
use crate::note::ConditionId;

/// Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A location condition prepared for matching: coordinates plus the
/// effective (defaulted and clamped) radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceTarget {
    pub condition_id: ConditionId,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

/// Great-circle distance in meters between two coordinate pairs.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance from a fix to a target's center.
pub fn distance_to_target_m(fix: &PositionFix, target: &GeofenceTarget) -> f64 {
    haversine_distance_m(
        fix.latitude,
        fix.longitude,
        target.latitude,
        target.longitude,
    )
}

/// Return the ids of all targets whose geofence contains the fix.
///
/// Boundary-inclusive: `distance == radius` matches.
pub fn match_fix(fix: &PositionFix, targets: &[GeofenceTarget]) -> Vec<ConditionId> {
    targets
        .iter()
        .filter(|t| distance_to_target_m(fix, t) <= t.radius_m)
        .map(|t| t.condition_id.clone())
        .collect()
}

/// Human-readable distance ("87m", "1.2km").
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round() as i64)
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}
