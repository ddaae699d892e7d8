//! Geofence containment checks.

use crate::RollcallError;
use serde::{Deserialize, Serialize};

/// Equatorial earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, -90..=90.
    pub lat: f64,
    /// Longitude in degrees, -180..=180.
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point without validating it.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Reject NaN, infinite, or out-of-range coordinates.
    pub fn validate(&self) -> Result<(), RollcallError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(RollcallError::InvalidRequest(format!(
                "latitude out of range: {}",
                self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(RollcallError::InvalidRequest(format!(
                "longitude out of range: {}",
                self.lon
            )));
        }
        Ok(())
    }
}

/// Great-circle (haversine) distance between two points in meters.
pub fn distance_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Check that `point` lies within `radius_m` of `center`.
///
/// Returns the measured distance on success.
///
/// # Errors
/// * `InvalidRequest` - Either coordinate is malformed
/// * `OutOfRange` - Distance exceeds the radius
pub fn check_geofence(center: &GeoPoint, point: &GeoPoint, radius_m: f64) -> Result<f64, RollcallError> {
    center.validate()?;
    point.validate()?;

    let distance = distance_m(center, point);
    if distance > radius_m {
        return Err(RollcallError::OutOfRange {
            distance_m: distance,
            radius_m,
        });
    }
    Ok(distance)
}
