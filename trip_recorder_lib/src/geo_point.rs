use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean Earth radius for the spherical approximation, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A single recorded GPS fix. Immutable once recorded.
///
/// `accuracy` is the reported horizontal accuracy in meters. `None` means the
/// source did not report one, which is treated as acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64, timestamp: DateTime<Utc>, accuracy: Option<f64>) -> Self {
        Self {
            lat,
            lng,
            timestamp,
            accuracy,
        }
    }

    /// Great-circle distance to `other` in meters, via the haversine formula.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_METERS * c
    }
}
