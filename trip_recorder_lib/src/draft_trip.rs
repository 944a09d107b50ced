use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geo_point::GeoPoint;

/// Snapshot of an in-progress recording session, persisted periodically so a
/// killed process can offer to resume. Superseded on every snapshot write and
/// deleted when the session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftTrip {
    pub started_at: DateTime<Utc>,
    pub start_time_label: String,
    pub is_private: bool,
    pub elapsed_sec: u64,
    pub distance_meters: f64,
    pub points: Vec<GeoPoint>,
}
