use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::geo_point::GeoPoint;

/// Rendered poster bytes. Stored inside the archive JSON as base64.
#[derive(Debug, Clone, PartialEq)]
pub struct PosterImage(pub Vec<u8>);

impl Serialize for PosterImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for PosterImage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(PosterImage)
            .map_err(serde::de::Error::custom)
    }
}

/// A finalized, committed recording.
///
/// Immutable after creation except for `poster_image`, which may be
/// regenerated later from the stored fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub start_time_label: String,
    pub end_time_label: String,
    pub is_private: bool,
    pub distance_meters: f64,
    pub duration_sec: u64,
    pub points: Vec<GeoPoint>,
    pub poster_image: PosterImage,
    pub insight_text: Option<String>,
    pub start_label: String,
    pub end_label: String,
}
