//! Contracts for the external collaborators the engine drives. The engine
//! never looks behind these: rendering, geocoding and insight generation are
//! swappable implementations.

use std::future::Future;

use tokio::sync::mpsc;
use trip_recorder_lib::{
    geo_point::GeoPoint,
    trip::{PosterImage, Trip},
};

use crate::EngineError;

/// One delivery from the platform location stream.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Sample(GeoPoint),
    /// Fatal for the stream: no further samples will arrive this session.
    PermissionDenied,
    /// Transient fix error (timeout, no satellites). Status only.
    Unavailable,
}

pub trait LocationSource: Send + Sync + 'static {
    /// Begin continuous sampling. The watch stops when the engine drops the
    /// receiver, so implementations must tolerate a closed channel.
    fn start_watching(&self) -> mpsc::Receiver<LocationEvent>;
}

pub trait Geocoder: Send + Sync + 'static {
    /// Reverse-geocode a coordinate to a place label. Returns an empty string
    /// for unknown places; must not fail, the session flow proceeds either way.
    fn resolve(&self, lat: f64, lng: f64) -> impl Future<Output = String> + Send;
}

pub trait InsightGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        distance_meters: f64,
        duration_sec: u64,
        title: &str,
    ) -> impl Future<Output = Result<String, EngineError>> + Send;
}

/// Everything the poster collaborator needs to compose the artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct PosterRequest {
    pub title: String,
    pub date_label: String,
    pub time_range: String,
    pub distance_meters: f64,
    pub duration_sec: u64,
    pub points: Vec<GeoPoint>,
    pub start_label: String,
    pub end_label: String,
}

impl From<&Trip> for PosterRequest {
    fn from(trip: &Trip) -> Self {
        Self {
            title: trip.name.clone(),
            date_label: trip.date.format("%Y-%m-%d").to_string(),
            time_range: format!("{} - {}", trip.start_time_label, trip.end_time_label),
            distance_meters: trip.distance_meters,
            duration_sec: trip.duration_sec,
            points: trip.points.clone(),
            start_label: trip.start_label.clone(),
            end_label: trip.end_label.clone(),
        }
    }
}

pub trait PosterRenderer: Send + Sync + 'static {
    fn render(
        &self,
        request: PosterRequest,
    ) -> impl Future<Output = Result<PosterImage, EngineError>> + Send;
}

/// Persistence port backing the draft store and the trip archive. Values are
/// JSON strings; the stores own serialization and corruption handling.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, EngineError>> + Send;
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), EngineError>> + Send;
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), EngineError>> + Send;
}
