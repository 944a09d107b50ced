pub mod archive;
pub mod draft_store;
pub mod finalize;
pub mod geocode;
pub mod ports;
pub mod sample_filter;
pub mod store;
mod session;

pub use session::*;

/// Key-value slot holding the single in-progress session snapshot.
pub const DRAFT_KEY: &str = "draft_trip";
/// Key-value slot holding the committed trip list, newest first.
pub const ARCHIVE_KEY: &str = "trip_archive";

/// Trips kept in the archive before the oldest is silently dropped.
pub const ARCHIVE_CAP: usize = 50;

/// Samples with a reported horizontal accuracy above this never touch the
/// distance counter or the point sequence.
pub const ACCURACY_LIMIT_METERS: f64 = 150.0;
/// Movement below this against the last accepted point is GPS jitter.
pub const MIN_DELTA_METERS: f64 = 1.0;

/// Seconds between draft snapshot writes while tracking.
pub const SNAPSHOT_INTERVAL_SECS: u64 = 10;

#[derive(Debug)]
pub enum EngineError {
    InvalidState(String),
    Persistence(String),
    Insight(String),
    PosterRender(String),
    TripNotFound(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            EngineError::Persistence(msg) => write!(f, "persistence error: {msg}"),
            EngineError::Insight(msg) => write!(f, "insight generation failed: {msg}"),
            EngineError::PosterRender(msg) => write!(f, "poster rendering failed: {msg}"),
            EngineError::TripNotFound(id) => write!(f, "no trip with id {id}"),
        }
    }
}

impl std::error::Error for EngineError {}
