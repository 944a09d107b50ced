use trip_recorder_lib::trip::{PosterImage, Trip};

use crate::{ARCHIVE_CAP, ARCHIVE_KEY, EngineError, ports::KeyValueStore};

/// Persisted list of committed trips, newest first, capped at [`ARCHIVE_CAP`].
/// The session engine is the only writer; everything else gets snapshot reads.
#[derive(Clone)]
pub struct ArchiveStore<S> {
    store: S,
}

impl<S: KeyValueStore> ArchiveStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Vec<Trip> {
        let raw = match self.store.get(ARCHIVE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!("Failed to read trip archive: {err}");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Trip>>(&raw) {
            Ok(trips) => trips,
            Err(err) => {
                tracing::warn!("Trip archive is unreadable, treating as empty: {err}");
                Vec::new()
            }
        }
    }

    pub async fn find(&self, trip_id: &str) -> Option<Trip> {
        self.load().await.into_iter().find(|trip| trip.id == trip_id)
    }

    /// Inserts at the front, silently dropping the oldest beyond the cap.
    pub async fn prepend(&self, trip: Trip) -> Result<(), EngineError> {
        let mut trips = self.load().await;
        trips.insert(0, trip);
        trips.truncate(ARCHIVE_CAP);
        self.persist(&trips).await
    }

    pub async fn delete(&self, trip_id: &str) -> Result<(), EngineError> {
        let mut trips = self.load().await;
        let before = trips.len();
        trips.retain(|trip| trip.id != trip_id);
        if trips.len() == before {
            return Err(EngineError::TripNotFound(trip_id.to_string()));
        }
        self.persist(&trips).await
    }

    /// Swaps the stored poster bytes; every other field stays untouched.
    pub async fn replace_poster(&self, trip_id: &str, image: PosterImage) -> Result<(), EngineError> {
        let mut trips = self.load().await;
        let trip = trips
            .iter_mut()
            .find(|trip| trip.id == trip_id)
            .ok_or_else(|| EngineError::TripNotFound(trip_id.to_string()))?;
        trip.poster_image = image;
        self.persist(&trips).await
    }

    async fn persist(&self, trips: &[Trip]) -> Result<(), EngineError> {
        let json = serde_json::to_string(trips)
            .map_err(|err| EngineError::Persistence(format!("Failed to serialize archive: {err}")))?;
        self.store.set(ARCHIVE_KEY, json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn trip(id: &str) -> Trip {
        Trip {
            id: id.to_string(),
            name: format!("Trip {id}"),
            date: Utc::now(),
            start_time_label: "07:00".to_string(),
            end_time_label: "07:45".to_string(),
            is_private: false,
            distance_meters: 1000.0,
            duration_sec: 2700,
            points: Vec::new(),
            poster_image: PosterImage(vec![1]),
            insight_text: None,
            start_label: "Start".to_string(),
            end_label: "End".to_string(),
        }
    }

    #[tokio::test]
    async fn newest_first_and_capped_at_fifty() {
        let archive = ArchiveStore::new(MemoryStore::new());
        for i in 0..51 {
            archive.prepend(trip(&i.to_string())).await.unwrap();
        }

        let trips = archive.load().await;
        assert_eq!(trips.len(), ARCHIVE_CAP);
        assert_eq!(trips.first().unwrap().id, "50");
        // Trip "0" was the oldest and fell off the end.
        assert_eq!(trips.last().unwrap().id, "1");
    }

    #[tokio::test]
    async fn delete_removes_only_the_named_trip() {
        let archive = ArchiveStore::new(MemoryStore::new());
        archive.prepend(trip("a")).await.unwrap();
        archive.prepend(trip("b")).await.unwrap();

        archive.delete("a").await.unwrap();
        let trips = archive.load().await;
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, "b");

        assert!(matches!(
            archive.delete("a").await,
            Err(EngineError::TripNotFound(_))
        ));
    }

    #[tokio::test]
    async fn replace_poster_keeps_every_other_field() {
        let archive = ArchiveStore::new(MemoryStore::new());
        archive.prepend(trip("a")).await.unwrap();

        archive.replace_poster("a", PosterImage(vec![9, 9])).await.unwrap();
        let stored = archive.find("a").await.unwrap();
        assert_eq!(stored.poster_image, PosterImage(vec![9, 9]));
        assert_eq!(stored.distance_meters, 1000.0);
        assert_eq!(stored.duration_sec, 2700);
    }

    #[tokio::test]
    async fn corrupt_archive_reads_as_empty() {
        let store = MemoryStore::new();
        store.set(ARCHIVE_KEY, "][".to_string()).await.unwrap();

        let archive = ArchiveStore::new(store);
        assert!(archive.load().await.is_empty());
    }
}
