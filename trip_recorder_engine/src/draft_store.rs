use trip_recorder_lib::draft_trip::DraftTrip;

use crate::{DRAFT_KEY, EngineError, ports::KeyValueStore};

/// Single-slot crash recovery for the one active session. Snapshots overwrite
/// each other; an unreadable snapshot is treated as absent, never as an error.
#[derive(Clone)]
pub struct DraftStore<S> {
    store: S,
}

impl<S: KeyValueStore> DraftStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Option<DraftTrip> {
        let raw = match self.store.get(DRAFT_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!("Failed to read draft snapshot: {err}");
                return None;
            }
        };

        match serde_json::from_str::<DraftTrip>(&raw) {
            Ok(draft) => Some(draft),
            Err(err) => {
                tracing::warn!("Deleting unreadable draft snapshot: {err}");
                if let Err(err) = self.store.delete(DRAFT_KEY).await {
                    tracing::warn!("Failed to delete unreadable draft snapshot: {err}");
                }
                None
            }
        }
    }

    pub async fn save(&self, draft: &DraftTrip) -> Result<(), EngineError> {
        let json = serde_json::to_string(draft)
            .map_err(|err| EngineError::Persistence(format!("Failed to serialize draft: {err}")))?;
        self.store.set(DRAFT_KEY, json).await
    }

    pub async fn clear(&self) -> Result<(), EngineError> {
        self.store.delete(DRAFT_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use trip_recorder_lib::geo_point::GeoPoint;

    fn draft() -> DraftTrip {
        DraftTrip {
            started_at: Utc::now(),
            start_time_label: "08:30".to_string(),
            is_private: true,
            elapsed_sec: 95,
            distance_meters: 240.7,
            points: vec![GeoPoint::new(55.676, 12.568, Utc::now(), Some(6.0))],
        }
    }

    #[tokio::test]
    async fn save_load_clear() {
        let drafts = DraftStore::new(MemoryStore::new());
        assert_eq!(drafts.load().await, None);

        let snapshot = draft();
        drafts.save(&snapshot).await.unwrap();
        assert_eq!(drafts.load().await, Some(snapshot));

        drafts.clear().await.unwrap();
        assert_eq!(drafts.load().await, None);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_deleted_and_reported_absent() {
        let store = MemoryStore::new();
        store.set(DRAFT_KEY, "not json {{{".to_string()).await.unwrap();

        let drafts = DraftStore::new(store.clone());
        assert_eq!(drafts.load().await, None);
        assert_eq!(store.get(DRAFT_KEY).await.unwrap(), None);
    }
}
