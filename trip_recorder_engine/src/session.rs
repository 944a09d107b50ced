use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Duration, Instant, interval_at},
};
use trip_recorder_lib::{
    draft_trip::DraftTrip,
    geo_point::GeoPoint,
    trip::Trip,
};

use crate::{
    EngineError, SNAPSHOT_INTERVAL_SECS,
    archive::ArchiveStore,
    draft_store::DraftStore,
    finalize::{self, END_PLACEHOLDER, ReviewSummary, START_PLACEHOLDER},
    ports::{Geocoder, InsightGenerator, KeyValueStore, LocationEvent, LocationSource, PosterRenderer, PosterRequest},
    sample_filter::{SampleDecision, SampleFilter, SignalQuality},
};

/// Live signal indicator shown while tracking. Never an error, except for
/// `PermissionDenied` which is fatal for the stream but not for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStatus {
    Acquiring,
    Good,
    Weak,
    Unavailable,
    PermissionDenied,
}

#[derive(Debug, Clone)]
pub enum SessionPhase {
    Idle,
    /// A recoverable draft exists; resuming is always an explicit decision.
    DraftFound(DraftTrip),
    Tracking,
    Finishing,
    Reviewing(ReviewSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    DraftFound,
    Tracking,
    Finishing,
    Reviewing,
}

impl SessionPhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            SessionPhase::Idle => PhaseKind::Idle,
            SessionPhase::DraftFound(_) => PhaseKind::DraftFound,
            SessionPhase::Tracking => PhaseKind::Tracking,
            SessionPhase::Finishing => PhaseKind::Finishing,
            SessionPhase::Reviewing(_) => PhaseKind::Reviewing,
        }
    }
}

/// Read-only view of the current session for presentation code.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: PhaseKind,
    pub elapsed_sec: u64,
    pub distance_meters: f64,
    pub point_count: usize,
    pub signal: SignalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// Fewer than 2 points were recorded; the caller must confirm before the
    /// session actually finishes. The session stays tracking meanwhile.
    NeedsConfirmation,
    Reviewing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSide {
    Start,
    End,
}

struct LiveSession {
    started_at: DateTime<Utc>,
    start_time_label: String,
    is_private: bool,
    elapsed_sec: u64,
    distance_meters: f64,
    points: Vec<GeoPoint>,
}

impl LiveSession {
    fn empty() -> Self {
        Self {
            started_at: Utc::now(),
            start_time_label: String::new(),
            is_private: false,
            elapsed_sec: 0,
            distance_meters: 0.0,
            points: Vec::new(),
        }
    }
}

struct SessionState {
    phase: SessionPhase,
    live: LiveSession,
    filter: SampleFilter,
    signal: SignalStatus,
    sampler: Option<JoinHandle<()>>,
}

impl SessionState {
    fn stop_sampler(&mut self) {
        if let Some(handle) = self.sampler.take() {
            handle.abort();
        }
    }

    fn reset_live(&mut self) {
        self.live = LiveSession::empty();
        self.filter = SampleFilter::new();
        self.signal = SignalStatus::Acquiring;
    }

    fn draft_snapshot(&self) -> DraftTrip {
        DraftTrip {
            started_at: self.live.started_at,
            start_time_label: self.live.start_time_label.clone(),
            is_private: self.live.is_private,
            elapsed_sec: self.live.elapsed_sec,
            distance_meters: self.live.distance_meters,
            points: self.live.points.clone(),
        }
    }
}

/// One trip recording session from start to committed trip.
///
/// All session mutation is serialized behind a single mutex: GPS events, the
/// 1-second elapsed tick and the 10-second snapshot tick all funnel through
/// the one sampling task, and the public operations lock the same state.
pub struct SessionEngine<L, G, I, P, S> {
    state: Arc<Mutex<SessionState>>,
    location: L,
    geocoder: G,
    insights: I,
    renderer: P,
    drafts: DraftStore<S>,
    archive: ArchiveStore<S>,
}

impl<L, G, I, P, S> SessionEngine<L, G, I, P, S>
where
    L: LocationSource,
    G: Geocoder,
    I: InsightGenerator,
    P: PosterRenderer,
    S: KeyValueStore + Clone,
{
    /// Loads persisted state and surfaces a recoverable draft if one exists.
    /// An unreadable draft is deleted and ignored.
    pub async fn init(location: L, geocoder: G, insights: I, renderer: P, store: S) -> Self {
        let drafts = DraftStore::new(store.clone());
        let archive = ArchiveStore::new(store);

        let phase = match drafts.load().await {
            Some(draft) => {
                tracing::info!("Found recoverable draft started at {}", draft.started_at);
                SessionPhase::DraftFound(draft)
            }
            None => SessionPhase::Idle,
        };

        Self {
            state: Arc::new(Mutex::new(SessionState {
                phase,
                live: LiveSession::empty(),
                filter: SampleFilter::new(),
                signal: SignalStatus::Acquiring,
                sampler: None,
            })),
            location,
            geocoder,
            insights,
            renderer,
            drafts,
            archive,
        }
    }

    pub async fn start_session(&self, is_private: bool) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        if !matches!(state.phase, SessionPhase::Idle) {
            return Err(EngineError::InvalidState(
                "A session can only be started from idle".to_string(),
            ));
        }

        let started_at = Utc::now();
        state.reset_live();
        state.live.started_at = started_at;
        state.live.start_time_label = started_at.format("%H:%M").to_string();
        state.live.is_private = is_private;
        state.phase = SessionPhase::Tracking;
        state.sampler = Some(self.spawn_sampler());

        tracing::info!("Session started at {started_at}");
        Ok(())
    }

    /// Restores the stored draft as the live session and continues tracking.
    /// The filter anchors on the last restored point, so the restored segment
    /// is never counted twice.
    pub async fn resume_draft(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut state.phase, SessionPhase::Idle) {
            SessionPhase::DraftFound(draft) => {
                state.filter = SampleFilter::with_anchor(draft.points.last().cloned());
                state.signal = SignalStatus::Acquiring;
                state.live = LiveSession {
                    started_at: draft.started_at,
                    start_time_label: draft.start_time_label,
                    is_private: draft.is_private,
                    elapsed_sec: draft.elapsed_sec,
                    distance_meters: draft.distance_meters,
                    points: draft.points,
                };
                state.phase = SessionPhase::Tracking;
                state.sampler = Some(self.spawn_sampler());

                tracing::info!(
                    "Resumed draft with {} points, {:.0} m",
                    state.live.points.len(),
                    state.live.distance_meters
                );
                Ok(())
            }
            other => {
                state.phase = other;
                Err(EngineError::InvalidState(
                    "No recoverable draft to resume".to_string(),
                ))
            }
        }
    }

    pub async fn discard_draft(&self) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock().await;
            if !matches!(state.phase, SessionPhase::DraftFound(_)) {
                return Err(EngineError::InvalidState(
                    "No recoverable draft to discard".to_string(),
                ));
            }
            state.phase = SessionPhase::Idle;
        }
        self.drafts.clear().await
    }

    /// Ends the tracking session and prepares the review summary.
    ///
    /// With fewer than 2 recorded points this returns
    /// [`FinishOutcome::NeedsConfirmation`] unless `force` is set, and the
    /// session keeps tracking. Place labels stay at their placeholders for
    /// private sessions; public sessions resolve both endpoints concurrently,
    /// each falling back to its placeholder independently.
    pub async fn finish(&self, force: bool) -> Result<FinishOutcome, EngineError> {
        let mut summary = {
            let mut state = self.state.lock().await;
            if !matches!(state.phase, SessionPhase::Tracking) {
                return Err(EngineError::InvalidState(
                    "No active session to finish".to_string(),
                ));
            }
            if state.live.points.len() < 2 && !force {
                return Ok(FinishOutcome::NeedsConfirmation);
            }

            state.stop_sampler();
            state.phase = SessionPhase::Finishing;

            let ended_at = Utc::now();
            ReviewSummary {
                started_at: state.live.started_at,
                ended_at,
                start_time_label: state.live.start_time_label.clone(),
                end_time_label: ended_at.format("%H:%M").to_string(),
                is_private: state.live.is_private,
                distance_meters: state.live.distance_meters,
                duration_sec: state.live.elapsed_sec,
                points: state.live.points.clone(),
                start_label: START_PLACEHOLDER.to_string(),
                end_label: END_PLACEHOLDER.to_string(),
            }
        };

        if let Err(err) = self.drafts.clear().await {
            tracing::warn!("Failed to delete draft snapshot on finish: {err}");
        }

        if !summary.is_private {
            if let (Some(first), Some(last)) = (summary.points.first(), summary.points.last()) {
                let (start, end) = tokio::join!(
                    self.geocoder.resolve(first.lat, first.lng),
                    self.geocoder.resolve(last.lat, last.lng),
                );
                if !start.is_empty() {
                    summary.start_label = start;
                }
                if !end.is_empty() {
                    summary.end_label = end;
                }
            }
        }

        let mut state = self.state.lock().await;
        if !matches!(state.phase, SessionPhase::Finishing) {
            // Discarded while the lookups were in flight; drop the result.
            return Err(EngineError::InvalidState(
                "Session ended while finishing".to_string(),
            ));
        }
        state.phase = SessionPhase::Reviewing(summary);
        Ok(FinishOutcome::Reviewing)
    }

    pub async fn edit_review_label(&self, side: ReviewSide, text: impl Into<String>) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        let SessionPhase::Reviewing(review) = &mut state.phase else {
            return Err(EngineError::InvalidState(
                "No summary under review".to_string(),
            ));
        };
        match side {
            ReviewSide::Start => review.start_label = text.into(),
            ReviewSide::End => review.end_label = text.into(),
        }
        Ok(())
    }

    /// Runs the finalization pipeline and prepends the trip to the archive.
    ///
    /// On pipeline or archive failure nothing is persisted and the session
    /// stays in review, so the captured data remains available for a retry or
    /// an explicit discard.
    pub async fn commit(&self) -> Result<Trip, EngineError> {
        let review = {
            let state = self.state.lock().await;
            let SessionPhase::Reviewing(review) = &state.phase else {
                return Err(EngineError::InvalidState(
                    "No summary to commit".to_string(),
                ));
            };
            review.clone()
        };

        let trip = match finalize::finalize(&review, &self.insights, &self.renderer).await {
            Ok(trip) => trip,
            Err(err) => {
                tracing::error!("Commit failed, session stays in review: {err}");
                return Err(err);
            }
        };

        // Keep the lock across the archive write so a discard issued while
        // the pipeline was in flight can never persist the trip anyway.
        let mut state = self.state.lock().await;
        if !matches!(state.phase, SessionPhase::Reviewing(_)) {
            return Err(EngineError::InvalidState(
                "Session ended while committing".to_string(),
            ));
        }
        self.archive.prepend(trip.clone()).await?;
        state.phase = SessionPhase::Idle;
        state.reset_live();

        tracing::info!("Committed trip {} ({:.0} m)", trip.id, trip.distance_meters);
        Ok(trip)
    }

    /// Drops the session and its buffer entirely. No trip is created.
    pub async fn discard_session(&self) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock().await;
            match state.phase {
                SessionPhase::Tracking | SessionPhase::Finishing | SessionPhase::Reviewing(_) => {}
                _ => {
                    return Err(EngineError::InvalidState(
                        "No session to discard".to_string(),
                    ));
                }
            }
            state.stop_sampler();
            state.phase = SessionPhase::Idle;
            state.reset_live();
        }
        tracing::info!("Session discarded");
        self.drafts.clear().await
    }

    pub async fn delete_trip(&self, trip_id: &str) -> Result<(), EngineError> {
        self.archive.delete(trip_id).await
    }

    /// Re-renders the poster of an archived trip from its stored fields and
    /// swaps only the image. Id, date, distance and duration never change.
    pub async fn regenerate_poster(&self, trip_id: &str) -> Result<(), EngineError> {
        let trip = self
            .archive
            .find(trip_id)
            .await
            .ok_or_else(|| EngineError::TripNotFound(trip_id.to_string()))?;

        let image = self.renderer.render(PosterRequest::from(&trip)).await?;
        self.archive.replace_poster(trip_id, image).await
    }

    pub async fn session_snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            phase: state.phase.kind(),
            elapsed_sec: state.live.elapsed_sec,
            distance_meters: state.live.distance_meters,
            point_count: state.live.points.len(),
            signal: state.signal,
        }
    }

    pub async fn signal_status(&self) -> SignalStatus {
        self.state.lock().await.signal
    }

    pub async fn archive(&self) -> Vec<Trip> {
        self.archive.load().await
    }

    pub async fn pending_draft(&self) -> Option<DraftTrip> {
        let state = self.state.lock().await;
        match &state.phase {
            SessionPhase::DraftFound(draft) => Some(draft.clone()),
            _ => None,
        }
    }

    pub async fn review(&self) -> Option<ReviewSummary> {
        let state = self.state.lock().await;
        match &state.phase {
            SessionPhase::Reviewing(review) => Some(review.clone()),
            _ => None,
        }
    }

    /// One task owns every session mutation source: location events, the
    /// elapsed tick and the snapshot tick. Aborted on any exit from tracking.
    fn spawn_sampler(&self) -> JoinHandle<()> {
        let mut events = self.location.start_watching();
        let state = self.state.clone();
        let drafts = self.drafts.clone();

        tokio::spawn(async move {
            let start = Instant::now();
            let mut elapsed_tick = interval_at(start + Duration::from_secs(1), Duration::from_secs(1));
            let mut snapshot_tick = interval_at(
                start + Duration::from_secs(SNAPSHOT_INTERVAL_SECS),
                Duration::from_secs(SNAPSHOT_INTERVAL_SECS),
            );

            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(event) => handle_location_event(&state, event).await,
                        None => break,
                    },
                    _ = elapsed_tick.tick() => apply_elapsed_tick(&state).await,
                    _ = snapshot_tick.tick() => write_draft_snapshot(&state, &drafts).await,
                }
            }
        })
    }
}

async fn handle_location_event(state: &Mutex<SessionState>, event: LocationEvent) {
    let mut state = state.lock().await;
    if !matches!(state.phase, SessionPhase::Tracking) {
        return;
    }

    match event {
        LocationEvent::Sample(point) => {
            let decision = state.filter.evaluate(&point);
            state.signal = match decision.signal_quality() {
                SignalQuality::Good => SignalStatus::Good,
                SignalQuality::Weak => SignalStatus::Weak,
            };
            match decision {
                SampleDecision::Anchor => state.live.points.push(point),
                SampleDecision::Accepted { delta_meters } => {
                    state.live.distance_meters += delta_meters;
                    state.live.points.push(point);
                }
                SampleDecision::RejectedWeak => {
                    tracing::debug!("Dropped weak sample (accuracy {:?})", point.accuracy);
                }
                SampleDecision::RejectedJitter => {}
            }
        }
        LocationEvent::PermissionDenied => {
            tracing::error!("Location permission denied; no further samples this session");
            state.signal = SignalStatus::PermissionDenied;
        }
        LocationEvent::Unavailable => {
            state.signal = SignalStatus::Unavailable;
        }
    }
}

async fn apply_elapsed_tick(state: &Mutex<SessionState>) {
    let mut state = state.lock().await;
    if matches!(state.phase, SessionPhase::Tracking) {
        state.live.elapsed_sec += 1;
    }
}

async fn write_draft_snapshot<S: KeyValueStore>(state: &Mutex<SessionState>, drafts: &DraftStore<S>) {
    // Keep the lock across the write so a concurrent finish cannot clear the
    // draft between the phase check and the save.
    let state = state.lock().await;
    if !matches!(state.phase, SessionPhase::Tracking) {
        return;
    }
    if let Err(err) = drafts.save(&state.draft_snapshot()).await {
        tracing::warn!("Failed to persist draft snapshot: {err}");
    }
}
