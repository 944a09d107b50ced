use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trip_recorder_engine::{
    EngineError, SessionEngine,
    ports::{InsightGenerator, LocationEvent, LocationSource, PosterRenderer, PosterRequest},
    geocode::ReverseGeocoder,
    store::FileStore,
};
use trip_recorder_lib::{geo_point::GeoPoint, trip::PosterImage};

/// Synthetic walk heading north, one fix per 200 ms.
#[derive(Clone)]
struct SimulatedWalk {
    step: Arc<AtomicU64>,
}

impl LocationSource for SimulatedWalk {
    fn start_watching(&self) -> mpsc::Receiver<LocationEvent> {
        let (tx, rx) = mpsc::channel(16);
        let step = self.step.clone();
        tokio::spawn(async move {
            loop {
                let n = step.fetch_add(1, Ordering::SeqCst) as f64;
                let point = GeoPoint::new(55.6761 + n * 0.0001, 12.5683, Utc::now(), Some(8.0));
                if tx.send(LocationEvent::Sample(point)).await.is_err() {
                    break;
                }
                tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
            }
        });
        rx
    }
}

#[derive(Clone)]
struct TemplateInsights;

impl InsightGenerator for TemplateInsights {
    async fn generate(&self, distance_meters: f64, duration_sec: u64, title: &str) -> Result<String, EngineError> {
        Ok(format!(
            "{title}: {:.2} km in {} min.",
            distance_meters / 1000.0,
            duration_sec.div_ceil(60)
        ))
    }
}

/// Minimal poster: an SVG polyline over the recorded route.
#[derive(Clone)]
struct SvgPoster;

impl PosterRenderer for SvgPoster {
    async fn render(&self, request: PosterRequest) -> Result<PosterImage, EngineError> {
        let path = request
            .points
            .iter()
            .map(|p| format!("{:.1},{:.1}", (p.lng + 180.0) * 10.0, (90.0 - p.lat) * 10.0))
            .collect::<Vec<_>>()
            .join(" ");
        let svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><title>{} {}</title>\
             <polyline points=\"{path}\" fill=\"none\" stroke=\"black\"/>\
             <text y=\"20\">{} - {}</text></svg>",
            request.title, request.time_range, request.start_label, request.end_label
        );
        Ok(PosterImage(svg.into_bytes()))
    }
}

// Records a short simulated session end to end and prints the result.
#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = FileStore::open("data").await.unwrap();
    let walk = SimulatedWalk {
        step: Arc::new(AtomicU64::new(0)),
    };
    let engine = SessionEngine::init(walk, ReverseGeocoder::new(), TemplateInsights, SvgPoster, store).await;

    if let Some(draft) = engine.pending_draft().await {
        tracing::info!(
            "Recovered draft from {} ({} points), discarding for a fresh demo",
            draft.started_at,
            draft.points.len()
        );
        engine.discard_draft().await.unwrap();
    }

    engine.start_session(true).await.unwrap();
    tokio::time::sleep(tokio::time::Duration::from_secs(3)).await;

    let snapshot = engine.session_snapshot().await;
    tracing::info!(
        "Tracking: {} points, {:.1} m, signal {:?}",
        snapshot.point_count,
        snapshot.distance_meters,
        snapshot.signal
    );

    engine.finish(true).await.unwrap();
    let trip = engine.commit().await.unwrap();
    tracing::info!(
        "Committed trip {}: {:.1} m, {} s, insight: {:?}",
        trip.id,
        trip.distance_meters,
        trip.duration_sec,
        trip.insight_text
    );

    for trip in engine.archive().await {
        tracing::info!("Archived: {} {} ({:.1} m)", trip.id, trip.name, trip.distance_meters);
    }
}
