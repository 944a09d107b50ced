use chrono::{DateTime, Utc};
use trip_recorder_lib::{geo_point::GeoPoint, trip::Trip};

use crate::{
    EngineError,
    ports::{InsightGenerator, PosterRenderer, PosterRequest},
};

pub const START_PLACEHOLDER: &str = "Start";
pub const END_PLACEHOLDER: &str = "End";

/// Editable summary of a finished session, shown to the user before commit.
/// Only the two place labels may change; everything else is already frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSummary {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub start_time_label: String,
    pub end_time_label: String,
    pub is_private: bool,
    pub distance_meters: f64,
    pub duration_sec: u64,
    pub points: Vec<GeoPoint>,
    pub start_label: String,
    pub end_label: String,
}

pub fn new_trip_id() -> String {
    hex::encode(rand::random::<[u8; 8]>())
}

/// Turns a reviewed summary into a persisted-ready [`Trip`].
///
/// Insight generation is best-effort: on failure the field is simply absent.
/// Poster rendering is the primary artifact, so its failure fails the whole
/// commit and no trip is produced.
pub async fn finalize<I: InsightGenerator, P: PosterRenderer>(
    review: &ReviewSummary,
    insights: &I,
    renderer: &P,
) -> Result<Trip, EngineError> {
    let title = format!("Trip {}", review.started_at.date_naive());

    let insight_text = match insights
        .generate(review.distance_meters, review.duration_sec, &title)
        .await
    {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::warn!("Continuing without insight: {err}");
            None
        }
    };

    let request = PosterRequest {
        title: title.clone(),
        date_label: review.started_at.format("%Y-%m-%d").to_string(),
        time_range: format!("{} - {}", review.start_time_label, review.end_time_label),
        distance_meters: review.distance_meters,
        duration_sec: review.duration_sec,
        points: review.points.clone(),
        start_label: review.start_label.clone(),
        end_label: review.end_label.clone(),
    };
    let poster_image = renderer.render(request).await?;

    Ok(Trip {
        id: new_trip_id(),
        name: title,
        date: review.started_at,
        start_time_label: review.start_time_label.clone(),
        end_time_label: review.end_time_label.clone(),
        is_private: review.is_private,
        distance_meters: review.distance_meters,
        duration_sec: review.duration_sec,
        points: review.points.clone(),
        poster_image,
        insight_text,
        start_label: review.start_label.clone(),
        end_label: review.end_label.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use trip_recorder_lib::trip::PosterImage;

    struct NoInsights;
    impl InsightGenerator for NoInsights {
        async fn generate(&self, _: f64, _: u64, _: &str) -> Result<String, EngineError> {
            Err(EngineError::Insight("model offline".to_string()))
        }
    }

    struct EchoRenderer;
    impl PosterRenderer for EchoRenderer {
        async fn render(&self, request: PosterRequest) -> Result<PosterImage, EngineError> {
            Ok(PosterImage(request.title.into_bytes()))
        }
    }

    fn review() -> ReviewSummary {
        let started_at = Utc.with_ymd_and_hms(2026, 8, 30, 9, 15, 0).unwrap();
        ReviewSummary {
            started_at,
            ended_at: started_at + chrono::Duration::seconds(2820),
            start_time_label: "09:15".to_string(),
            end_time_label: "10:02".to_string(),
            is_private: false,
            distance_meters: 4211.5,
            duration_sec: 2820,
            points: vec![GeoPoint::new(55.676, 12.568, started_at, Some(8.0))],
            start_label: "Harbor".to_string(),
            end_label: END_PLACEHOLDER.to_string(),
        }
    }

    #[tokio::test]
    async fn insight_failure_does_not_fail_the_pipeline() {
        let trip = finalize(&review(), &NoInsights, &EchoRenderer).await.unwrap();
        assert_eq!(trip.insight_text, None);
        assert_eq!(trip.name, "Trip 2026-08-30");
        assert_eq!(trip.poster_image, PosterImage(b"Trip 2026-08-30".to_vec()));
        assert_eq!(trip.start_label, "Harbor");
        assert_eq!(trip.duration_sec, 2820);
    }

    #[tokio::test]
    async fn trip_ids_are_unique() {
        let a = new_trip_id();
        let b = new_trip_id();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
