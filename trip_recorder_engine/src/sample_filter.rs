use trip_recorder_lib::geo_point::GeoPoint;

use crate::{ACCURACY_LIMIT_METERS, MIN_DELTA_METERS};

/// Live signal indicator derived from the accuracy check alone. A sample
/// rejected as jitter still reports `Good` if its accuracy was acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalQuality {
    Good,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleDecision {
    /// First accepted point of the session. Stored, no distance yet.
    Anchor,
    /// Stored; `delta_meters` is added to the session distance.
    Accepted { delta_meters: f64 },
    /// Reported accuracy above the limit. Never stored, never an anchor.
    RejectedWeak,
    /// Sub-meter movement against the anchor while accuracy was fine.
    RejectedJitter,
}

impl SampleDecision {
    pub fn signal_quality(&self) -> SignalQuality {
        match self {
            SampleDecision::RejectedWeak => SignalQuality::Weak,
            _ => SignalQuality::Good,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SampleDecision::Anchor | SampleDecision::Accepted { .. })
    }
}

/// Decides whether a raw sample contributes to distance and is retained.
/// Owns the anchor: the last accepted point, reference for the next delta.
#[derive(Debug, Default)]
pub struct SampleFilter {
    anchor: Option<GeoPoint>,
}

impl SampleFilter {
    pub fn new() -> Self {
        Self { anchor: None }
    }

    /// For resuming a restored draft: anchor on its last point so the next
    /// sample only contributes the distance moved since the snapshot.
    pub fn with_anchor(anchor: Option<GeoPoint>) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> Option<&GeoPoint> {
        self.anchor.as_ref()
    }

    pub fn evaluate(&mut self, candidate: &GeoPoint) -> SampleDecision {
        if let Some(accuracy) = candidate.accuracy {
            if accuracy > ACCURACY_LIMIT_METERS {
                return SampleDecision::RejectedWeak;
            }
        }

        let Some(anchor) = &self.anchor else {
            self.anchor = Some(candidate.clone());
            return SampleDecision::Anchor;
        };

        let delta_meters = anchor.distance_meters(candidate);
        if delta_meters < MIN_DELTA_METERS {
            return SampleDecision::RejectedJitter;
        }

        self.anchor = Some(candidate.clone());
        SampleDecision::Accepted { delta_meters }
    }
}
