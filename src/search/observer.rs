//! Optional callbacks fired while candidates are evaluated.
//!
//! Estimators hold an `Arc<dyn EstimationObserver>` when one is attached and
//! call it from worker threads, so implementations must be `Send + Sync`.
//! Every method has an empty default.

use crate::geometry::Point;
use crate::model::Estimates;

/// A roof placement scored during position search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoofCandidateEvent {
    /// Pixel shift from the nominal footprint position.
    pub shift: Point,
    /// Heatmap response at that shift.
    pub response: f64,
}

/// A structure scored during the length sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StructureEvent {
    /// Index of the roof candidate.
    pub roof_index: usize,
    pub length: u32,
    pub estimates: Estimates,
    /// Combined value used for ranking.
    pub value: f64,
}

/// A consensus computed for one length across views.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConsensusEvent {
    pub length: u32,
    pub score: f64,
    pub shade_weight: Option<f64>,
    pub contributing: usize,
}

/// Receives evaluation events; all methods default to no-ops.
pub trait EstimationObserver: Send + Sync {
    fn on_roof_candidate(&self, _event: &RoofCandidateEvent) {}

    fn on_structure_evaluated(&self, _event: &StructureEvent) {}

    fn on_consensus(&self, _event: &ConsensusEvent) {}
}
