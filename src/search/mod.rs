//! Searches over roof position and extrusion length.
//!
//! `roof` locates candidate roof placements on a tile, `structure` sweeps
//! length for each placement, `multiview` fuses several views into one
//! ranking and `select` picks the final answer.

pub mod multiview;
pub mod observer;
pub mod roof;
pub mod select;
pub mod structure;

pub use multiview::{
    BaselinePolicy, Consensus, MultiviewEstimator, MultiviewModel, MultiviewResponse, ViewGeometry,
    BASELINE_LENGTH,
};
pub use observer::{ConsensusEvent, EstimationObserver, RoofCandidateEvent, StructureEvent};
pub use roof::{RoofEstimator, RoofResponse, RoofSearch, RoofSearchConfig};
pub use select::{choose_multiview, choose_single_view, MULTIVIEW_CHOICE_RATIO};
pub use structure::{ModelResponse, StructureCandidates, StructureEstimator};
