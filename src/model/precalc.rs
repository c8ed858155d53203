//! Structures precomputed over a contiguous length range.
//!
//! Boolean geometry dominates the cost of a length sweep, so views that are
//! scored many times (multiview consensus) generate every length once up
//! front and only translate the cached polygons afterwards.

use crate::geometry::Point;
use crate::image::{ImageView, OwnedImage};
use crate::model::{BuildingModel, Estimates, ScoringKernels, ScoringParams, Structure};
use crate::util::{RoofShadeError, RoofShadeResult};
use std::ops::RangeInclusive;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Immutable cache of structures indexed by length.
#[derive(Clone, Debug, PartialEq)]
pub struct Precalculated {
    from: u32,
    structures: Vec<Structure>,
}

impl Precalculated {
    /// Generates `model` for every length in `[from, to]`.
    pub fn build<M: BuildingModel>(model: &M, from: u32, to: u32) -> RoofShadeResult<Self> {
        if from == 0 || from > to {
            return Err(RoofShadeError::InvalidRange { from, to });
        }
        #[cfg(feature = "rayon")]
        let structures = (from..=to)
            .into_par_iter()
            .map(|length| model.generate(length))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let structures = (from..=to).map(|length| model.generate(length)).collect();
        Ok(Self { from, structures })
    }

    /// Lengths covered by the cache.
    pub fn range(&self) -> RangeInclusive<u32> {
        self.from..=self.from + self.structures.len() as u32 - 1
    }

    /// Cached structure for `length`, if it lies in range.
    pub fn get(&self, length: u32) -> Option<&Structure> {
        let idx = length.checked_sub(self.from)? as usize;
        self.structures.get(idx)
    }

    /// Scores the cached structure at `length` moved by `shift`.
    ///
    /// Out-of-range lengths score zero.
    pub fn estimate(
        &self,
        length: u32,
        shift: Point,
        tile: ImageView<'_, u8>,
        kernels: &ScoringKernels,
        params: &ScoringParams,
        evidence: Option<&[OwnedImage<u8>]>,
    ) -> Estimates {
        match self.get(length) {
            Some(structure) => structure
                .translated(shift)
                .estimate_with(tile, kernels, params, evidence),
            None => Estimates::default(),
        }
    }
}
