//! # signalfield Kriging
//!
//! Ordinary Kriging engine for sparse, geotagged network-performance
//! measurements (ping latency, signal strength). Turns a scattered set of
//! `(x, y, value)` samples into a gridded estimate surface plus a
//! kriging-variance (uncertainty) surface.
//!
//! Pipeline:
//! 1. [`SampleStore`] — deduplicated, immutable observations
//! 2. [`empirical_variogram`] — binned semivariance vs. distance
//! 3. [`fit_model`] / [`fit_best_model`] — theoretical variogram fit
//! 4. [`KrigingSystem`] — one-time factorization of the kriging system
//! 5. [`evaluate_grid`] — per-cell solves onto an output grid
//!
//! Coordinates must already be planar (projected); latitude/longitude
//! input is the responsibility of an upstream projection step.

mod maybe_rayon;

pub mod evaluate;
pub mod fit;
pub mod model;
pub mod samples;
pub mod solver;
pub mod variogram;

pub use evaluate::{
    evaluate_cells, evaluate_grid, evaluate_grid_with, EvalOptions, KrigingGrid,
};
pub use fit::{fit_best_model, fit_model, FitOptions, FittedModel};
pub use model::{ModelFamily, VariogramModel};
pub use samples::SampleStore;
pub use solver::{KrigingSystem, Prediction};
pub use variogram::{empirical_variogram, EmpiricalVariogram, LagBin, VariogramParams};

/// A measurement at a planar location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to another location
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another location
    #[inline]
    pub fn dist(&self, other_x: f64, other_y: f64) -> f64 {
        self.dist_sq(other_x, other_y).sqrt()
    }
}
