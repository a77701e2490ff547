//! Kriging system assembly and per-point solves
//!
//! Best Linear Unbiased Estimator (BLUE) for spatial data. The ordinary
//! kriging system for n samples, in covariance form:
//! ```text
//! [C(x₁,x₁) ... C(x₁,xₙ) 1] [λ₁]   [C(x₁,x₀)]
//! [   ...     ...    ...  .] [. ] = [   ...   ]
//! [C(xₙ,x₁) ... C(xₙ,xₙ) 1] [λₙ]   [C(xₙ,x₀)]
//! [  1       ...    1     0] [μ ]   [    1    ]
//! ```
//! with C(h) = sill − γ(h) and μ the Lagrange multiplier enforcing
//! Σλᵢ = 1. The augmented matrix is factorized once (LDLᵀ; it is
//! symmetric but indefinite, the Lagrange pivot is negative), then each
//! target point costs one O(n²) substitution instead of an O(n³)
//! elimination. Grids may hold thousands of cells against a modest n.
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use ndarray::Array2;
use signalfield_core::{Error, Result};
use tracing::debug;

use crate::model::VariogramModel;
use crate::samples::SampleStore;
use crate::Sample;

/// Targets closer than this to a sample location short-circuit to the
/// sample's value (exact-interpolation property).
const SNAP_TOLERANCE: f64 = 1e-12;

/// Relative pivot threshold for the factorization.
const PIVOT_RELATIVE: f64 = 1e-12;

/// Estimate and kriging variance at one target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub estimate: f64,
    /// Kriging variance, clamped to be non-negative
    pub variance: f64,
}

/// Factorized ordinary kriging system, built once per (samples, model)
/// pair and reused read-only across all grid evaluations.
#[derive(Debug, Clone)]
pub struct KrigingSystem {
    /// LDLᵀ factor of the augmented matrix: L strictly below the
    /// diagonal, D on the diagonal.
    factor: Array2<f64>,
    samples: Vec<Sample>,
    model: VariogramModel,
    sill: f64,
}

impl KrigingSystem {
    /// Assemble and factorize the augmented covariance system.
    ///
    /// If the first factorization hits a vanishing pivot (typically
    /// near-duplicate sample locations that escaped merging), the sample
    /// block diagonal is regularized with the nugget (or a small fraction
    /// of the sill when the nugget is zero) and factorization is retried
    /// once.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] for an invalid model
    /// - [`Error::SingularCovarianceMatrix`] if the retry also fails
    pub fn build(store: &SampleStore, model: &VariogramModel) -> Result<Self> {
        model.validate()?;
        let n = store.len();
        let m = n + 1;
        let sill = model.sill();

        let mut matrix = Array2::<f64>::zeros((m, m));
        for i in 0..n {
            matrix[[i, i]] = sill; // C(0) = sill − γ(0)
            for j in (i + 1)..n {
                let c = model.covariance(store.distance(i, j));
                matrix[[i, j]] = c;
                matrix[[j, i]] = c;
            }
            matrix[[i, n]] = 1.0;
            matrix[[n, i]] = 1.0;
        }
        // matrix[[n, n]] stays 0: the Lagrange corner.

        let factor = match ldlt(&matrix) {
            Ok(factor) => factor,
            Err(_) => {
                let epsilon = if model.nugget() > 0.0 {
                    model.nugget()
                } else {
                    sill * 1e-8
                };
                for i in 0..n {
                    matrix[[i, i]] += epsilon;
                }
                let factor = ldlt(&matrix)?;
                debug!(epsilon, "factorization retried with diagonal regularization");
                factor
            }
        };

        debug!(samples = n, "kriging system factorized");
        Ok(Self {
            factor,
            samples: store.as_slice().to_vec(),
            model: *model,
            sill,
        })
    }

    /// Number of samples in the system
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the system holds no samples (never, by construction)
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The variogram model backing this system
    pub fn model(&self) -> &VariogramModel {
        &self.model
    }

    /// Kriging weights λ₁..λₙ and Lagrange multiplier μ (last element)
    /// for a target point. The weights sum to 1 up to numerical noise.
    pub fn weights(&self, x: f64, y: f64) -> Vec<f64> {
        let mut solution = self.rhs(x, y);
        self.solve_in_place(&mut solution);
        solution
    }

    /// Estimate and kriging variance at `(x, y)`.
    ///
    /// A target coinciding with a sample location returns that sample's
    /// value with variance equal to the nugget.
    pub fn predict(&self, x: f64, y: f64) -> Prediction {
        if let Some(sample) = self
            .samples
            .iter()
            .find(|s| s.dist_sq(x, y) < SNAP_TOLERANCE * SNAP_TOLERANCE)
        {
            return Prediction {
                estimate: sample.value,
                variance: self.model.nugget(),
            };
        }

        let n = self.samples.len();
        let covariances = self.rhs(x, y);
        let mut solution = covariances.clone();
        self.solve_in_place(&mut solution);

        let mut estimate = 0.0;
        for (i, sample) in self.samples.iter().enumerate() {
            estimate += solution[i] * sample.value;
        }

        // σ² = C(0) − Σ λᵢ·C(xᵢ,x₀) − μ, clamped against numerical noise.
        let mut variance = self.sill;
        for i in 0..n {
            variance -= solution[i] * covariances[i];
        }
        variance -= solution[n];

        Prediction {
            estimate,
            variance: variance.max(0.0),
        }
    }

    /// Right-hand side: target covariances plus the constraint entry.
    fn rhs(&self, x: f64, y: f64) -> Vec<f64> {
        let n = self.samples.len();
        let mut b = vec![0.0_f64; n + 1];
        for (i, sample) in self.samples.iter().enumerate() {
            b[i] = self.model.covariance(sample.dist(x, y));
        }
        b[n] = 1.0;
        b
    }

    /// Solve the factorized system in place: Lz = b, D y = z, Lᵀx = y.
    fn solve_in_place(&self, b: &mut [f64]) {
        let m = b.len();
        for i in 0..m {
            for k in 0..i {
                b[i] -= self.factor[[i, k]] * b[k];
            }
        }
        for i in 0..m {
            b[i] /= self.factor[[i, i]];
        }
        for i in (0..m).rev() {
            for k in (i + 1)..m {
                b[i] -= self.factor[[k, i]] * b[k];
            }
        }
    }
}

/// Unpivoted LDLᵀ factorization of a symmetric matrix.
///
/// Valid for the augmented kriging matrix: the sample block is positive
/// definite, so the first n pivots are positive and only the final
/// Lagrange pivot goes negative. Returns L (strict lower triangle) and D
/// (diagonal) packed into one array.
fn ldlt(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let m = matrix.nrows();
    let scale = matrix
        .diag()
        .iter()
        .fold(1.0_f64, |acc, &v| acc.max(v.abs()));
    let tolerance = PIVOT_RELATIVE * scale;

    let mut factor = matrix.clone();
    for j in 0..m {
        let mut d = factor[[j, j]];
        for k in 0..j {
            let l = factor[[j, k]];
            d -= l * l * factor[[k, k]];
        }
        if d.abs() < tolerance || !d.is_finite() {
            return Err(Error::SingularCovarianceMatrix);
        }
        factor[[j, j]] = d;

        for i in (j + 1)..m {
            let mut v = factor[[i, j]];
            for k in 0..j {
                v -= factor[[i, k]] * factor[[j, k]] * factor[[k, k]];
            }
            factor[[i, j]] = v / d;
        }
    }
    Ok(factor)
}
