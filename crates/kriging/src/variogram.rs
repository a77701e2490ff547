//! Empirical variogram estimation
//!
//! Computes the binned semivariance of measurement differences as a
//! function of inter-sample distance:
//! ```text
//! γ(h) = (1/2N(h)) Σ [z(xᵢ) - z(xⱼ)]²   over pairs with |xᵢ-xⱼ| in bin h
//! ```
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use serde::{Deserialize, Serialize};
use signalfield_core::{Error, Result};

use crate::samples::SampleStore;

/// Minimum pairs a lag bin needs to be kept. A single-pair semivariance
/// estimate is too noisy to feed the fitter.
const MIN_PAIRS_PER_BIN: usize = 2;

/// One lag bin of the empirical variogram, covering `[distance_lo, distance_hi)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagBin {
    /// Inclusive lower distance bound
    pub distance_lo: f64,
    /// Exclusive upper distance bound
    pub distance_hi: f64,
    /// Mean semivariance of the pairs in this bin
    pub semivariance: f64,
    /// Number of sample pairs contributing
    pub pair_count: usize,
}

impl LagBin {
    /// Bin center distance, used as the abscissa when fitting
    #[inline]
    pub fn center(&self) -> f64 {
        0.5 * (self.distance_lo + self.distance_hi)
    }
}

/// Parameters for empirical variogram computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariogramParams {
    /// Number of lag bins when `lag_size` is auto-derived (default 12)
    pub n_lags: usize,
    /// Bin width. `None`: auto-derived as `max_lag / n_lags`.
    pub lag_size: Option<f64>,
    /// Maximum pair distance considered. `None`: auto-derived as half the
    /// diagonal of the sample bounding box.
    pub max_lag: Option<f64>,
}

impl Default for VariogramParams {
    fn default() -> Self {
        Self {
            n_lags: 12,
            lag_size: None,
            max_lag: None,
        }
    }
}

/// Empirical variogram: lag bins ordered by increasing distance. Bins
/// with fewer than two pairs have already been dropped.
#[derive(Debug, Clone)]
pub struct EmpiricalVariogram {
    pub bins: Vec<LagBin>,
}

impl EmpiricalVariogram {
    /// Upper distance bound of the last bin
    pub fn max_lag(&self) -> f64 {
        self.bins.last().map(|b| b.distance_hi).unwrap_or(0.0)
    }

    /// Largest binned semivariance
    pub fn max_semivariance(&self) -> f64 {
        self.bins
            .iter()
            .map(|b| b.semivariance)
            .fold(0.0_f64, f64::max)
    }
}

/// Compute the empirical variogram of a sample store.
///
/// Every unordered sample pair within `max_lag` is assigned to the lag
/// bin covering its distance; per bin, semivariance is half the mean
/// squared value difference. Bins with fewer than 2 pairs are dropped.
///
/// # Errors
/// - [`Error::InvalidParameter`] on a zero `n_lags` or non-positive
///   explicit `lag_size`/`max_lag`
/// - [`Error::InsufficientSamples`] if every bin was dropped
pub fn empirical_variogram(
    store: &SampleStore,
    params: &VariogramParams,
) -> Result<EmpiricalVariogram> {
    if params.n_lags == 0 {
        return Err(Error::InvalidParameter {
            name: "n_lags",
            value: "0".into(),
            reason: "need at least one lag bin".into(),
        });
    }

    let max_lag = params.max_lag.unwrap_or_else(|| store.half_diagonal());
    if !(max_lag > 0.0) || !max_lag.is_finite() {
        return Err(Error::InvalidParameter {
            name: "max_lag",
            value: max_lag.to_string(),
            reason: "must be positive and finite".into(),
        });
    }

    let lag_size = params.lag_size.unwrap_or(max_lag / params.n_lags as f64);
    if !(lag_size > 0.0) || !lag_size.is_finite() {
        return Err(Error::InvalidParameter {
            name: "lag_size",
            value: lag_size.to_string(),
            reason: "must be positive and finite".into(),
        });
    }

    let n_bins = (max_lag / lag_size).ceil() as usize;
    let mut sq_diff_sums = vec![0.0_f64; n_bins];
    let mut pair_counts = vec![0_usize; n_bins];

    let n = store.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let d = store.distance(i, j);
            if d >= max_lag {
                continue;
            }
            let bin = (d / lag_size) as usize;
            if bin < n_bins {
                let dz = store[i].value - store[j].value;
                sq_diff_sums[bin] += dz * dz;
                pair_counts[bin] += 1;
            }
        }
    }

    let bins: Vec<LagBin> = (0..n_bins)
        .filter(|&k| pair_counts[k] >= MIN_PAIRS_PER_BIN)
        .map(|k| LagBin {
            distance_lo: k as f64 * lag_size,
            distance_hi: (k + 1) as f64 * lag_size,
            semivariance: 0.5 * sq_diff_sums[k] / pair_counts[k] as f64,
            pair_count: pair_counts[k],
        })
        .collect();

    if bins.is_empty() {
        return Err(Error::InsufficientSamples(
            "no lag bin collected at least 2 sample pairs".into(),
        ));
    }

    Ok(EmpiricalVariogram { bins })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::Sample;
    use approx::assert_relative_eq;

    /// Deterministic LCG-based field with spatial trend plus noise.
    pub(crate) fn generate_correlated(n: usize, seed: u64) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(n);
        let mut rng = seed;
        let mut next = |scale: f64| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 33) as f64 / (1u64 << 31) as f64 * scale
        };
        for _ in 0..n {
            let x = next(100.0);
            let y = next(100.0);
            let value = 0.5 * x + 0.3 * y + 10.0 * ((x / 20.0).sin() + (y / 20.0).sin());
            let noise = next(2.0) - 1.0;
            samples.push(Sample::new(x, y, value + noise));
        }
        samples
    }

    #[test]
    fn test_empirical_variogram_basic() {
        let samples = generate_correlated(100, 42);
        let store = SampleStore::new(&samples).unwrap();
        let emp = empirical_variogram(&store, &VariogramParams::default()).unwrap();

        assert!(emp.bins.len() >= 5, "expected several populated bins");
        for pair in emp.bins.windows(2) {
            assert!(pair[0].distance_lo < pair[1].distance_lo, "bins ordered");
        }
        for bin in &emp.bins {
            assert!(bin.pair_count >= 2);
            assert!(bin.semivariance >= 0.0);
        }

        // Spatially correlated data: near-distance dissimilarity is lower.
        let first = emp.bins.first().unwrap().semivariance;
        let last = emp.bins.last().unwrap().semivariance;
        assert!(
            first < last,
            "semivariance should grow with distance: first={first:.3}, last={last:.3}"
        );
    }

    #[test]
    fn test_auto_derived_lags_cover_half_diagonal() {
        let samples = generate_correlated(60, 7);
        let store = SampleStore::new(&samples).unwrap();
        let emp = empirical_variogram(&store, &VariogramParams::default()).unwrap();
        assert!(emp.max_lag() <= store.half_diagonal() + 1e-9);
    }

    #[test]
    fn test_explicit_lag_size() {
        let samples = generate_correlated(80, 11);
        let store = SampleStore::new(&samples).unwrap();
        let emp = empirical_variogram(
            &store,
            &VariogramParams {
                n_lags: 12,
                lag_size: Some(5.0),
                max_lag: Some(50.0),
            },
        )
        .unwrap();
        assert!(emp.bins.len() <= 10);
        for bin in &emp.bins {
            assert_relative_eq!(bin.distance_hi - bin.distance_lo, 5.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_all_bins_dropped_is_insufficient() {
        // Three distant samples, one pair per bin at most under a tiny max
        // lag: no bin reaches 2 pairs.
        let samples = vec![
            Sample::new(0.0, 0.0, 1.0),
            Sample::new(100.0, 0.0, 2.0),
            Sample::new(0.0, 100.0, 3.0),
        ];
        let store = SampleStore::new(&samples).unwrap();
        let err = empirical_variogram(
            &store,
            &VariogramParams {
                n_lags: 4,
                lag_size: None,
                max_lag: Some(1.0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples(_)));
    }

    #[test]
    fn test_single_pair_bins_dropped() {
        // Collinear samples: pair distances 10, 10, 20. The 20-distance
        // bin holds one pair and must be dropped.
        let samples = vec![
            Sample::new(0.0, 0.0, 1.0),
            Sample::new(10.0, 0.0, 3.0),
            Sample::new(20.0, 0.0, 2.0),
        ];
        let store = SampleStore::new(&samples).unwrap();
        let emp = empirical_variogram(
            &store,
            &VariogramParams {
                n_lags: 5,
                lag_size: Some(5.0),
                max_lag: Some(25.0),
            },
        )
        .unwrap();
        assert_eq!(emp.bins.len(), 1);
        let bin = &emp.bins[0];
        assert_eq!(bin.pair_count, 2);
        // 0.5 * mean(4, 1) = 1.25
        assert_relative_eq!(bin.semivariance, 1.25, epsilon = 1e-12);
    }
}
