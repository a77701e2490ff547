//! Deduplicated sample storage
//!
//! A [`SampleStore`] holds the immutable set of observations for one
//! interpolation run. Locations closer together than a merge tolerance
//! are collapsed into a single sample whose value is the average of the
//! merged measurements; this happens once, on construction, and keeps the
//! covariance matrix away from exact-duplicate singularity.

use signalfield_core::{Error, Result};
use tracing::debug;

use crate::Sample;

/// Minimum number of distinct locations needed to fit a variogram.
pub const MIN_SAMPLES: usize = 3;

/// Default merge tolerance: locations closer than this are considered
/// the same measurement site.
pub const DEFAULT_MERGE_TOLERANCE: f64 = 1e-6;

/// Immutable, deduplicated collection of samples for one run.
#[derive(Debug, Clone)]
pub struct SampleStore {
    samples: Vec<Sample>,
}

impl SampleStore {
    /// Build a store from raw observations, merging near-duplicates.
    ///
    /// Samples within `merge_tolerance` of an already-kept location are
    /// folded into it by running average. Insertion order decides which
    /// location survives as the representative.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] on non-finite coordinates/values or a
    ///   negative tolerance
    /// - [`Error::InsufficientSamples`] if fewer than [`MIN_SAMPLES`]
    ///   distinct locations remain
    pub fn from_samples(input: &[Sample], merge_tolerance: f64) -> Result<Self> {
        if !(merge_tolerance >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "merge_tolerance",
                value: merge_tolerance.to_string(),
                reason: "must be non-negative".into(),
            });
        }

        let mut merged: Vec<(Sample, usize)> = Vec::with_capacity(input.len());
        for sample in input {
            if !sample.x.is_finite() || !sample.y.is_finite() || !sample.value.is_finite() {
                return Err(Error::InvalidParameter {
                    name: "samples",
                    value: format!("({}, {}, {})", sample.x, sample.y, sample.value),
                    reason: "non-finite coordinate or value".into(),
                });
            }
            match merged
                .iter_mut()
                .find(|(kept, _)| kept.dist(sample.x, sample.y) < merge_tolerance)
            {
                Some((kept, count)) => {
                    *count += 1;
                    kept.value += (sample.value - kept.value) / *count as f64;
                }
                None => merged.push((*sample, 1)),
            }
        }

        if merged.len() < MIN_SAMPLES {
            return Err(Error::InsufficientSamples(format!(
                "{} distinct location(s) after merging, need at least {}",
                merged.len(),
                MIN_SAMPLES
            )));
        }

        if merged.len() < input.len() {
            debug!(
                raw = input.len(),
                distinct = merged.len(),
                "merged near-duplicate sample locations"
            );
        }

        Ok(Self {
            samples: merged.into_iter().map(|(s, _)| s).collect(),
        })
    }

    /// Build with [`DEFAULT_MERGE_TOLERANCE`].
    pub fn new(input: &[Sample]) -> Result<Self> {
        Self::from_samples(input, DEFAULT_MERGE_TOLERANCE)
    }

    /// Number of distinct samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: construction guarantees at least [`MIN_SAMPLES`].
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate the samples in storage order
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// The samples as a slice
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// Measurement values in storage order
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    /// Euclidean distance between samples `i` and `j`
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.samples[i].dist(self.samples[j].x, self.samples[j].y)
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of the sample locations
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for s in &self.samples {
            min_x = min_x.min(s.x);
            min_y = min_y.min(s.y);
            max_x = max_x.max(s.x);
            max_y = max_y.max(s.y);
        }
        (min_x, min_y, max_x, max_y)
    }

    /// Half the diagonal of the bounding box. Default maximum lag for the
    /// empirical variogram.
    pub fn half_diagonal(&self) -> f64 {
        let (min_x, min_y, max_x, max_y) = self.bounds();
        let dx = max_x - min_x;
        let dy = max_y - min_y;
        0.5 * (dx * dx + dy * dy).sqrt()
    }
}

impl std::ops::Index<usize> for SampleStore {
    type Output = Sample;

    fn index(&self, index: usize) -> &Sample {
        &self.samples[index]
    }
}
