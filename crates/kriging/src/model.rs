//! Theoretical variogram models
//!
//! Each model maps separation distance h to semivariance γ(h), described
//! by a nugget (γ at h → 0), a sill (the plateau), and a range (distance
//! at which the plateau is reached). Model selection is an explicit
//! enumeration: each variant carries its parameters and its own pure
//! distance → semivariance function.

use serde::{Deserialize, Serialize};
use signalfield_core::{Error, Result};

/// Model family, used to pick which variant the fitter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelFamily {
    Spherical,
    Exponential,
    Gaussian,
    Linear,
}

impl ModelFamily {
    /// All supported families, in the order tried by `fit_best_model`.
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::Spherical,
        ModelFamily::Exponential,
        ModelFamily::Gaussian,
        ModelFamily::Linear,
    ];

    /// Construct a model of this family with the given parameters.
    pub fn model(self, nugget: f64, sill: f64, range: f64) -> VariogramModel {
        match self {
            ModelFamily::Spherical => VariogramModel::Spherical { nugget, sill, range },
            ModelFamily::Exponential => VariogramModel::Exponential { nugget, sill, range },
            ModelFamily::Gaussian => VariogramModel::Gaussian { nugget, sill, range },
            ModelFamily::Linear => VariogramModel::Linear { nugget, sill, range },
        }
    }
}

/// A fitted (or manually chosen) theoretical variogram.
///
/// Parameter constraints, checked by [`VariogramModel::validate`]:
/// `nugget >= 0`, `sill > nugget`, `range > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VariogramModel {
    /// γ(h) = c₀ + c·[1.5(h/a) − 0.5(h/a)³] for h ≤ a; c₀ + c beyond
    Spherical { nugget: f64, sill: f64, range: f64 },
    /// γ(h) = c₀ + c·[1 − exp(−3h/a)]
    Exponential { nugget: f64, sill: f64, range: f64 },
    /// γ(h) = c₀ + c·[1 − exp(−3h²/a²)]
    Gaussian { nugget: f64, sill: f64, range: f64 },
    /// γ(h) = c₀ + c·(h/a) for h ≤ a; c₀ + c beyond
    Linear { nugget: f64, sill: f64, range: f64 },
}

impl VariogramModel {
    /// Family of this model
    pub fn family(&self) -> ModelFamily {
        match self {
            VariogramModel::Spherical { .. } => ModelFamily::Spherical,
            VariogramModel::Exponential { .. } => ModelFamily::Exponential,
            VariogramModel::Gaussian { .. } => ModelFamily::Gaussian,
            VariogramModel::Linear { .. } => ModelFamily::Linear,
        }
    }

    /// Nugget c₀: semivariance as h → 0⁺
    pub fn nugget(&self) -> f64 {
        match *self {
            VariogramModel::Spherical { nugget, .. }
            | VariogramModel::Exponential { nugget, .. }
            | VariogramModel::Gaussian { nugget, .. }
            | VariogramModel::Linear { nugget, .. } => nugget,
        }
    }

    /// Sill: the semivariance plateau
    pub fn sill(&self) -> f64 {
        match *self {
            VariogramModel::Spherical { sill, .. }
            | VariogramModel::Exponential { sill, .. }
            | VariogramModel::Gaussian { sill, .. }
            | VariogramModel::Linear { sill, .. } => sill,
        }
    }

    /// Range a: distance beyond which samples are effectively uncorrelated
    pub fn range(&self) -> f64 {
        match *self {
            VariogramModel::Spherical { range, .. }
            | VariogramModel::Exponential { range, .. }
            | VariogramModel::Gaussian { range, .. }
            | VariogramModel::Linear { range, .. } => range,
        }
    }

    /// Check the parameter constraints.
    pub fn validate(&self) -> Result<()> {
        let (nugget, sill, range) = (self.nugget(), self.sill(), self.range());
        let reject = |reason: String| Error::InvalidParameter {
            name: "variogram_model",
            value: format!("{self:?}"),
            reason,
        };
        if !nugget.is_finite() || nugget < 0.0 {
            return Err(reject(format!("nugget must be >= 0, got {nugget}")));
        }
        if !sill.is_finite() || sill <= nugget {
            return Err(reject(format!(
                "sill must exceed nugget, got sill {sill} vs nugget {nugget}"
            )));
        }
        if !range.is_finite() || range <= 0.0 {
            return Err(reject(format!("range must be positive, got {range}")));
        }
        Ok(())
    }

    /// Semivariance γ(h). γ(0) = 0 by convention; the nugget is the limit
    /// from the right.
    pub fn semivariance(&self, h: f64) -> f64 {
        if h < 1e-15 {
            return 0.0;
        }
        let c0 = self.nugget();
        let c = self.sill() - c0;
        let a = self.range();
        match self {
            VariogramModel::Spherical { .. } => {
                if h >= a {
                    c0 + c
                } else {
                    let hr = h / a;
                    c0 + c * (1.5 * hr - 0.5 * hr * hr * hr)
                }
            }
            VariogramModel::Exponential { .. } => c0 + c * (1.0 - (-3.0 * h / a).exp()),
            VariogramModel::Gaussian { .. } => c0 + c * (1.0 - (-3.0 * h * h / (a * a)).exp()),
            VariogramModel::Linear { .. } => {
                if h >= a {
                    c0 + c
                } else {
                    c0 + c * h / a
                }
            }
        }
    }

    /// Covariance C(h) = sill − γ(h) for the stationary, isotropic model.
    #[inline]
    pub fn covariance(&self, h: f64) -> f64 {
        self.sill() - self.semivariance(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spherical_shape() {
        let model = ModelFamily::Spherical.model(1.0, 10.0, 50.0);

        assert_relative_eq!(model.semivariance(0.0), 0.0);
        assert_relative_eq!(model.semivariance(50.0), 10.0, epsilon = 1e-12);
        assert_relative_eq!(model.semivariance(100.0), 10.0, epsilon = 1e-12);

        let mid = model.semivariance(25.0);
        assert!(mid > 1.0 && mid < 10.0, "mid-range γ out of bounds: {mid}");
    }

    #[test]
    fn test_exponential_near_sill_at_range() {
        let model = ModelFamily::Exponential.model(0.0, 10.0, 30.0);
        assert_relative_eq!(model.semivariance(0.0), 0.0);
        let at_range = model.semivariance(30.0);
        assert!(
            at_range > 9.0 && at_range < 10.0,
            "expected ~95% of sill at range, got {at_range:.3}"
        );
    }

    #[test]
    fn test_gaussian_parabolic_origin() {
        let model = ModelFamily::Gaussian.model(0.0, 10.0, 30.0);
        // Near-origin growth is quadratic, so γ at small h is tiny.
        assert!(model.semivariance(1.0) < 0.05);
        assert!(model.semivariance(60.0) > 9.9);
    }

    #[test]
    fn test_linear_ramp() {
        let model = ModelFamily::Linear.model(2.0, 12.0, 40.0);
        assert_relative_eq!(model.semivariance(20.0), 7.0, epsilon = 1e-12);
        assert_relative_eq!(model.semivariance(40.0), 12.0, epsilon = 1e-12);
        assert_relative_eq!(model.semivariance(80.0), 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_complements_semivariance() {
        let model = ModelFamily::Spherical.model(0.5, 8.0, 25.0);
        for h in [0.0, 1.0, 10.0, 25.0, 50.0] {
            assert_relative_eq!(
                model.covariance(h) + model.semivariance(h),
                model.sill(),
                epsilon = 1e-12
            );
        }
        // Beyond the range, covariance vanishes.
        assert_relative_eq!(model.covariance(30.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_validate() {
        assert!(ModelFamily::Spherical.model(0.0, 1.0, 10.0).validate().is_ok());
        assert!(ModelFamily::Spherical.model(-0.1, 1.0, 10.0).validate().is_err());
        assert!(ModelFamily::Spherical.model(1.0, 1.0, 10.0).validate().is_err());
        assert!(ModelFamily::Spherical.model(0.0, 1.0, 0.0).validate().is_err());
        assert!(ModelFamily::Spherical.model(0.0, f64::NAN, 10.0).validate().is_err());
    }
}
