//! Variogram model fitting
//!
//! Fits a theoretical model to an empirical variogram by
//! Levenberg-Marquardt nonlinear least squares over (nugget, partial
//! sill, range), with a finite-difference Jacobian and non-negativity
//! clamping. Residuals may be weighted by pair count (Cressie-style), so
//! well-populated lags dominate the fit.
//!
//! Reference:
//! Cressie, N. (1985). Fitting variogram models by weighted least
//! squares. Mathematical Geology 17(5).

use serde::{Deserialize, Serialize};
use signalfield_core::{Error, Result};
use tracing::{debug, warn};

use crate::model::{ModelFamily, VariogramModel};
use crate::variogram::EmpiricalVariogram;

/// Options controlling the fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOptions {
    /// Model family to fit (default: spherical)
    pub family: ModelFamily,
    /// Weight residuals by lag-bin pair count (default: true)
    pub weight_by_pair_count: bool,
    /// Levenberg-Marquardt iteration cap (default: 200)
    pub max_iterations: usize,
    /// Fixed model substituted if the fit diverges. The substitution is
    /// reported with a warning and via [`FittedModel::fallback_used`].
    pub fallback: Option<VariogramModel>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            family: ModelFamily::Spherical,
            weight_by_pair_count: true,
            max_iterations: 200,
            fallback: None,
        }
    }
}

/// Outcome of a variogram fit
#[derive(Debug, Clone)]
pub struct FittedModel {
    /// The fitted (or substituted) model, immutable for the run
    pub model: VariogramModel,
    /// Weighted residual sum of squares against the empirical variogram
    pub rss: f64,
    /// True when the fallback model was substituted after a divergent fit
    pub fallback_used: bool,
}

/// (bin center, empirical semivariance, residual weight)
type FitData = Vec<(f64, f64, f64)>;

fn fit_data(empirical: &EmpiricalVariogram, weighted: bool) -> FitData {
    empirical
        .bins
        .iter()
        .map(|b| {
            let w = if weighted { b.pair_count as f64 } else { 1.0 };
            (b.center(), b.semivariance, w)
        })
        .collect()
}

fn weighted_rss(model: &VariogramModel, data: &FitData) -> f64 {
    data.iter()
        .map(|&(h, gamma, w)| {
            let r = model.semivariance(h) - gamma;
            w * r * r
        })
        .sum()
}

/// Fit one model family to the empirical variogram.
///
/// Initial guesses: nugget = first bin's semivariance, sill = maximum
/// empirical semivariance, range = 2/3 of the maximum lag. On divergence
/// (or a fitted sill not exceeding the nugget) the configured fallback is
/// substituted if present, otherwise [`Error::VariogramFitDivergence`] is
/// returned.
pub fn fit_model(empirical: &EmpiricalVariogram, options: &FitOptions) -> Result<FittedModel> {
    let data = fit_data(empirical, options.weight_by_pair_count);
    match fit_family(empirical, options.family, &data, options.max_iterations) {
        Ok((model, rss)) => {
            debug!(
                family = ?options.family,
                nugget = model.nugget(),
                sill = model.sill(),
                range = model.range(),
                rss,
                "variogram fit converged"
            );
            Ok(FittedModel {
                model,
                rss,
                fallback_used: false,
            })
        }
        Err(err @ Error::VariogramFitDivergence(_)) => substitute_fallback(err, options, &data),
        Err(err) => Err(err),
    }
}

/// Fit every model family and keep the lowest-RSS result.
pub fn fit_best_model(empirical: &EmpiricalVariogram, options: &FitOptions) -> Result<FittedModel> {
    let data = fit_data(empirical, options.weight_by_pair_count);
    let mut best: Option<(VariogramModel, f64)> = None;
    for family in ModelFamily::ALL {
        if let Ok((model, rss)) = fit_family(empirical, family, &data, options.max_iterations) {
            let better = best.as_ref().map(|&(_, b)| rss < b).unwrap_or(true);
            if better {
                best = Some((model, rss));
            }
        }
    }
    match best {
        Some((model, rss)) => {
            debug!(family = ?model.family(), rss, "best variogram model selected");
            Ok(FittedModel {
                model,
                rss,
                fallback_used: false,
            })
        }
        None => substitute_fallback(
            Error::VariogramFitDivergence("no model family converged".into()),
            options,
            &data,
        ),
    }
}

fn substitute_fallback(err: Error, options: &FitOptions, data: &FitData) -> Result<FittedModel> {
    let Some(fallback) = options.fallback else {
        return Err(err);
    };
    fallback.validate()?;
    warn!(
        error = %err,
        fallback = ?fallback,
        "variogram fit diverged; substituting fallback model"
    );
    Ok(FittedModel {
        model: fallback,
        rss: weighted_rss(&fallback, data),
        fallback_used: true,
    })
}

/// Levenberg-Marquardt over θ = (nugget, partial sill, range).
fn fit_family(
    empirical: &EmpiricalVariogram,
    family: ModelFamily,
    data: &FitData,
    max_iterations: usize,
) -> Result<(VariogramModel, f64)> {
    if data.len() < 3 {
        return Err(Error::VariogramFitDivergence(format!(
            "{} usable lag bin(s), need at least 3 to fit 3 parameters",
            data.len()
        )));
    }

    let max_lag = empirical.max_lag();
    let max_sv = empirical.max_semivariance();
    let range_floor = max_lag * 1e-6;

    // Standard initial-guess heuristics.
    let nugget0 = data[0].1;
    let psill0 = (max_sv - nugget0).max(0.0);
    let range0 = max_lag * 2.0 / 3.0;

    let model_at = |theta: &[f64; 3]| family.model(theta[0], theta[0] + theta[1], theta[2]);
    let rss_at = |theta: &[f64; 3]| weighted_rss(&model_at(theta), data);

    let mut theta = [nugget0, psill0, range0];
    let mut rss = rss_at(&theta);
    if !rss.is_finite() {
        return Err(Error::VariogramFitDivergence(
            "non-finite objective at initial guess".into(),
        ));
    }

    let m = data.len();
    let mut lambda = 1e-3;

    for _ in 0..max_iterations {
        // Weighted residuals and finite-difference Jacobian.
        let model = model_at(&theta);
        let residuals: Vec<f64> = data
            .iter()
            .map(|&(h, gamma, w)| w.sqrt() * (model.semivariance(h) - gamma))
            .collect();

        let mut jacobian = vec![[0.0_f64; 3]; m];
        for p in 0..3 {
            let eps = (theta[p].abs() * 1e-6).max(1e-8);
            let mut bumped = theta;
            bumped[p] += eps;
            let bumped_model = model_at(&bumped);
            for (k, &(h, _, w)) in data.iter().enumerate() {
                jacobian[k][p] =
                    w.sqrt() * (bumped_model.semivariance(h) - model.semivariance(h)) / eps;
            }
        }

        // Normal equations: (JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr
        let mut jtj = [[0.0_f64; 3]; 3];
        let mut jtr = [0.0_f64; 3];
        for k in 0..m {
            for a in 0..3 {
                jtr[a] += jacobian[k][a] * residuals[k];
                for b in 0..3 {
                    jtj[a][b] += jacobian[k][a] * jacobian[k][b];
                }
            }
        }
        let mut damped = jtj;
        for p in 0..3 {
            damped[p][p] += lambda * jtj[p][p].max(1e-12);
        }

        let Some(delta) = solve3(&damped, &jtr) else {
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
            continue;
        };

        let mut trial = [
            (theta[0] - delta[0]).max(0.0),
            (theta[1] - delta[1]).max(0.0),
            (theta[2] - delta[2]).max(range_floor),
        ];
        // Guard against a NaN step.
        if trial.iter().any(|v| !v.is_finite()) {
            trial = theta;
        }

        let trial_rss = rss_at(&trial);
        if trial_rss.is_finite() && trial_rss < rss {
            let improvement = rss - trial_rss;
            theta = trial;
            rss = trial_rss;
            lambda = (lambda * 0.1).max(1e-12);
            if improvement <= 1e-10 * rss.max(1e-30) {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                // No descent direction left: local minimum.
                break;
            }
        }
    }

    let model = model_at(&theta);
    if !rss.is_finite() {
        return Err(Error::VariogramFitDivergence(
            "objective diverged during iteration".into(),
        ));
    }
    if theta[1] <= 0.0 {
        return Err(Error::VariogramFitDivergence(format!(
            "fitted sill {} does not exceed nugget {}",
            model.sill(),
            model.nugget()
        )));
    }
    if theta[2] <= 0.0 {
        return Err(Error::VariogramFitDivergence(format!(
            "fitted range {} is not positive",
            model.range()
        )));
    }

    Ok((model, rss))
}

/// Solve a 3x3 system by Gaussian elimination with partial pivoting.
fn solve3(matrix: &[[f64; 3]; 3], rhs: &[f64; 3]) -> Option<[f64; 3]> {
    let mut a = *matrix;
    let mut b = *rhs;

    for col in 0..3 {
        let mut max_row = col;
        for row in (col + 1)..3 {
            if a[row][col].abs() > a[max_row][col].abs() {
                max_row = row;
            }
        }
        if a[max_row][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, max_row);
        b.swap(col, max_row);

        for row in (col + 1)..3 {
            let factor = a[row][col] / a[col][col];
            for j in col..3 {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0_f64; 3];
    for col in (0..3).rev() {
        let mut sum = b[col];
        for j in (col + 1)..3 {
            sum -= a[col][j] * x[j];
        }
        x[col] = sum / a[col][col];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
