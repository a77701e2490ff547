//! Grid evaluation
//!
//! Iterates an output grid, solving the factorized kriging system at
//! every cell center to fill an estimate surface and a variance surface.
//! The factorization is shared read-only, so rows are evaluated in
//! parallel with no locking; the order-preserving collect keeps the
//! output deterministic regardless of scheduling.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use signalfield_core::{Error, GridCell, GridSpec, Result, Surface};
use tracing::debug;

use crate::maybe_rayon::*;
use crate::solver::KrigingSystem;

/// The two output surfaces of one interpolation run, identical in shape.
#[derive(Debug, Clone)]
pub struct KrigingGrid {
    /// Kriging estimates per cell
    pub estimate: Surface,
    /// Kriging variance (estimation uncertainty) per cell
    pub variance: Surface,
}

/// Options for cooperative cancellation and progress reporting.
#[derive(Default)]
pub struct EvalOptions<'a> {
    /// Checked between cells; when set, evaluation stops with
    /// [`Error::Cancelled`].
    pub cancel: Option<&'a AtomicBool>,
    /// Called after each completed row with `(rows_done, rows_total)`.
    pub progress: Option<&'a (dyn Fn(usize, usize) + Sync)>,
}

/// Evaluate the full grid with default options.
pub fn evaluate_grid(system: &KrigingSystem, spec: &GridSpec) -> Result<KrigingGrid> {
    evaluate_grid_with(system, spec, &EvalOptions::default())
}

/// Evaluate the full grid, honoring cancellation and reporting progress.
///
/// # Errors
/// - [`Error::InvalidGridSpec`] before any cell is evaluated
/// - [`Error::Cancelled`] when the cancel flag is observed
pub fn evaluate_grid_with(
    system: &KrigingSystem,
    spec: &GridSpec,
    options: &EvalOptions<'_>,
) -> Result<KrigingGrid> {
    spec.validate()?;

    let rows_done = AtomicUsize::new(0);
    let rows: Vec<Result<Vec<(f64, f64)>>> = (0..spec.height)
        .into_par_iter()
        .map(|row| {
            let mut row_data = Vec::with_capacity(spec.width);
            for col in 0..spec.width {
                if let Some(cancel) = options.cancel {
                    if cancel.load(Ordering::Relaxed) {
                        return Err(Error::Cancelled);
                    }
                }
                let (x, y) = spec.cell_center(col, row);
                let prediction = system.predict(x, y);
                row_data.push((prediction.estimate, prediction.variance));
            }
            let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(progress) = options.progress {
                progress(done, spec.height);
            }
            Ok(row_data)
        })
        .collect();

    let mut estimate = Surface::filled(*spec, f64::NAN);
    let mut variance = Surface::filled(*spec, f64::NAN);
    for (row, row_result) in rows.into_iter().enumerate() {
        for (col, (e, v)) in row_result?.into_iter().enumerate() {
            estimate.set(row, col, e)?;
            variance.set(row, col, v)?;
        }
    }

    debug!(
        width = spec.width,
        height = spec.height,
        samples = system.len(),
        "grid evaluation complete"
    );
    Ok(KrigingGrid { estimate, variance })
}

/// Stream evaluated cells row-major to `sink`, cell by cell, so a
/// renderer can begin drawing before the grid completes. The sink returns
/// `false` to stop early (evaluation still ends with `Ok`).
pub fn evaluate_cells<F>(system: &KrigingSystem, spec: &GridSpec, mut sink: F) -> Result<()>
where
    F: FnMut(GridCell) -> bool,
{
    spec.validate()?;
    for row in 0..spec.height {
        for col in 0..spec.width {
            let (x, y) = spec.cell_center(col, row);
            let prediction = system.predict(x, y);
            let keep_going = sink(GridCell {
                col,
                row,
                x,
                y,
                estimate: prediction.estimate,
                variance: prediction.variance,
            });
            if !keep_going {
                return Ok(());
            }
        }
    }
    Ok(())
}
