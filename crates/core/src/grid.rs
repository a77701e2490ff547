//! Output grid types
//!
//! A [`GridSpec`] describes the evaluation lattice requested by the caller
//! (origin, cell size, dimensions); a [`Surface`] is one numeric field
//! aligned with that lattice. The kriging evaluator produces two surfaces
//! of identical shape, estimate and variance, which a renderer consumes.

use crate::error::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Specification of a rectangular evaluation grid in planar coordinates.
///
/// The origin is the lower-left corner of the grid. Cell `(col, row)`
/// covers the square starting at `origin + (col, row) * cell_size`, and
/// is evaluated at its center:
/// ```text
/// x = origin_x + (col + 0.5) * cell_size
/// y = origin_y + (row + 0.5) * cell_size
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// X coordinate of the lower-left corner
    pub origin_x: f64,
    /// Y coordinate of the lower-left corner
    pub origin_y: f64,
    /// Cell edge length (square cells)
    pub cell_size: f64,
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
}

impl GridSpec {
    /// Create a new grid spec
    pub fn new(origin_x: f64, origin_y: f64, cell_size: f64, width: usize, height: usize) -> Self {
        Self {
            origin_x,
            origin_y,
            cell_size,
            width,
            height,
        }
    }

    /// Build the smallest grid at `cell_size` resolution covering the
    /// given bounding box.
    pub fn from_bounds(
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        cell_size: f64,
    ) -> Result<Self> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(Error::InvalidGridSpec {
                width: 0,
                height: 0,
                cell_size,
                reason: "cell size must be positive and finite",
            });
        }
        if max_x <= min_x || max_y <= min_y {
            return Err(Error::InvalidParameter {
                name: "bounds",
                value: format!("({min_x}, {min_y}) .. ({max_x}, {max_y})"),
                reason: "max must exceed min in both axes".into(),
            });
        }
        let width = ((max_x - min_x) / cell_size).ceil() as usize;
        let height = ((max_y - min_y) / cell_size).ceil() as usize;
        Ok(Self::new(min_x, min_y, cell_size, width.max(1), height.max(1)))
    }

    /// Check the spec before evaluation begins.
    ///
    /// # Errors
    /// [`Error::InvalidGridSpec`] on non-positive/non-finite cell size,
    /// zero dimensions, or a non-finite origin.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason| Error::InvalidGridSpec {
            width: self.width,
            height: self.height,
            cell_size: self.cell_size,
            reason,
        };
        if !(self.cell_size > 0.0) || !self.cell_size.is_finite() {
            return Err(invalid("cell size must be positive and finite"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(invalid("grid dimensions must be non-zero"));
        }
        if !self.origin_x.is_finite() || !self.origin_y.is_finite() {
            return Err(invalid("origin must be finite"));
        }
        Ok(())
    }

    /// Coordinates of the center of cell `(col, row)`
    #[inline]
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.cell_size,
            self.origin_y + (row as f64 + 0.5) * self.cell_size,
        )
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// True when the grid has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of the full grid
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.origin_x,
            self.origin_y,
            self.origin_x + self.width as f64 * self.cell_size,
            self.origin_y + self.height as f64 * self.cell_size,
        )
    }
}

/// One evaluated grid cell, as streamed by the cell-by-cell evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    /// Column index
    pub col: usize,
    /// Row index
    pub row: usize,
    /// X coordinate of the cell center
    pub x: f64,
    /// Y coordinate of the cell center
    pub y: f64,
    /// Kriging estimate at the cell center
    pub estimate: f64,
    /// Kriging variance at the cell center (>= 0)
    pub variance: f64,
}

/// A numeric field aligned with a [`GridSpec`].
///
/// Values are stored in a `(height, width)` array indexed `(row, col)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    data: Array2<f64>,
    spec: GridSpec,
}

impl Surface {
    /// Create a surface filled with a constant value
    pub fn filled(spec: GridSpec, value: f64) -> Self {
        Self {
            data: Array2::from_elem((spec.height, spec.width), value),
            spec,
        }
    }

    /// Create a surface from row-major data
    pub fn from_vec(spec: GridSpec, data: Vec<f64>) -> Result<Self> {
        if data.len() != spec.len() {
            return Err(Error::InvalidParameter {
                name: "data",
                value: data.len().to_string(),
                reason: format!("expected {} values for the grid", spec.len()),
            });
        }
        let array = Array2::from_shape_vec((spec.height, spec.width), data)
            .map_err(|e| Error::InvalidParameter {
                name: "data",
                value: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { data: array, spec })
    }

    /// Grid spec this surface is aligned with
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Value at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set the value at `(row, col)`
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let (rows, cols) = (self.rows(), self.cols());
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows,
                cols,
            }),
        }
    }

    /// Underlying array
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Mutable access to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Minimum and maximum finite values, or `None` if no cell is finite.
    /// Renderers use this for color-scale normalization.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in self.data.iter() {
            if v.is_finite() {
                min = min.min(v);
                max = max.max(v);
            }
        }
        if min <= max {
            Some((min, max))
        } else {
            None
        }
    }
}
