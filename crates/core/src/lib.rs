//! # signalfield Core
//!
//! Core types and errors for the signalfield spatial interpolation
//! library.
//!
//! This crate provides:
//! - `GridSpec`: evaluation grid geometry
//! - `Surface`: ndarray-backed numeric field aligned with a grid
//! - `GridCell`: one streamed evaluation result
//! - `Error` / `Result`: shared error handling

pub mod error;
pub mod grid;

pub use error::{Error, Result};
pub use grid::{GridCell, GridSpec, Surface};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::grid::{GridCell, GridSpec, Surface};
}
