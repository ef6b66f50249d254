//! Multiple-point statistical simulation of categorical grids
//!
//! A search tree indexes every neighborhood pattern of a categorical
//! training image. A sequential driver then fills a simulation grid along a
//! shuffled path, sampling each cell from the distribution of training
//! cores compatible with its current neighborhood, optionally across a
//! pyramid of grid resolutions.

#![forbid(unsafe_code)]

/// Pattern tree, retrieval structures and the simulation drivers
pub mod algorithm;
/// Statistical summaries of categorical grids
pub mod analysis;
/// Input/output operations and error handling
pub mod io;
/// Random source and discrete sampling
pub mod math;
/// Grid geometry, property buffers and neighborhood templates
pub mod spatial;

pub use io::error::{Result, SimulationError};
