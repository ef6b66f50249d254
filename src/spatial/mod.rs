//! Spatial data structures shared by every simulation stage
//!
//! This module contains the geometric vocabulary of the system:
//! - Regular grid descriptors and discrete indexing
//! - Dense categorical property buffers
//! - Neighborhood templates with distance-ordered offsets

/// Grid geometry and discrete spatial indexing
pub mod grid;
/// Neighborhood templates
pub mod mould;
/// Dense categorical property buffers
pub mod property;

pub use grid::{Coord, Dimensionality, GridStructure, SpatialIndex};
pub use mould::Mould;
pub use property::Property;
