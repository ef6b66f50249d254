//! Dense categorical property buffers attached to a grid
//!
//! A property stores one optional value per grid cell. Cells start missing
//! and become informed through cellwise writes; the buffer is never resized
//! after creation and the missing-cell tally is kept in step with every
//! mutation.

use ndarray::Array3;

use crate::io::error::{self, Result};
use crate::spatial::grid::{GridStructure, SpatialIndex};

/// Dense buffer of optional categorical values over a grid
#[derive(Debug, Clone)]
pub struct Property {
    grid: GridStructure,
    // C-order (nz, ny, nx) so the flat layout runs ix fastest
    values: Array3<Option<f32>>,
    missing_count: usize,
    name: String,
}

impl Property {
    /// Create an empty property where every cell is missing
    pub fn new(grid: GridStructure, name: impl Into<String>) -> Self {
        let shape = (grid.nz(), grid.ny(), grid.nx());
        let missing_count = grid.cell_count();
        Self {
            grid,
            values: Array3::from_elem(shape, None),
            missing_count,
            name: name.into(),
        }
    }

    /// Grid this property is attached to
    pub const fn grid(&self) -> &GridStructure {
        &self.grid
    }

    /// Property name as read from or written to GSLIB documents
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value at an index, `None` when out of bounds or missing
    pub fn get(&self, si: &SpatialIndex) -> Option<f32> {
        if !self.grid.contains(si) {
            return None;
        }
        self.values[(si.iz() as usize, si.iy() as usize, si.ix() as usize)]
    }

    /// Value at raw integer components, `None` when out of bounds or missing
    ///
    /// Bounds are checked on the raw integers so neighborhood scans can probe
    /// past the grid edge without constructing indices.
    pub fn get_raw(&self, ix: i64, iy: i64, iz: i64) -> Option<f32> {
        if ix < 0
            || iy < 0
            || iz < 0
            || ix as usize >= self.grid.nx()
            || iy as usize >= self.grid.ny()
            || iz as usize >= self.grid.nz()
        {
            return None;
        }
        self.values[(iz as usize, iy as usize, ix as usize)]
    }

    /// Value at a flat array position, `None` when missing
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` when the position exceeds the cell count.
    pub fn value_at(&self, array_index: usize) -> Result<Option<f32>> {
        let si = self.grid.spatial_index(array_index)?;
        Ok(self.get(&si))
    }

    /// Whether the cell holds a value
    pub fn is_informed(&self, si: &SpatialIndex) -> bool {
        self.get(si).is_some()
    }

    /// Write a value into a cell
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` when the index is outside the grid.
    pub fn set(&mut self, si: &SpatialIndex, value: f32) -> Result<()> {
        if !self.grid.contains(si) {
            return Err(error::out_of_range(
                si,
                &format!(
                    "grid {}x{}x{}",
                    self.grid.nx(),
                    self.grid.ny(),
                    self.grid.nz()
                ),
            ));
        }
        let slot = &mut self.values[(si.iz() as usize, si.iy() as usize, si.ix() as usize)];
        if slot.is_none() {
            self.missing_count -= 1;
        }
        *slot = Some(value);
        Ok(())
    }

    /// Number of missing cells
    pub const fn missing_count(&self) -> usize {
        self.missing_count
    }

    /// Number of informed cells
    pub const fn informed_count(&self) -> usize {
        self.grid.cell_count() - self.missing_count
    }

    /// Whether every cell is informed
    pub const fn is_complete(&self) -> bool {
        self.missing_count == 0
    }

    /// Iterate informed cells as `(array_index, value)` in array order
    pub fn informed_cells(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(idx, v)| v.map(|value| (idx, value)))
    }
}
