//! Multi-resolution simulation over coarsened grid pyramids
//!
//! The training image and the realization are both coarsened level by level
//! with a factor-two block mode. Simulation then runs coarse to fine: each
//! finished level is upsampled onto the next finer grid as soft conditioning
//! that never overwrites hard data, and the finer level is simulated on top.

use crate::algorithm::driver::{SequentialSimulator, SimulationParams};
use crate::analysis::statistics;
use crate::io::error::{self, Result};
use crate::spatial::grid::Dimensionality;
use crate::spatial::mould::Mould;
use crate::spatial::property::Property;

/// Template parameters of one pyramid level
#[derive(Debug, Clone, Copy)]
pub struct LevelSpec {
    /// Template neighbor count at this level
    pub neighbors: usize,
    /// Anisotropy ratio along x
    pub rx: f64,
    /// Anisotropy ratio along y
    pub ry: f64,
    /// Anisotropy ratio along z, ignored for planar grids
    pub rz: f64,
}

impl LevelSpec {
    /// Create a level specification
    pub const fn new(neighbors: usize, rx: f64, ry: f64, rz: f64) -> Self {
        Self {
            neighbors,
            rx,
            ry,
            rz,
        }
    }
}

/// Knobs of a multi-resolution run
#[derive(Debug, Clone)]
pub struct PyramidParams {
    /// Per-level templates, finest first, coarsest last
    pub levels: Vec<LevelSpec>,
    /// Switchover percentage handed to every level's driver
    pub switchover: f64,
    /// Seed handed to every level's driver
    pub seed: u32,
}

/// Coarse-to-fine simulator over a pyramid of grids
pub struct MultiResolutionSimulator {
    params: PyramidParams,
    show_progress: bool,
}

impl MultiResolutionSimulator {
    /// Create a simulator for a level stack
    ///
    /// # Errors
    ///
    /// Returns `PreconditionViolation` when no level is given.
    pub fn new(params: PyramidParams) -> Result<Self> {
        if params.levels.is_empty() {
            return Err(error::precondition(
                "levels",
                &0,
                &"at least one pyramid level is required",
            ));
        }
        Ok(Self {
            params,
            show_progress: false,
        })
    }

    /// Show one progress bar per level during runs
    pub fn enable_progress(&mut self) {
        self.show_progress = true;
    }

    /// Simulate the realization against the training image
    ///
    /// With a single level this is exactly the single-resolution driver.
    ///
    /// # Errors
    ///
    /// Propagates template, tree and driver failures of any level; the
    /// realization is only replaced after every level succeeded.
    pub fn run(&self, realization: &mut Property, training: &Property) -> Result<()> {
        let coarsest = self.params.levels.len() - 1;

        let mut ti_levels = vec![training.clone()];
        for _ in 0..coarsest {
            let next = coarsen_blocks(&ti_levels[ti_levels.len() - 1])?;
            ti_levels.push(next);
        }
        let mut real_levels = vec![realization.clone()];
        for _ in 0..coarsest {
            let next = coarsen_blocks(&real_levels[real_levels.len() - 1])?;
            real_levels.push(next);
        }

        let mut finished: Option<Property> = None;
        for level in (0..=coarsest).rev() {
            let level_spec = &self.params.levels[level];
            let training_level = &ti_levels[level];
            let mould = Mould::by_anisotropic_topk(
                level_spec.neighbors,
                level_spec.rx,
                level_spec.ry,
                level_spec.rz,
                1,
                training_level.grid().dims(),
            )?;

            let mut current = real_levels[level].clone();
            if let Some(coarse) = &finished {
                upsample_into(coarse, &mut current)?;
            }

            let sim_params = SimulationParams::new(self.params.switchover, self.params.seed)?;
            let mut simulator = SequentialSimulator::new(training_level, &mould, sim_params)?;
            if self.show_progress {
                simulator.enable_progress(format!(
                    "level {}/{}",
                    coarsest - level + 1,
                    coarsest + 1
                ));
            }
            simulator.run(&mut current)?;
            finished = Some(current);
        }

        if let Some(result) = finished {
            *realization = result;
        }
        Ok(())
    }
}

/// Coarsen a property by a factor-two block mode
///
/// Each coarse cell takes the mode of the present values in its source
/// block, smallest category on ties, and stays missing when the whole block
/// is missing. The z axis only shrinks for volumetric grids.
pub fn coarsen_blocks(source: &Property) -> Result<Property> {
    let grid = source.grid();
    let mut coarse = Property::new(grid.coarsened(2)?, source.name());

    let mut block = Vec::with_capacity(8);
    for icz in 0..coarse.grid().nz() {
        for icy in 0..coarse.grid().ny() {
            for icx in 0..coarse.grid().nx() {
                block.clear();
                let z_range = match grid.dims() {
                    Dimensionality::Two => 0..1,
                    Dimensionality::Three => icz * 2..(icz * 2 + 2).min(grid.nz()),
                };
                for iz in z_range {
                    for iy in icy * 2..(icy * 2 + 2).min(grid.ny()) {
                        for ix in icx * 2..(icx * 2 + 2).min(grid.nx()) {
                            if let Some(value) =
                                source.get_raw(ix as i64, iy as i64, iz as i64)
                            {
                                block.push(value);
                            }
                        }
                    }
                }
                if let Some(mode) = statistics::block_mode(&block) {
                    let si =
                        coarse
                            .grid()
                            .spatial_index_at(icx as i64, icy as i64, icz as i64);
                    coarse.set(&si, mode)?;
                }
            }
        }
    }
    Ok(coarse)
}

/// Write coarse values onto a finer grid through the loose block-center map
///
/// Each coarse cell lands on the fine cell `floor((i + 0.5) * fine/coarse)`
/// per axis and only fills cells that are still missing, so hard data is
/// never overwritten.
pub fn upsample_into(coarse: &Property, fine: &mut Property) -> Result<()> {
    let sx = fine.grid().nx() as f64 / coarse.grid().nx() as f64;
    let sy = fine.grid().ny() as f64 / coarse.grid().ny() as f64;
    let sz = fine.grid().nz() as f64 / coarse.grid().nz() as f64;

    let targets: Vec<(usize, f32)> = coarse.informed_cells().collect();
    for (idx, value) in targets {
        let csi = coarse.grid().spatial_index(idx)?;
        let fx = ((csi.ix() as f64 + 0.5) * sx).floor() as i64;
        let fy = ((csi.iy() as f64 + 0.5) * sy).floor() as i64;
        let fz = match fine.grid().dims() {
            Dimensionality::Two => 0,
            Dimensionality::Three => ((csi.iz() as f64 + 0.5) * sz).floor() as i64,
        };
        let fsi = fine.grid().spatial_index_at(fx, fy, fz);
        if fine.grid().contains(&fsi) && !fine.is_informed(&fsi) {
            fine.set(&fsi, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::grid::{GridStructure, SpatialIndex};

    fn quadrant_property() -> Property {
        // 4x4 grid whose 2x2 blocks are constant
        let grid = GridStructure::new_2d(4, 4, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut prop = Property::new(grid, "ti");
        for idx in 0..prop.grid().cell_count() {
            let si = prop.grid().spatial_index(idx).unwrap();
            let value = ((si.ix() / 2) + 2 * (si.iy() / 2)) as f32;
            prop.set(&si, value).unwrap();
        }
        prop
    }

    #[test]
    fn block_mode_downsampling_keeps_constant_blocks() {
        let coarse = coarsen_blocks(&quadrant_property()).unwrap();

        assert_eq!((coarse.grid().nx(), coarse.grid().ny()), (2, 2));
        assert_eq!(coarse.get(&SpatialIndex::new_2d(0, 0)), Some(0.0));
        assert_eq!(coarse.get(&SpatialIndex::new_2d(1, 0)), Some(1.0));
        assert_eq!(coarse.get(&SpatialIndex::new_2d(0, 1)), Some(2.0));
        assert_eq!(coarse.get(&SpatialIndex::new_2d(1, 1)), Some(3.0));
    }

    #[test]
    fn empty_blocks_stay_missing() {
        let grid = GridStructure::new_2d(4, 4, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut sparse = Property::new(grid, "hard");
        sparse.set(&SpatialIndex::new_2d(0, 0), 5.0).unwrap();

        let coarse = coarsen_blocks(&sparse).unwrap();
        assert_eq!(coarse.get(&SpatialIndex::new_2d(0, 0)), Some(5.0));
        assert_eq!(coarse.get(&SpatialIndex::new_2d(1, 1)), None);
        assert_eq!(coarse.missing_count(), 3);
    }

    #[test]
    fn upsampling_never_overwrites_informed_cells() {
        let coarse_grid = GridStructure::new_2d(2, 2, 2.0, 2.0, 0.5, 0.5).unwrap();
        let mut coarse = Property::new(coarse_grid, "coarse");
        for idx in 0..4 {
            let si = coarse.grid().spatial_index(idx).unwrap();
            coarse.set(&si, 9.0).unwrap();
        }

        let fine_grid = GridStructure::new_2d(4, 4, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut fine = Property::new(fine_grid, "fine");
        // Hard datum at the landing cell of coarse (0, 0)
        fine.set(&SpatialIndex::new_2d(1, 1), 4.0).unwrap();

        upsample_into(&coarse, &mut fine).unwrap();
        assert_eq!(fine.get(&SpatialIndex::new_2d(1, 1)), Some(4.0));
        assert_eq!(fine.get(&SpatialIndex::new_2d(3, 1)), Some(9.0));
        assert_eq!(fine.get(&SpatialIndex::new_2d(1, 3)), Some(9.0));
        assert_eq!(fine.get(&SpatialIndex::new_2d(3, 3)), Some(9.0));
        // Cells between landing sites stay untouched
        assert_eq!(fine.get(&SpatialIndex::new_2d(0, 0)), None);
    }

    #[test]
    fn constant_regions_stabilize_after_one_coarsening_round() {
        let grid = GridStructure::new_2d(4, 4, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut constant = Property::new(grid, "flat");
        for idx in 0..constant.grid().cell_count() {
            let si = constant.grid().spatial_index(idx).unwrap();
            constant.set(&si, 2.0).unwrap();
        }

        let round = |fine: &Property| {
            let coarse = coarsen_blocks(fine).unwrap();
            let mut rebuilt = Property::new(fine.grid().clone(), fine.name());
            upsample_into(&coarse, &mut rebuilt).unwrap();
            rebuilt
        };

        let once = round(&constant);
        let twice = round(&once);
        let collect = |p: &Property| p.informed_cells().collect::<Vec<_>>();
        assert_eq!(collect(&once), collect(&twice));
        assert!(once.informed_cells().all(|(_, v)| v == 2.0));
    }

    #[test]
    fn an_empty_level_stack_is_rejected() {
        let params = PyramidParams {
            levels: Vec::new(),
            switchover: 50.0,
            seed: 1,
        };
        assert!(MultiResolutionSimulator::new(params).is_err());
    }

    #[test]
    fn two_level_runs_complete_and_keep_hard_data() {
        let ti = quadrant_property();
        let params = PyramidParams {
            levels: vec![LevelSpec::new(4, 1.0, 1.0, 1.0), LevelSpec::new(4, 1.0, 1.0, 1.0)],
            switchover: 80.0,
            seed: 21,
        };
        let simulator = MultiResolutionSimulator::new(params).unwrap();

        let grid = GridStructure::new_2d(8, 8, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut realization = Property::new(grid, "sim");
        let pinned = SpatialIndex::new_2d(5, 5);
        realization.set(&pinned, 3.0).unwrap();

        simulator.run(&mut realization, &ti).unwrap();
        assert!(realization.is_complete());
        assert_eq!(realization.get(&pinned), Some(3.0));
    }
}
