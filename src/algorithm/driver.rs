//! Single-resolution sequential simulation
//!
//! The driver walks a shuffled path over the realization, assembles the data
//! event at each uninformed cell, retrieves a conditional distribution from
//! the pattern tree and samples the cell's category. Early in the path the
//! reverse index answers (events are sparse, far observations dominate);
//! past the switchover percentage the forward frontier walk takes over.

use crate::algorithm::path::SimulationPath;
use crate::algorithm::reverse::ReverseIndex;
use crate::algorithm::tree::SearchTree;
use crate::analysis::statistics;
use crate::io::configuration::MIN_REPLICATES;
use crate::io::error::{self, Result};
use crate::io::progress::SimulationProgress;
use crate::math::random::RandomSource;
use crate::math::sampling::sample_cdf;
use crate::spatial::mould::{GatherOutcome, Mould};
use crate::spatial::property::Property;

/// Knobs of a single-resolution run
#[derive(Debug, Clone, Copy)]
pub struct SimulationParams {
    /// Path percentage at or below which retrieval starts at the farthest
    /// observed neighbor
    pub switchover: f64,
    /// Seed of the run's only random source
    pub seed: u32,
    /// Replicate total a retrieval must exceed to yield a distribution
    pub min_replicates: u64,
}

impl SimulationParams {
    /// Create parameters with the default replicate minimum
    ///
    /// # Errors
    ///
    /// Returns `PreconditionViolation` when the switchover percentage is
    /// outside `[0, 100]`.
    pub fn new(switchover: f64, seed: u32) -> Result<Self> {
        if !(0.0..=100.0).contains(&switchover) {
            return Err(error::precondition(
                "switchover",
                &switchover,
                &"must be a percentage in [0, 100]",
            ));
        }
        Ok(Self {
            switchover,
            seed,
            min_replicates: MIN_REPLICATES,
        })
    }
}

/// Sequential simulator over one resolution level
///
/// Owns the pattern tree, the reverse index and the training image's global
/// category distribution; the realization is borrowed per run so one
/// simulator can fill several grids against the same training image.
pub struct SequentialSimulator<'a> {
    mould: &'a Mould,
    tree: SearchTree,
    reverse: ReverseIndex,
    global_pdf: Vec<(i32, f64)>,
    params: SimulationParams,
    progress: Option<SimulationProgress>,
}

impl<'a> SequentialSimulator<'a> {
    /// Index the training image and derive its global distribution
    ///
    /// # Errors
    ///
    /// Returns `TooManyCategories` from tree construction and
    /// `PreconditionViolation` for a training image with no informed cells.
    pub fn new(training: &Property, mould: &'a Mould, params: SimulationParams) -> Result<Self> {
        let tree = SearchTree::build(mould, training)?;
        let reverse = ReverseIndex::build(&tree);
        let global_pdf = statistics::global_pdf(training);
        if global_pdf.is_empty() {
            return Err(error::precondition(
                "training",
                &training.name(),
                &"training image has no informed cells",
            ));
        }
        Ok(Self {
            mould,
            tree,
            reverse,
            global_pdf,
            params,
            progress: None,
        })
    }

    /// Show a progress bar for subsequent runs
    pub fn enable_progress(&mut self, label: impl Into<String>) {
        self.progress = Some(SimulationProgress::new(label));
    }

    /// Fill every uninformed cell of the realization
    ///
    /// Pre-informed cells are frozen up front and never mutated. The random
    /// source is consumed in a fixed order: path shuffle first, then one
    /// draw per simulated cell in visit order, so a seed fully determines
    /// the output.
    ///
    /// # Errors
    ///
    /// Propagates sampler precondition failures; the realization may be
    /// partially filled in that case and the progress bar, when enabled,
    /// ends on a failure marker.
    pub fn run(&mut self, realization: &mut Property) -> Result<()> {
        let result = self.run_inner(realization);
        if let Some(progress) = &self.progress {
            match &result {
                Ok(()) => progress.finish(),
                Err(_) => progress.fail(),
            }
        }
        result
    }

    fn run_inner(&mut self, realization: &mut Property) -> Result<()> {
        if realization.grid().dims() != self.mould.dims() {
            return Err(crate::io::error::SimulationError::GridDimensionMismatch {
                left: realization.grid().dims().label(),
                right: self.mould.dims().label(),
                operation: "simulation",
            });
        }
        let mut rng = RandomSource::new(self.params.seed);
        let mut path = SimulationPath::full(realization.grid(), &mut rng);

        let informed: Vec<usize> = realization.informed_cells().map(|(idx, _)| idx).collect();
        for idx in informed {
            let si = realization.grid().spatial_index(idx)?;
            path.freeze(&si);
        }

        let mut buffer = vec![None; self.mould.len()];
        let mut event = vec![None; self.mould.len()];
        loop {
            // The branch choice must see the share frozen before this cell,
            // otherwise the final cell always reads 100% and flips forward
            let progress_before = path.progress();
            let Some(si) = path.visit_next() else { break };
            if realization.is_informed(&si) {
                continue;
            }

            let outcome = self.mould.gather(&si, realization, &mut buffer);
            let cpdf = self.conditional_pdf(&outcome, &buffer, &mut event, progress_before);
            let draw = rng.next_unit_double();
            let category = sample_cdf(&cpdf, draw)?;
            realization.set(&si, category as f32)?;

            if let Some(progress) = &self.progress {
                progress.update(path.progress());
            }
        }
        Ok(())
    }

    fn conditional_pdf(
        &self,
        outcome: &GatherOutcome,
        buffer: &[Option<f32>],
        event: &mut [Option<i32>],
        progress: f64,
    ) -> Vec<(i32, f64)> {
        if !outcome.any_informed {
            return self.global_pdf.clone();
        }
        for (slot, value) in buffer.iter().enumerate() {
            event[slot] = value.map(statistics::category_of);
        }

        let aggregate = if progress <= self.params.switchover {
            self.reverse
                .retrieve_reverse(&self.tree, event, self.params.min_replicates)
        } else {
            self.tree.retrieve_forward(event, self.params.min_replicates)
        };

        match aggregate {
            Some(counts) => self
                .tree
                .categories()
                .iter()
                .zip(counts)
                .map(|(&category, count)| (category, count as f64))
                .collect(),
            None => self.global_pdf.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::grid::{Dimensionality, GridStructure, SpatialIndex};

    fn constant_training(n: usize, category: f32) -> Property {
        let grid = GridStructure::new_2d(n, n, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut prop = Property::new(grid, "ti");
        for idx in 0..prop.grid().cell_count() {
            let si = prop.grid().spatial_index(idx).unwrap();
            prop.set(&si, category).unwrap();
        }
        prop
    }

    fn cross_mould() -> Mould {
        Mould::by_anisotropic_topk(4, 1.0, 1.0, 1.0, 1, Dimensionality::Two).unwrap()
    }

    #[test]
    fn degenerate_training_image_fills_with_its_only_category() {
        let ti = constant_training(3, 1.0);
        let mould = cross_mould();
        let params = SimulationParams::new(50.0, 9).unwrap();
        let mut simulator = SequentialSimulator::new(&ti, &mould, params).unwrap();

        let grid = GridStructure::new_2d(5, 5, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut realization = Property::new(grid, "sim");
        simulator.run(&mut realization).unwrap();

        assert!(realization.is_complete());
        for (_, value) in realization.informed_cells() {
            assert_eq!(value, 1.0);
        }
    }

    #[test]
    fn hard_data_survives_the_run() {
        let ti = constant_training(4, 2.0);
        let mould = cross_mould();
        let params = SimulationParams::new(50.0, 11).unwrap();
        let mut simulator = SequentialSimulator::new(&ti, &mould, params).unwrap();

        let grid = GridStructure::new_2d(6, 6, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut realization = Property::new(grid, "sim");
        // A conditioning value outside the training category set is kept as-is
        let pinned = SpatialIndex::new_2d(3, 3);
        realization.set(&pinned, 7.0).unwrap();

        simulator.run(&mut realization).unwrap();
        assert!(realization.is_complete());
        assert_eq!(realization.get(&pinned), Some(7.0));
    }

    #[test]
    fn runs_are_deterministic_per_seed() {
        let ti = constant_training(4, 1.0);
        let mould = cross_mould();

        let run = |seed: u32| {
            let params = SimulationParams::new(95.0, seed).unwrap();
            let mut simulator = SequentialSimulator::new(&ti, &mould, params).unwrap();
            let grid = GridStructure::new_2d(8, 8, 1.0, 1.0, 0.0, 0.0).unwrap();
            let mut realization = Property::new(grid, "sim");
            simulator.run(&mut realization).unwrap();
            realization
                .informed_cells()
                .map(|(idx, v)| (idx, v.to_bits()))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(123), run(123));
    }

    #[test]
    fn switchover_must_be_a_percentage() {
        assert!(SimulationParams::new(-1.0, 0).is_err());
        assert!(SimulationParams::new(100.5, 0).is_err());
        assert!(SimulationParams::new(0.0, 0).is_ok());
        assert!(SimulationParams::new(100.0, 0).is_ok());
    }
}
