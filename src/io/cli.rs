//! Command-line surface for simulation runs

use std::path::PathBuf;

use clap::Parser;

use crate::algorithm::pyramid::{LevelSpec, MultiResolutionSimulator, PyramidParams};
use crate::io::conditional::{project_records, read_records};
use crate::io::configuration::{
    DEFAULT_NEIGHBORS, DEFAULT_SEED, DEFAULT_SENTINEL, DEFAULT_SWITCHOVER,
};
use crate::io::error::{self, Result, SimulationError};
use crate::io::gslib::{read_grid, write_grid, Delimiter};
use crate::spatial::grid::GridStructure;
use crate::spatial::property::Property;

#[derive(Parser)]
#[command(name = "snesim")]
#[command(
    author,
    version,
    about = "Simulate a categorical grid from a training image"
)]
/// Command-line arguments for the simulation tool
pub struct Cli {
    /// Training image GSLIB file
    #[arg(value_name = "TRAINING")]
    pub training: PathBuf,

    /// Output GSLIB file for the simulated property
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Training grid cells along x
    #[arg(long, value_name = "N")]
    pub ti_nx: usize,

    /// Training grid cells along y
    #[arg(long, value_name = "N")]
    pub ti_ny: usize,

    /// Training grid cells along z (1 for planar grids)
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub ti_nz: usize,

    /// Simulation grid cells along x
    #[arg(long, value_name = "N")]
    pub nx: usize,

    /// Simulation grid cells along y
    #[arg(long, value_name = "N")]
    pub ny: usize,

    /// Simulation grid cells along z (1 for planar grids)
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub nz: usize,

    /// Cell size along x
    #[arg(long, default_value_t = 1.0)]
    pub sx: f64,

    /// Cell size along y
    #[arg(long, default_value_t = 1.0)]
    pub sy: f64,

    /// Cell size along z
    #[arg(long, default_value_t = 1.0)]
    pub sz: f64,

    /// Center of the first cell along x
    #[arg(long, default_value_t = 0.0)]
    pub x0: f64,

    /// Center of the first cell along y
    #[arg(long, default_value_t = 0.0)]
    pub y0: f64,

    /// Center of the first cell along z
    #[arg(long, default_value_t = 0.0)]
    pub z0: f64,

    /// Pyramid level as K,RX,RY,RZ, repeated per level, finest first
    #[arg(long = "level", value_name = "K,RX,RY,RZ")]
    pub levels: Vec<String>,

    /// Path percentage at or below which retrieval runs far-to-near
    #[arg(long, default_value_t = DEFAULT_SWITCHOVER)]
    pub switchover: f64,

    /// Random seed for reproducible realizations
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    pub seed: u32,

    /// Value representing missing cells in GSLIB documents
    #[arg(long, default_value_t = DEFAULT_SENTINEL)]
    pub sentinel: f32,

    /// Field separator of input documents
    #[arg(long, value_enum, default_value_t = Delimiter::Space)]
    pub delimiter: Delimiter,

    /// Conditioning data file with x, y (and z) columns
    #[arg(long, value_name = "FILE")]
    pub conditioning: Option<PathBuf>,

    /// Property column to read from the conditioning data
    #[arg(long, value_name = "COLUMN", default_value = "value")]
    pub conditioning_column: String,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    fn grid(&self, nx: usize, ny: usize, nz: usize) -> Result<GridStructure> {
        if nz == 1 {
            GridStructure::new_2d(nx, ny, self.sx, self.sy, self.x0, self.y0)
        } else {
            GridStructure::new_3d(
                nx, ny, nz, self.sx, self.sy, self.sz, self.x0, self.y0, self.z0,
            )
        }
    }

    fn parse_levels(&self) -> Result<Vec<LevelSpec>> {
        if self.levels.is_empty() {
            return Ok(vec![LevelSpec::new(DEFAULT_NEIGHBORS, 1.0, 1.0, 1.0)]);
        }
        self.levels.iter().map(|tuple| parse_level(tuple)).collect()
    }
}

fn parse_level(tuple: &str) -> Result<LevelSpec> {
    let fields: Vec<&str> = tuple.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(error::precondition(
            "level",
            &tuple,
            &"expected four fields K,RX,RY,RZ",
        ));
    }
    let neighbors: usize = fields[0]
        .parse()
        .map_err(|_| error::precondition("level", &tuple, &"K is not an integer"))?;
    let mut ratios = [0.0_f64; 3];
    for (slot, field) in ratios.iter_mut().zip(&fields[1..]) {
        *slot = field
            .parse()
            .map_err(|_| error::precondition("level", &tuple, &"ratio is not a number"))?;
    }
    Ok(LevelSpec::new(neighbors, ratios[0], ratios[1], ratios[2]))
}

/// Orchestrates one simulation run from parsed arguments
pub struct RunProcessor {
    cli: Cli,
}

impl RunProcessor {
    /// Create a processor for the given arguments
    pub const fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Read inputs, simulate and write the realization
    ///
    /// # Errors
    ///
    /// Returns the first failure of validation, input parsing, simulation
    /// or output writing; no output file exists in that case.
    #[allow(clippy::print_stderr)]
    pub fn process(&self) -> Result<()> {
        let cli = &self.cli;
        let ti_grid = cli.grid(cli.ti_nx, cli.ti_ny, cli.ti_nz)?;
        let sim_grid = cli.grid(cli.nx, cli.ny, cli.nz)?;
        if ti_grid.dims() != sim_grid.dims() {
            return Err(SimulationError::GridDimensionMismatch {
                left: ti_grid.dims().label(),
                right: sim_grid.dims().label(),
                operation: "grid setup",
            });
        }

        let document = read_grid(&cli.training, &ti_grid, cli.sentinel, cli.delimiter)?;
        let training = document.properties.into_iter().next().ok_or_else(|| {
            error::format_error(cli.training.clone(), 2, &"document declares no properties")
        })?;

        let name = if document.name.is_empty() {
            "simulation".to_string()
        } else {
            document.name
        };
        let mut realization = Property::new(sim_grid, name);

        if let Some(conditioning) = &cli.conditioning {
            let records = read_records(conditioning, cli.delimiter)?;
            let summary = project_records(
                &records,
                &cli.conditioning_column,
                cli.sentinel,
                &mut realization,
            )?;
            if !cli.quiet && summary.discarded > 0 {
                eprintln!(
                    "Warning: {} conditioning records fall outside the grid",
                    summary.discarded
                );
            }
        }

        let params = PyramidParams {
            levels: cli.parse_levels()?,
            switchover: cli.switchover,
            seed: cli.seed,
        };
        let mut simulator = MultiResolutionSimulator::new(params)?;
        if !cli.quiet {
            simulator.enable_progress();
        }
        simulator.run(&mut realization, &training)?;

        write_grid(&cli.output, &realization, cli.sentinel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_tuples_parse_into_specs() {
        let level = parse_level("24, 2.0, 1.0, 0.5").unwrap();
        assert_eq!(level.neighbors, 24);
        assert_eq!(level.rx, 2.0);
        assert_eq!(level.ry, 1.0);
        assert_eq!(level.rz, 0.5);
    }

    #[test]
    fn malformed_level_tuples_are_rejected() {
        assert!(parse_level("24,1.0,1.0").is_err());
        assert!(parse_level("x,1.0,1.0,1.0").is_err());
        assert!(parse_level("4,1.0,one,1.0").is_err());
    }
}
