/// Randomized simulation path with freeze tracking
pub mod path;
/// Multi-resolution pyramid simulation
pub mod pyramid;
/// Reverse index and far-to-near retrieval
pub mod reverse;
/// Pattern search tree and near-to-far retrieval
pub mod tree;

/// Single-resolution sequential simulation
pub mod driver;

pub use driver::{SequentialSimulator, SimulationParams};
pub use pyramid::{LevelSpec, MultiResolutionSimulator, PyramidParams};
pub use reverse::ReverseIndex;
pub use tree::SearchTree;
