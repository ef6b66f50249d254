//! Search tree over training-image neighborhood patterns
//!
//! The tree indexes every fully-informed neighborhood observed in the
//! training image. A node at depth `d` fixes the categories of the `d + 1`
//! nearest template neighbors along its path from the root and carries, per
//! category, the number of training patterns through it whose core holds
//! that category. Nodes live in an arena and refer to each other by index,
//! so the tree is immutable and freely shared once built.

use rayon::prelude::*;

use crate::analysis::statistics::{self, FrequencyTable};
use crate::io::configuration::MAX_CATEGORIES;
use crate::io::error::{Result, SimulationError};
use crate::spatial::mould::Mould;
use crate::spatial::property::Property;

/// Category label carried by the root node
///
/// Never collides with real categories, which are rounded `f32` cell values.
pub const ROOT_SENTINEL: i32 = i32::MIN;

/// One arena-allocated tree node
#[derive(Debug, Clone)]
pub struct TreeNode {
    value: i32,
    depth: i32,
    parent: Option<usize>,
    // Sorted by category so child lookup is a binary search and iteration
    // order is deterministic
    children: Vec<(i32, usize)>,
    core_freq: Vec<u32>,
}

impl TreeNode {
    /// Category fixed at this node's depth, `ROOT_SENTINEL` for the root
    pub const fn value(&self) -> i32 {
        self.value
    }

    /// Neighbor depth of this node, `-1` for the root
    pub const fn depth(&self) -> i32 {
        self.depth
    }

    /// Arena index of the parent, absent for the root
    pub const fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Children as `(category, arena index)` pairs in category order
    pub fn children(&self) -> &[(i32, usize)] {
        &self.children
    }

    /// Arena index of the child fixing a category, if present
    pub fn child(&self, category: i32) -> Option<usize> {
        self.children
            .binary_search_by_key(&category, |&(c, _)| c)
            .ok()
            .map(|pos| self.children[pos].1)
    }

    /// Per-category core counts aligned with the tree's category list
    pub fn core_freq(&self) -> &[u32] {
        &self.core_freq
    }

    /// Total number of counted patterns through this node
    pub fn core_total(&self) -> u64 {
        self.core_freq.iter().map(|&c| u64::from(c)).sum()
    }
}

/// Prefix tree over template positions with per-category core counts
#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<TreeNode>,
    categories: Vec<i32>,
    neighbor_count: usize,
}

impl SearchTree {
    /// Build the tree from a training image and a template
    ///
    /// Pattern extraction scans every cell and keeps neighborhoods whose
    /// neighbors are all informed; the core may be missing, in which case the
    /// pattern grows the tree but contributes no counts. Extraction runs
    /// data-parallel with an order-preserving collection; the insertion walk
    /// is serial, so node identifiers depend only on the inputs.
    ///
    /// # Errors
    ///
    /// Returns `TooManyCategories` when the training image holds more than
    /// ten distinct non-missing values and `GridDimensionMismatch` when the
    /// template and the training grid disagree. No tree state exists on
    /// failure.
    pub fn build(mould: &Mould, training: &Property) -> Result<Self> {
        if training.grid().dims() != mould.dims() {
            return Err(SimulationError::GridDimensionMismatch {
                left: training.grid().dims().label(),
                right: mould.dims().label(),
                operation: "tree construction",
            });
        }
        let table = FrequencyTable::from_property(training);
        if table.distinct() > MAX_CATEGORIES {
            return Err(SimulationError::TooManyCategories {
                found: table.distinct(),
                limit: MAX_CATEGORIES,
            });
        }
        let categories = table.categories();

        let k = mould.len();
        let grid = training.grid();
        let patterns: Vec<(Vec<i32>, Option<i32>)> = (0..grid.cell_count())
            .into_par_iter()
            .filter_map(|idx| {
                let si = grid.spatial_index(idx).ok()?;
                let mut buffer = vec![None; k];
                let outcome = mould.gather(&si, training, &mut buffer);
                if !outcome.all_informed {
                    return None;
                }
                let neighbors: Option<Vec<i32>> = buffer
                    .into_iter()
                    .map(|v| v.map(statistics::category_of))
                    .collect();
                neighbors.map(|n| (n, outcome.core.map(statistics::category_of)))
            })
            .collect();

        let root = TreeNode {
            value: ROOT_SENTINEL,
            depth: -1,
            parent: None,
            children: Vec::new(),
            core_freq: vec![0; categories.len()],
        };
        let mut tree = Self {
            nodes: vec![root],
            categories,
            neighbor_count: k,
        };
        for (neighbors, core) in &patterns {
            tree.insert_pattern(neighbors, *core);
        }
        Ok(tree)
    }

    fn insert_pattern(&mut self, neighbors: &[i32], core: Option<i32>) {
        let core_slot = core.and_then(|c| self.category_position(c));
        if let Some(slot) = core_slot {
            self.nodes[0].core_freq[slot] += 1;
        }
        let mut current = 0;
        for (depth, &value) in neighbors.iter().enumerate() {
            current = self.child_or_insert(current, value, depth as i32);
            if let Some(slot) = core_slot {
                self.nodes[current].core_freq[slot] += 1;
            }
        }
    }

    fn child_or_insert(&mut self, parent: usize, value: i32, depth: i32) -> usize {
        match self.nodes[parent]
            .children
            .binary_search_by_key(&value, |&(c, _)| c)
        {
            Ok(pos) => self.nodes[parent].children[pos].1,
            Err(pos) => {
                let id = self.nodes.len();
                self.nodes.push(TreeNode {
                    value,
                    depth,
                    parent: Some(parent),
                    children: Vec::new(),
                    core_freq: vec![0; self.categories.len()],
                });
                self.nodes[parent].children.insert(pos, (value, id));
                id
            }
        }
    }

    /// Sorted categories the tree was built over
    pub fn categories(&self) -> &[i32] {
        &self.categories
    }

    /// Position of a category in the sorted category list
    pub fn category_position(&self, category: i32) -> Option<usize> {
        self.categories.binary_search(&category).ok()
    }

    /// Number of template neighbors the tree indexes
    pub const fn neighbor_count(&self) -> usize {
        self.neighbor_count
    }

    /// Number of arena nodes including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node by arena index
    pub fn node(&self, id: usize) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// The root node
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Retrieve per-category replicate counts for a data event, nearest
    /// neighbor first
    ///
    /// A frontier of nodes starts at the root and advances one template
    /// position per step: observed categories follow the matching child edge
    /// and missing positions expand to all children. Aggregates are recorded
    /// at every informed level and the deepest one whose replicate total
    /// exceeds `cd_min` wins. `None` means no level qualified; callers treat
    /// that as an instruction to fall back, not as an error.
    pub fn retrieve_forward(&self, event: &[Option<i32>], cd_min: u64) -> Option<Vec<u64>> {
        let mut frontier = vec![0];
        let mut next = Vec::new();
        let mut informed_aggregates: Vec<Vec<u64>> = Vec::new();

        for &observation in event.iter().take(self.neighbor_count) {
            next.clear();
            match observation {
                None => {
                    for &id in &frontier {
                        next.extend(self.nodes[id].children.iter().map(|&(_, child)| child));
                    }
                }
                Some(category) => {
                    for &id in &frontier {
                        if let Some(child) = self.nodes[id].child(category) {
                            next.push(child);
                        }
                    }
                }
            }
            std::mem::swap(&mut frontier, &mut next);
            if observation.is_some() {
                informed_aggregates.push(self.aggregate(&frontier));
            }
        }

        informed_aggregates
            .into_iter()
            .rev()
            .find(|agg| agg.iter().sum::<u64>() > cd_min)
    }

    /// Sum core counts over a set of nodes, per category
    pub(crate) fn aggregate(&self, node_ids: &[usize]) -> Vec<u64> {
        let mut totals = vec![0_u64; self.categories.len()];
        for &id in node_ids {
            for (slot, &count) in self.nodes[id].core_freq.iter().enumerate() {
                totals[slot] += u64::from(count);
            }
        }
        totals
    }

    /// Whether a node's root path carries the required categories
    ///
    /// `required` holds `(neighbor depth, category)` pairs sorted by
    /// descending depth, matching the upward parent walk.
    pub(crate) fn ancestor_matches(&self, node_id: usize, required: &[(i32, i32)]) -> bool {
        let mut current = Some(node_id);
        let mut wanted = required.iter();
        let mut next_wanted = wanted.next();

        while let (Some(id), Some(&(depth, category))) = (current, next_wanted) {
            let node = &self.nodes[id];
            if node.depth < depth {
                return false;
            }
            if node.depth == depth {
                if node.value != category {
                    return false;
                }
                next_wanted = wanted.next();
            }
            current = node.parent;
        }
        next_wanted.is_none()
    }
}
