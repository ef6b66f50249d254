//! Reverse retrieval over inverted per-depth node lists
//!
//! Forward retrieval walks the tree from the nearest neighbor outward, which
//! wastes work when only distant neighbors are informed. The reverse index
//! inverts the tree: for every depth and category it lists the nodes fixing
//! that category at that depth, so retrieval can start at the farthest
//! observed neighbor and filter candidates against the nearer observations.

use std::collections::{BTreeMap, VecDeque};

use rayon::prelude::*;

use crate::algorithm::tree::{SearchTree, ROOT_SENTINEL};

/// Inverted lists from `(depth slot, category)` to tree nodes
///
/// Slot 0 holds the root under the sentinel category; slot `d + 1` holds the
/// nodes at neighbor depth `d`. The lists are immutable once built and, per
/// slot, the union of all category lists is exactly the set of tree nodes at
/// that depth.
#[derive(Debug)]
pub struct ReverseIndex {
    slots: Vec<BTreeMap<i32, Vec<usize>>>,
}

impl ReverseIndex {
    /// Build the inverted lists by a breadth-first tree walk
    pub fn build(tree: &SearchTree) -> Self {
        let mut slots: Vec<BTreeMap<i32, Vec<usize>>> =
            vec![BTreeMap::new(); tree.neighbor_count() + 1];
        slots[0].entry(ROOT_SENTINEL).or_default().push(0);

        let mut queue = VecDeque::from([0]);
        while let Some(id) = queue.pop_front() {
            let Some(node) = tree.node(id) else { continue };
            for &(category, child) in node.children() {
                let Some(child_node) = tree.node(child) else {
                    continue;
                };
                let slot = (child_node.depth() + 1) as usize;
                if let Some(bucket) = slots.get_mut(slot) {
                    bucket.entry(category).or_default().push(child);
                }
                queue.push_back(child);
            }
        }
        Self { slots }
    }

    /// Number of depth slots, the template neighbor count plus one
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Nodes at a depth slot fixing a category
    pub fn nodes_at(&self, slot: usize, category: i32) -> &[usize] {
        match self.slots.get(slot).and_then(|bucket| bucket.get(&category)) {
            Some(nodes) => nodes,
            None => &[],
        }
    }

    /// Categories present at a depth slot, ascending
    pub fn categories_at(&self, slot: usize) -> Vec<i32> {
        self.slots
            .get(slot)
            .map(|bucket| bucket.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Retrieve per-category replicate counts for a data event, farthest
    /// observed neighbor first
    ///
    /// For each observed depth `d` from far to near, candidates are the
    /// nodes fixing `event[d]` at depth `d`, filtered so their root paths
    /// also carry every observation strictly closer to the core. The first
    /// depth whose surviving candidates aggregate more than `cd_min`
    /// replicates wins; `None` means no depth qualified.
    pub fn retrieve_reverse(
        &self,
        tree: &SearchTree,
        event: &[Option<i32>],
        cd_min: u64,
    ) -> Option<Vec<u64>> {
        let observed: Vec<usize> = event
            .iter()
            .take(tree.neighbor_count())
            .enumerate()
            .filter_map(|(depth, v)| v.map(|_| depth))
            .collect();

        for (processed, &depth) in observed.iter().rev().enumerate() {
            let Some(category) = event.get(depth).copied().flatten() else {
                continue;
            };
            let bucket = self.nodes_at(depth + 1, category);
            if bucket.is_empty() {
                continue;
            }

            let closer = &observed[..observed.len() - 1 - processed];
            let candidates: Vec<usize> = if closer.is_empty() {
                bucket.to_vec()
            } else {
                // Descending depth to match the upward ancestor walk
                let required: Vec<(i32, i32)> = closer
                    .iter()
                    .rev()
                    .filter_map(|&j| event.get(j).copied().flatten().map(|c| (j as i32, c)))
                    .collect();
                if bucket.len() > 1 {
                    bucket
                        .par_iter()
                        .copied()
                        .filter(|&id| tree.ancestor_matches(id, &required))
                        .collect()
                } else {
                    bucket
                        .iter()
                        .copied()
                        .filter(|&id| tree.ancestor_matches(id, &required))
                        .collect()
                }
            };
            if candidates.is_empty() {
                continue;
            }

            let aggregate = tree.aggregate(&candidates);
            if aggregate.iter().sum::<u64>() > cd_min {
                return Some(aggregate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::grid::{Dimensionality, GridStructure};
    use crate::spatial::mould::Mould;
    use crate::spatial::property::Property;

    fn checkerboard(n: usize) -> Property {
        let grid = GridStructure::new_2d(n, n, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut prop = Property::new(grid, "ti");
        for idx in 0..prop.grid().cell_count() {
            let si = prop.grid().spatial_index(idx).unwrap();
            let value = ((si.ix() + si.iy()) % 2) as f32;
            prop.set(&si, value).unwrap();
        }
        prop
    }

    fn cross_mould() -> Mould {
        Mould::by_anisotropic_topk(4, 1.0, 1.0, 1.0, 1, Dimensionality::Two).unwrap()
    }

    #[test]
    fn every_tree_node_lands_in_exactly_one_bucket() {
        let ti = checkerboard(8);
        let tree = SearchTree::build(&cross_mould(), &ti).unwrap();
        let index = ReverseIndex::build(&tree);

        let mut bucketed = 0;
        for slot in 0..index.slot_count() {
            for category in index.categories_at(slot) {
                for &id in index.nodes_at(slot, category) {
                    let node = tree.node(id).unwrap();
                    assert_eq!((node.depth() + 1) as usize, slot);
                    assert_eq!(node.value(), category);
                    bucketed += 1;
                }
            }
        }
        assert_eq!(bucketed, tree.node_count());
    }

    #[test]
    fn reverse_matches_forward_under_full_evidence() {
        let ti = checkerboard(8);
        let tree = SearchTree::build(&cross_mould(), &ti).unwrap();
        let index = ReverseIndex::build(&tree);

        // Both checkerboard parities occur in the training image
        for parity in [0, 1] {
            let other = 1 - parity;
            let event = vec![Some(parity), Some(parity), Some(parity), Some(parity)];
            let forward = tree.retrieve_forward(&event, 1);
            let reverse = index.retrieve_reverse(&tree, &event, 1);
            assert!(forward.is_some());
            assert_eq!(forward, reverse);

            // The checkerboard forces the opposite core category
            let agg = forward.unwrap();
            let winner = tree.categories()[agg
                .iter()
                .enumerate()
                .max_by_key(|&(_, &count)| count)
                .map(|(slot, _)| slot)
                .unwrap()];
            assert_eq!(winner, other);
        }
    }

    #[test]
    fn sparse_far_only_events_still_retrieve() {
        let ti = checkerboard(8);
        let tree = SearchTree::build(&cross_mould(), &ti).unwrap();
        let index = ReverseIndex::build(&tree);

        // Only the farthest template position is informed
        let event = vec![None, None, None, Some(1)];
        let aggregate = index.retrieve_reverse(&tree, &event, 0).unwrap();
        assert!(aggregate.iter().sum::<u64>() > 0);
    }

    #[test]
    fn fully_missing_events_retrieve_nothing() {
        let ti = checkerboard(8);
        let tree = SearchTree::build(&cross_mould(), &ti).unwrap();
        let index = ReverseIndex::build(&tree);

        assert!(index
            .retrieve_reverse(&tree, &[None, None, None, None], 0)
            .is_none());
    }

    #[test]
    fn contradictory_evidence_skips_to_a_supported_depth() {
        let ti = checkerboard(8);
        let tree = SearchTree::build(&cross_mould(), &ti).unwrap();
        let index = ReverseIndex::build(&tree);

        // West and east neighbors always share a parity in the training
        // image, so this pair never occurs together and the nearer
        // observation alone must answer
        let event = vec![Some(0), None, None, Some(1)];
        let aggregate = index.retrieve_reverse(&tree, &event, 0).unwrap();
        let forward_nearest = tree.retrieve_forward(&[Some(0), None, None, None], 0).unwrap();
        assert_eq!(aggregate, forward_nearest);
    }
}
