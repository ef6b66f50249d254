//! Categorical statistics over property buffers
//!
//! Categories are the rounded integer values of informed cells. All derived
//! sequences are ordered by category so downstream sampling stays
//! deterministic.

use std::collections::BTreeMap;

use crate::spatial::property::Property;

/// Integer category of a stored value
pub fn category_of(value: f32) -> i32 {
    value.round() as i32
}

/// Ordered tally of category occurrences
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    counts: BTreeMap<i32, usize>,
}

impl FrequencyTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally every informed cell of a property
    pub fn from_property(property: &Property) -> Self {
        let mut table = Self::new();
        for (_, value) in property.informed_cells() {
            table.record(category_of(value));
        }
        table
    }

    /// Count one occurrence of a category
    pub fn record(&mut self, category: i32) {
        *self.counts.entry(category).or_insert(0) += 1;
    }

    /// Add every count from another table
    pub fn merge(&mut self, other: &Self) {
        for (&category, &count) in &other.counts {
            *self.counts.entry(category).or_insert(0) += count;
        }
    }

    /// Occurrences of a category
    pub fn count(&self, category: i32) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Total occurrences across all categories
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Number of distinct categories seen
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Categories in ascending order
    pub fn categories(&self) -> Vec<i32> {
        self.counts.keys().copied().collect()
    }

    /// `(category, count)` pairs in ascending category order
    pub fn entries(&self) -> Vec<(i32, usize)> {
        self.counts.iter().map(|(&c, &n)| (c, n)).collect()
    }

    /// Most frequent category, smallest first on ties
    pub fn mode(&self) -> Option<i32> {
        self.counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(&category, _)| category)
    }

    /// Normalized `(category, weight)` pairs in ascending category order
    pub fn pdf(&self) -> Vec<(i32, f64)> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }
        self.counts
            .iter()
            .map(|(&category, &count)| (category, count as f64 / total as f64))
            .collect()
    }
}

/// Distinct categories of a property in ascending order
pub fn distinct_categories(property: &Property) -> Vec<i32> {
    FrequencyTable::from_property(property).categories()
}

/// Normalized global category distribution of a property
pub fn global_pdf(property: &Property) -> Vec<(i32, f64)> {
    FrequencyTable::from_property(property).pdf()
}

/// Mode of a slice of present values, smallest category on ties
pub fn block_mode(values: &[f32]) -> Option<f32> {
    let mut table = FrequencyTable::new();
    for &value in values {
        table.record(category_of(value));
    }
    table.mode().map(|category| category as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::grid::{GridStructure, SpatialIndex};

    fn filled_property() -> Property {
        let grid = GridStructure::new_2d(2, 2, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut prop = Property::new(grid, "facies");
        prop.set(&SpatialIndex::new_2d(0, 0), 1.0).unwrap();
        prop.set(&SpatialIndex::new_2d(1, 0), 1.0).unwrap();
        prop.set(&SpatialIndex::new_2d(0, 1), 2.0).unwrap();
        prop
    }

    #[test]
    fn histogram_ignores_missing_cells() {
        let table = FrequencyTable::from_property(&filled_property());

        assert_eq!(table.entries(), vec![(1, 2), (2, 1)]);
        assert_eq!(table.total(), 3);
    }

    #[test]
    fn pdf_is_normalized_and_ordered() {
        let pdf = global_pdf(&filled_property());

        assert_eq!(pdf.len(), 2);
        assert_eq!(pdf[0].0, 1);
        assert!((pdf[0].1 - 2.0 / 3.0).abs() < 1e-12);
        assert!((pdf.iter().map(|&(_, w)| w).sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mode_breaks_ties_toward_the_smallest_category() {
        assert_eq!(block_mode(&[2.0, 1.0, 2.0, 1.0]), Some(1.0));
        assert_eq!(block_mode(&[3.0, 3.0, 1.0]), Some(3.0));
        assert_eq!(block_mode(&[]), None);
    }

    #[test]
    fn merge_accumulates_counts() {
        let mut left = FrequencyTable::new();
        left.record(1);
        left.record(1);
        let mut right = FrequencyTable::new();
        right.record(1);
        right.record(4);

        left.merge(&right);
        assert_eq!(left.entries(), vec![(1, 3), (4, 1)]);
    }
}
