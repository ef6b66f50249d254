//! Conditioning data ingestion
//!
//! Hard data arrives as tabular records with coordinate columns and one or
//! more property columns. Records are projected onto the simulation grid by
//! rounding to the nearest cell center; records outside the grid are
//! discarded and sentinel-valued properties are skipped.

use std::path::Path;

use crate::io::error::{self, Result};
use crate::io::gslib::Delimiter;
use crate::spatial::grid::{Coord, Dimensionality};
use crate::spatial::property::Property;

/// One tabular record as `(column name, value)` pairs
#[derive(Debug, Clone)]
pub struct TabularRecord {
    columns: Vec<(String, f64)>,
}

impl TabularRecord {
    /// Value of a named column
    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|&(_, value)| value)
    }
}

/// Read tabular records from a GSLIB-style document
///
/// The document layout matches grid files: header, column count, column
/// names, then one record per line. Unlike grid files the record count is
/// free.
///
/// # Errors
///
/// Returns `FileSystem` for unreadable files and `IoFormat` for malformed
/// content.
pub fn read_records(path: &Path, delimiter: Delimiter) -> Result<Vec<TabularRecord>> {
    let document = std::fs::read_to_string(path).map_err(|source| {
        crate::io::error::SimulationError::FileSystem {
            path: path.to_path_buf(),
            operation: "open",
            source,
        }
    })?;

    let mut content = document
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, _header) = content
        .next()
        .ok_or_else(|| error::format_error(path, 1, &"empty document"))?;
    let (count_line, count_text) = content
        .next()
        .ok_or_else(|| error::format_error(path, 2, &"missing column count"))?;
    let column_count: usize = count_text.trim().parse().map_err(|_| {
        error::format_error(path, count_line, &"column count is not an integer")
    })?;
    if column_count == 0 {
        return Err(error::format_error(
            path,
            count_line,
            &"document declares no columns",
        ));
    }

    let mut names = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let (_, name_line) = content.next().ok_or_else(|| {
            error::format_error(path, count_line, &"fewer column names than declared")
        })?;
        names.push(name_line.trim().to_string());
    }

    let mut records = Vec::new();
    for (line_number, line) in content {
        let tokens = delimiter.tokens(line);
        if tokens.len() < column_count {
            return Err(error::format_error(
                path,
                line_number,
                &format!(
                    "record has {} columns but {column_count} are declared",
                    tokens.len()
                ),
            ));
        }
        let mut columns = Vec::with_capacity(column_count);
        for (name, token) in names.iter().zip(&tokens) {
            let value: f64 = token.parse().map_err(|_| {
                error::format_error(path, line_number, &format!("unparseable field '{token}'"))
            })?;
            columns.push((name.clone(), value));
        }
        records.push(TabularRecord { columns });
    }
    Ok(records)
}

/// Outcome of projecting records onto a grid
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionSummary {
    /// Records written into the property
    pub assigned: usize,
    /// Records whose coordinates fall outside the grid
    pub discarded: usize,
    /// Records whose property value carried the sentinel
    pub skipped: usize,
}

/// Project records onto a property as hard data
///
/// Coordinates are never sentinel; a sentinel in the property column marks
/// a record that carries no value for this variable.
///
/// # Errors
///
/// Returns `PreconditionViolation` when a record lacks the coordinate
/// columns or the requested property column.
pub fn project_records(
    records: &[TabularRecord],
    column: &str,
    sentinel: f32,
    target: &mut Property,
) -> Result<ProjectionSummary> {
    let mut summary = ProjectionSummary::default();
    for record in records {
        let x = record
            .get("x")
            .ok_or_else(|| error::precondition("records", &column, &"missing 'x' column"))?;
        let y = record
            .get("y")
            .ok_or_else(|| error::precondition("records", &column, &"missing 'y' column"))?;
        let z = match target.grid().dims() {
            Dimensionality::Two => 0.0,
            Dimensionality::Three => record
                .get("z")
                .ok_or_else(|| error::precondition("records", &column, &"missing 'z' column"))?,
        };
        let value = record.get(column).ok_or_else(|| {
            error::precondition("records", &column, &"missing the property column")
        })?;

        let Some(si) = target.grid().coord_to_spatial_index(&Coord::new(x, y, z)) else {
            summary.discarded += 1;
            continue;
        };
        if value as f32 == sentinel {
            summary.skipped += 1;
            continue;
        }
        target.set(&si, value as f32)?;
        summary.assigned += 1;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::grid::GridStructure;
    use crate::spatial::grid::SpatialIndex;

    fn record(columns: &[(&str, f64)]) -> TabularRecord {
        TabularRecord {
            columns: columns
                .iter()
                .map(|&(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    #[test]
    fn records_land_on_the_nearest_cell_center() {
        let grid = GridStructure::new_2d(4, 4, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut target = Property::new(grid, "hard");

        let records = [
            record(&[("x", 1.2), ("y", 2.8), ("facies", 1.0)]),
            record(&[("x", 9.0), ("y", 0.0), ("facies", 2.0)]),
            record(&[("x", 0.0), ("y", 0.0), ("facies", -99.0)]),
        ];
        let summary = project_records(&records, "facies", -99.0, &mut target).unwrap();

        assert_eq!(summary.assigned, 1);
        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(target.get(&SpatialIndex::new_2d(1, 3)), Some(1.0));
        assert_eq!(target.informed_count(), 1);
    }

    #[test]
    fn missing_coordinate_columns_are_a_precondition_error() {
        let grid = GridStructure::new_2d(2, 2, 1.0, 1.0, 0.0, 0.0).unwrap();
        let mut target = Property::new(grid, "hard");

        let records = [record(&[("y", 0.0), ("facies", 1.0)])];
        assert!(project_records(&records, "facies", -99.0, &mut target).is_err());
    }
}
