//! GSLIB grid documents
//!
//! The format is line-oriented text: a free-form header, the property
//! count, one property name per line, then one numeric record per grid cell
//! ordered `ix` fastest, `iy` next, `iz` slowest. A sentinel value marks
//! missing cells.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::io::error::{self, Result, SimulationError};
use crate::spatial::grid::GridStructure;
use crate::spatial::property::Property;

/// Field separator of a GSLIB document
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Delimiter {
    /// Tab characters, parsed as general whitespace
    Tab,
    /// Space characters, parsed as general whitespace
    Space,
    /// Semicolons
    Semicolon,
    /// Commas
    Comma,
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Tab => "tab",
            Self::Space => "space",
            Self::Semicolon => "semicolon",
            Self::Comma => "comma",
        };
        write!(f, "{name}")
    }
}

impl Delimiter {
    /// Non-empty fields of a record line
    pub fn tokens(self, line: &str) -> Vec<&str> {
        match self {
            Self::Tab | Self::Space => line.split_whitespace().collect(),
            Self::Semicolon => line.split(';').map(str::trim).filter(|t| !t.is_empty()).collect(),
            Self::Comma => line.split(',').map(str::trim).filter(|t| !t.is_empty()).collect(),
        }
    }
}

/// Parsed GSLIB document: grid name plus one property per declared column
#[derive(Debug)]
pub struct GslibGrid {
    /// Name prefix of the header line
    pub name: String,
    /// Properties in declaration order, attached to the caller's grid
    pub properties: Vec<Property>,
}

// Lines arrive numbered so format errors can point at their position
struct NumberedLines {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: usize,
}

impl NumberedLines {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| SimulationError::FileSystem {
            path: path.to_path_buf(),
            operation: "open",
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_number: 0,
        })
    }

    /// Next non-blank line as `(line number, content)`
    fn next_content(&mut self) -> Result<Option<(usize, String)>> {
        loop {
            let Some(line) = self.lines.next() else {
                return Ok(None);
            };
            self.line_number += 1;
            let line = line.map_err(|source| SimulationError::FileSystem {
                path: self.path.clone(),
                operation: "read",
                source,
            })?;
            if !line.trim().is_empty() {
                return Ok(Some((self.line_number, line)));
            }
        }
    }

    fn require_content(&mut self, expected: &str) -> Result<(usize, String)> {
        let line_number = self.line_number;
        self.next_content()?.ok_or_else(|| {
            error::format_error(
                self.path.clone(),
                line_number + 1,
                &format!("unexpected end of file, expected {expected}"),
            )
        })
    }
}

/// Grid name prefix of a header line, up to the first `{` or `(`
fn name_prefix(header: &str) -> String {
    header
        .split(['{', '('])
        .next()
        .unwrap_or(header)
        .trim()
        .to_string()
}

/// Read a GSLIB document onto a grid
///
/// Every declared property receives its own buffer; sentinel fields stay
/// missing. Records must cover the whole grid and carry at least as many
/// columns as declared properties.
///
/// # Errors
///
/// Returns `FileSystem` for unreadable files and `IoFormat` with a line
/// number for malformed content.
pub fn read_grid(
    path: &Path,
    grid: &GridStructure,
    sentinel: f32,
    delimiter: Delimiter,
) -> Result<GslibGrid> {
    let mut lines = NumberedLines::open(path)?;

    let (_, header) = lines.require_content("a header line")?;
    let name = name_prefix(&header);

    let (count_line, count_text) = lines.require_content("the property count")?;
    let property_count: usize = count_text.trim().parse().map_err(|_| {
        error::format_error(path, count_line, &"property count is not an integer")
    })?;
    if property_count == 0 {
        return Err(error::format_error(
            path,
            count_line,
            &"document declares no properties",
        ));
    }

    let mut properties = Vec::with_capacity(property_count);
    for _ in 0..property_count {
        let (_, name_line) = lines.require_content("a property name")?;
        properties.push(Property::new(grid.clone(), name_line.trim()));
    }

    for ordinal in 0..grid.cell_count() {
        let (record_line, record) = lines.require_content("a cell record")?;
        let tokens = delimiter.tokens(&record);
        if tokens.len() < property_count {
            return Err(error::format_error(
                path,
                record_line,
                &format!(
                    "record has {} columns but {property_count} properties are declared",
                    tokens.len()
                ),
            ));
        }
        let si = grid.spatial_index(ordinal)?;
        for (property, token) in properties.iter_mut().zip(&tokens) {
            let value: f32 = token.parse().map_err(|_| {
                error::format_error(path, record_line, &format!("unparseable field '{token}'"))
            })?;
            if value != sentinel {
                property.set(&si, value)?;
            }
        }
    }

    Ok(GslibGrid { name, properties })
}

/// Write a single-property GSLIB document
///
/// The whole document is rendered in memory first, so a failing write never
/// leaves a partial file behind.
///
/// # Errors
///
/// Returns `FileSystem` when the document cannot be written.
pub fn write_grid(path: &Path, property: &Property, sentinel: f32) -> Result<()> {
    let grid = property.grid();
    let mut document = String::new();
    let _ = writeln!(
        document,
        "{} ({}x{}x{})",
        property.name(),
        grid.nx(),
        grid.ny(),
        grid.nz()
    );
    let _ = writeln!(document, "1");
    let _ = writeln!(document, "{}", property.name());

    for iz in 0..grid.nz() {
        for iy in 0..grid.ny() {
            for ix in 0..grid.nx() {
                let value = property
                    .get_raw(ix as i64, iy as i64, iz as i64)
                    .unwrap_or(sentinel);
                let _ = writeln!(document, "{value}");
            }
        }
    }

    std::fs::write(path, document).map_err(|source| SimulationError::FileSystem {
        path: path.to_path_buf(),
        operation: "write",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_stop_at_braces_and_parens() {
        assert_eq!(name_prefix("channels (100x100x1)"), "channels");
        assert_eq!(name_prefix("delta {simulated}"), "delta");
        assert_eq!(name_prefix("  plain  "), "plain");
    }

    #[test]
    fn delimiters_tokenize_records() {
        assert_eq!(Delimiter::Space.tokens("1  2\t3"), vec!["1", "2", "3"]);
        assert_eq!(Delimiter::Semicolon.tokens("1; 2;3"), vec!["1", "2", "3"]);
        assert_eq!(Delimiter::Comma.tokens("1, 2,"), vec!["1", "2"]);
    }
}
