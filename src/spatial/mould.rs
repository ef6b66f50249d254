//! Center-relative neighborhood templates
//!
//! A mould is an ordered list of neighbor offsets around an implicit core
//! cell, sorted nearest first. Offsets live in parallel primitive arrays and
//! the planar/volumetric gather paths are chosen once at construction, not
//! per lookup.

use std::collections::HashSet;

use crate::io::configuration::MAX_TEMPLATE_RADIUS;
use crate::io::error::{self, Result};
use crate::spatial::grid::{Dimensionality, SpatialIndex};
use crate::spatial::property::Property;

/// Result of reading a neighborhood out of a property
#[derive(Debug, Clone, Copy)]
pub struct GatherOutcome {
    /// Value at the core cell, `None` when missing
    pub core: Option<f32>,
    /// Whether at least one neighbor produced a value
    pub any_informed: bool,
    /// Whether every neighbor produced a value
    pub all_informed: bool,
}

/// Ordered neighborhood template around a core cell
///
/// Invariants: no offset equals the core, offsets are pairwise distinct and
/// the arrays are sorted ascending by distance with a lexicographic
/// tie-break on `(dx, dy, dz)`.
#[derive(Debug, Clone)]
pub struct Mould {
    dx: Vec<i64>,
    dy: Vec<i64>,
    dz: Vec<i64>,
    dist: Vec<f64>,
    dims: Dimensionality,
}

impl Mould {
    /// Build a template from the K nearest offsets under anisotropic scaling
    ///
    /// Candidates are enumerated in a growing axis-aligned box until at least
    /// `neighbors` non-core offsets exist, scored by the per-axis scaled
    /// distance `sqrt((dx/rx)^2 + (dy/ry)^2 + (dz/rz)^2)`, and the smallest K
    /// are kept. Every kept offset is then multiplied by the multi-grid
    /// expansion `2^(multigrid - 1)`. Planar templates force `dz = 0` and
    /// ignore `rz`.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionViolation` for a zero neighbor count,
    /// non-positive ratios, a zero multi-grid factor, or when the candidate
    /// box would have to grow beyond the supported radius.
    pub fn by_anisotropic_topk(
        neighbors: usize,
        rx: f64,
        ry: f64,
        rz: f64,
        multigrid: u32,
        dims: Dimensionality,
    ) -> Result<Self> {
        if neighbors == 0 {
            return Err(error::precondition(
                "neighbors",
                &neighbors,
                &"template needs at least one neighbor",
            ));
        }
        if rx <= 0.0 || ry <= 0.0 {
            return Err(error::precondition(
                "ratios",
                &format!("({rx}, {ry})"),
                &"axis ratios must be positive",
            ));
        }
        if dims == Dimensionality::Three && rz <= 0.0 {
            return Err(error::precondition(
                "ratios",
                &rz,
                &"z ratio must be positive for volumetric templates",
            ));
        }
        if multigrid == 0 {
            return Err(error::precondition(
                "multigrid",
                &multigrid,
                &"multi-grid factor must be at least one",
            ));
        }

        let radius = Self::box_radius_for(neighbors, dims)?;
        let mut candidates: Vec<(f64, i64, i64, i64)> = Vec::new();
        let z_range = match dims {
            Dimensionality::Two => 0..=0,
            Dimensionality::Three => -radius..=radius,
        };
        for z in z_range {
            for y in -radius..=radius {
                for x in -radius..=radius {
                    if x == 0 && y == 0 && z == 0 {
                        continue;
                    }
                    let scaled_z = match dims {
                        Dimensionality::Two => 0.0,
                        Dimensionality::Three => z as f64 / rz,
                    };
                    let d = ((x as f64 / rx).powi(2)
                        + (y as f64 / ry).powi(2)
                        + scaled_z.powi(2))
                    .sqrt();
                    candidates.push((d, x, y, z));
                }
            }
        }

        candidates.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (a.1, a.2, a.3).cmp(&(b.1, b.2, b.3)))
        });
        candidates.truncate(neighbors);

        let expansion = 1_i64 << (multigrid - 1);
        let mut mould = Self::with_capacity(neighbors, dims);
        for (d, x, y, z) in candidates {
            mould.dx.push(x * expansion);
            mould.dy.push(y * expansion);
            mould.dz.push(z * expansion);
            mould.dist.push(d * expansion as f64);
        }
        Ok(mould)
    }

    /// Build a template from explicit neighbor locations around a core
    ///
    /// Offsets are `neighbor - core`; duplicates and the zero offset are
    /// dropped, and the remainder is sorted by Euclidean distance with the
    /// lexicographic tie-break.
    ///
    /// # Errors
    ///
    /// Returns `GridDimensionMismatch` when a neighbor disagrees with the
    /// core's dimensionality and `PreconditionViolation` when no usable
    /// offset remains.
    pub fn by_locations(core: &SpatialIndex, neighbors: &[SpatialIndex]) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut offsets: Vec<(f64, i64, i64, i64)> = Vec::new();
        for neighbor in neighbors {
            let offset = neighbor.checked_sub(core)?;
            let triple = (offset.ix(), offset.iy(), offset.iz());
            if triple == (0, 0, 0) || !seen.insert(triple) {
                continue;
            }
            let d = ((triple.0 * triple.0 + triple.1 * triple.1 + triple.2 * triple.2) as f64)
                .sqrt();
            offsets.push((d, triple.0, triple.1, triple.2));
        }
        if offsets.is_empty() {
            return Err(error::precondition(
                "neighbors",
                &neighbors.len(),
                &"no neighbor distinct from the core was given",
            ));
        }
        offsets.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (a.1, a.2, a.3).cmp(&(b.1, b.2, b.3)))
        });

        let mut mould = Self::with_capacity(offsets.len(), core.dims());
        for (d, x, y, z) in offsets {
            mould.dx.push(x);
            mould.dy.push(y);
            mould.dz.push(z);
            mould.dist.push(d);
        }
        Ok(mould)
    }

    fn with_capacity(capacity: usize, dims: Dimensionality) -> Self {
        Self {
            dx: Vec::with_capacity(capacity),
            dy: Vec::with_capacity(capacity),
            dz: Vec::with_capacity(capacity),
            dist: Vec::with_capacity(capacity),
            dims,
        }
    }

    // Smallest box radius whose candidate count reaches the neighbor target
    fn box_radius_for(neighbors: usize, dims: Dimensionality) -> Result<i64> {
        let mut radius = 1_i64;
        loop {
            let side = 2 * radius + 1;
            let cells = match dims {
                Dimensionality::Two => side * side - 1,
                Dimensionality::Three => side * side * side - 1,
            };
            if cells as usize >= neighbors {
                return Ok(radius);
            }
            if radius >= MAX_TEMPLATE_RADIUS {
                return Err(error::precondition(
                    "neighbors",
                    &neighbors,
                    &format!("candidate box capped at radius {MAX_TEMPLATE_RADIUS}"),
                ));
            }
            radius += 1;
        }
    }

    /// Number of neighbors
    pub fn len(&self) -> usize {
        self.dx.len()
    }

    /// Whether the template has no neighbors (never true for built moulds)
    pub fn is_empty(&self) -> bool {
        self.dx.is_empty()
    }

    /// Dimensionality the template was built for
    pub const fn dims(&self) -> Dimensionality {
        self.dims
    }

    /// Offset of a neighbor
    pub fn offset(&self, i: usize) -> (i64, i64, i64) {
        (self.dx[i], self.dy[i], self.dz[i])
    }

    /// Scaled distance of a neighbor from the core
    pub fn distance(&self, i: usize) -> f64 {
        self.dist[i]
    }

    /// Read the neighborhood of a cell into a caller buffer
    ///
    /// `buffer[i]` receives the property value at `center + offset(i)`, with
    /// out-of-bounds neighbors reported as missing.
    ///
    /// # Panics
    ///
    /// Panics when the buffer length differs from the neighbor count.
    pub fn gather(
        &self,
        center: &SpatialIndex,
        property: &Property,
        buffer: &mut [Option<f32>],
    ) -> GatherOutcome {
        assert_eq!(buffer.len(), self.len(), "gather buffer length mismatch");
        match self.dims {
            Dimensionality::Two => self.gather_planar(center, property, buffer),
            Dimensionality::Three => self.gather_volumetric(center, property, buffer),
        }
    }

    fn gather_planar(
        &self,
        center: &SpatialIndex,
        property: &Property,
        buffer: &mut [Option<f32>],
    ) -> GatherOutcome {
        let (cx, cy) = (center.ix(), center.iy());
        let mut any = false;
        let mut all = true;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let value = property.get_raw(cx + self.dx[i], cy + self.dy[i], 0);
            any |= value.is_some();
            all &= value.is_some();
            *slot = value;
        }
        GatherOutcome {
            core: property.get(center),
            any_informed: any,
            all_informed: all,
        }
    }

    fn gather_volumetric(
        &self,
        center: &SpatialIndex,
        property: &Property,
        buffer: &mut [Option<f32>],
    ) -> GatherOutcome {
        let (cx, cy, cz) = (center.ix(), center.iy(), center.iz());
        let mut any = false;
        let mut all = true;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let value = property.get_raw(cx + self.dx[i], cy + self.dy[i], cz + self.dz[i]);
            any |= value.is_some();
            all &= value.is_some();
            *slot = value;
        }
        GatherOutcome {
            core: property.get(center),
            any_informed: any,
            all_informed: all,
        }
    }
}
