//! Diagnostics for sampled point grids.
//!
//! Collected once per generation, after evaluation and before centering, so
//! the reported coordinates are those of the requested domain.
//!
//! ```ignore
//! let diagnostics = GridDiagnostics::from_grid(&grid);
//! if diagnostics.has_warnings() {
//!     for warning in &diagnostics.warnings {
//!         log::warn!("{warning}");
//!     }
//! }
//! ```

use std::fmt;

use serde::Serialize;

use super::core::Tolerance;
use super::grid::{Domain, PointGrid};

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct GridDiagnostics {
    /// Number of rows, one per x sample.
    pub row_count: usize,
    /// Shortest row.
    pub min_row_len: usize,
    /// Longest row. Equal to `min_row_len` for a rectangular grid.
    pub max_row_len: usize,
    pub vertex_count: usize,
    /// Bounding box corners as `[x, y, z]`, absent for an empty grid.
    pub bbox_min: Option<[f64; 3]>,
    pub bbox_max: Option<[f64; 3]>,
    /// Human-readable notes about the grid, e.g. a flat surface or a domain
    /// bound that the step walk did not reach.
    pub warnings: Vec<String>,
}

impl GridDiagnostics {
    #[must_use]
    pub fn from_grid(grid: &PointGrid) -> Self {
        let (min_row_len, max_row_len) = grid.row_len_range().unwrap_or((0, 0));
        let bbox = grid.bbox();
        let mut diagnostics = Self {
            row_count: grid.row_count(),
            min_row_len,
            max_row_len,
            vertex_count: grid.vertex_count(),
            bbox_min: bbox.map(|b| b.min.to_array()),
            bbox_max: bbox.map(|b| b.max.to_array()),
            warnings: Vec::new(),
        };

        if !diagnostics.is_rectangular() {
            diagnostics.add_warning(format!(
                "rows have between {min_row_len} and {max_row_len} points"
            ));
        }
        if diagnostics.row_count == 1 {
            diagnostics.add_warning("grid has a single row; at least two sections are needed to loft");
        }
        if let Some(b) = bbox {
            if Tolerance::DEFAULT.approx_zero_f64(b.size().z) && diagnostics.vertex_count > 1 {
                diagnostics.add_warning(format!("surface is flat at z = {}", b.min.z));
            }
        }
        diagnostics
    }

    /// Notes domain bounds that the sampled grid falls short of.
    ///
    /// Step mode stops at the last accumulated coordinate that is still within
    /// the bound, so a step that does not divide the extent leaves a gap.
    pub fn check_coverage(&mut self, domain: &Domain) {
        let (Some(min), Some(max)) = (self.bbox_min, self.bbox_max) else {
            return;
        };
        let tol = Tolerance::LOOSE;
        let gaps = [
            ('x', domain.x_max - max[0]),
            ('y', domain.y_max - max[1]),
        ];
        for (axis, gap) in gaps {
            if !tol.approx_zero_f64(gap) {
                self.add_warning(format!("sampling stops {gap:.6} short of {axis}_max"));
            }
        }
        if !tol.approx_eq_f64(min[0], domain.x_min) || !tol.approx_eq_f64(min[1], domain.y_min) {
            self.add_warning("grid does not start at the domain minimum");
        }
    }

    #[must_use]
    pub fn is_rectangular(&self) -> bool {
        self.min_row_len == self.max_row_len
    }

    #[must_use]
    pub fn min_z(&self) -> Option<f64> {
        self.bbox_min.map(|b| b[2])
    }

    #[must_use]
    pub fn max_z(&self) -> Option<f64> {
        self.bbox_max.map(|b| b[2])
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Short one-line summary for logging.
    ///
    /// Format: `"rows:{rows} cols:{min}[..{max}] V:{vertices} [z:{min}..{max}]"`
    #[must_use]
    pub fn summary(&self) -> String {
        let columns = if self.is_rectangular() {
            self.min_row_len.to_string()
        } else {
            format!("{}..{}", self.min_row_len, self.max_row_len)
        };
        let mut parts = vec![format!(
            "rows:{} cols:{} V:{}",
            self.row_count, columns, self.vertex_count
        )];
        if let (Some(lo), Some(hi)) = (self.min_z(), self.max_z()) {
            parts.push(format!("z:{lo:.4}..{hi:.4}"));
        }
        if self.has_warnings() {
            parts.push(format!("warnings:{}", self.warnings.len()));
        }
        parts.join(" ")
    }
}

impl fmt::Display for GridDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid Diagnostics:")?;
        writeln!(f, "  Rows: {}", self.row_count)?;
        if self.is_rectangular() {
            writeln!(f, "  Columns: {}", self.min_row_len)?;
        } else {
            writeln!(f, "  Columns: {} to {}", self.min_row_len, self.max_row_len)?;
        }
        writeln!(f, "  Vertices: {}", self.vertex_count)?;

        if let (Some(min), Some(max)) = (self.bbox_min, self.bbox_max) {
            writeln!(
                f,
                "  Bounds: [{}, {}, {}] to [{}, {}, {}]",
                min[0], min[1], min[2], max[0], max[1], max[2]
            )?;
        }

        if !self.warnings.is_empty() {
            writeln!(f, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "    - {}", warning)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::core::Point3;
    use crate::geom::grid::{Resolution, sample_xy_grid};

    #[test]
    fn test_rectangular_grid_summary() {
        let grid = PointGrid::from_rows(vec![
            vec![Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 1.0, 2.0)],
            vec![Point3::new(1.0, 0.0, 3.0), Point3::new(1.0, 1.0, -1.0)],
        ]);
        let diagnostics = GridDiagnostics::from_grid(&grid);
        assert!(diagnostics.is_rectangular());
        assert!(!diagnostics.has_warnings());
        assert_eq!(diagnostics.min_z(), Some(-1.0));
        assert_eq!(diagnostics.max_z(), Some(3.0));
        assert_eq!(diagnostics.summary(), "rows:2 cols:2 V:4 z:-1.0000..3.0000");
    }

    #[test]
    fn test_ragged_grid_warns() {
        let grid = PointGrid::from_rows(vec![
            vec![Point3::new(0.0, 0.0, 1.0); 3],
            vec![Point3::new(1.0, 0.0, 2.0); 2],
        ]);
        let diagnostics = GridDiagnostics::from_grid(&grid);
        assert!(!diagnostics.is_rectangular());
        assert_eq!(diagnostics.warnings.len(), 1);
        assert!(diagnostics.summary().contains("cols:2..3"));
    }

    #[test]
    fn test_flat_surface_warns() {
        let grid = PointGrid::from_rows(vec![
            vec![Point3::xy(0.0, 0.0), Point3::xy(0.0, 1.0)],
            vec![Point3::xy(1.0, 0.0), Point3::xy(1.0, 1.0)],
        ]);
        let diagnostics = GridDiagnostics::from_grid(&grid);
        assert!(diagnostics.warnings[0].contains("flat"));
    }

    #[test]
    fn test_coverage_gap_is_reported() {
        let domain = Domain::new(0.0, 1.0, 0.0, 1.0);
        let grid = sample_xy_grid(&domain, Resolution::StepSize(0.3)).expect("valid");
        let mut diagnostics = GridDiagnostics::from_grid(&grid);
        diagnostics.warnings.clear();
        diagnostics.check_coverage(&domain);
        assert_eq!(diagnostics.warnings.len(), 2);
        assert!(diagnostics.warnings[0].contains("x_max"));
        assert!(diagnostics.warnings[1].contains("y_max"));
    }

    #[test]
    fn test_display_lists_warnings() {
        let mut diagnostics = GridDiagnostics::default();
        diagnostics.add_warning("something odd");
        let text = diagnostics.to_string();
        assert!(text.contains("Grid Diagnostics:"));
        assert!(text.contains("- something odd"));
    }
}
