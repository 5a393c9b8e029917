//! Parameter grids for equation driven surfaces.
//!
//! A [`PointGrid`] is an ordered list of rows; every row holds the samples for
//! one x value and every column one y value. The sampler mirrors the two
//! resolution modes offered to the user:
//!
//! - [`Resolution::StepSize`]: walk the domain with a fixed step, accumulating
//!   the step while the coordinate stays inside the inclusive bound.
//! - [`Resolution::IntervalCounts`]: split each axis into a fixed number of
//!   intervals, always hitting both bounds exactly.
//!
//! The grid is recentred with [`center_grid`] once elevations are known and is
//! turned sideways with [`PointGrid::transpose`] when rails are built.

use serde::{Deserialize, Serialize};

use super::core::{BBox, Point3};

/// Upper bound on samples along one axis; keeps a tiny step from turning the
/// accumulating walk into an endless loop.
pub const MAX_SAMPLES_PER_AXIS: f64 = 100_000.0;

/// Upper bound on the number of grid points.
pub const MAX_TOTAL_SAMPLES: f64 = 10_000_000.0;

// ============================================================================
// Error Type
// ============================================================================

/// Errors raised while sampling or reshaping a grid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("{axis} domain [{min}, {max}] is empty: maximum must exceed minimum")]
    InvalidDomain { axis: char, min: f64, max: f64 },
    #[error("{0}")]
    InvalidResolution(String),
    #[error("row {row} has {found} points, expected {expected}")]
    RaggedRows { row: usize, expected: usize, found: usize },
}

// ============================================================================
// Domain & Resolution
// ============================================================================

/// Rectangular sampling domain in the sketch plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for Domain {
    fn default() -> Self {
        Self::new(-4.0, 4.0, -4.0, 4.0)
    }
}

impl Domain {
    #[must_use]
    pub const fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    #[must_use]
    pub fn x_extent(&self) -> f64 {
        self.x_max - self.x_min
    }

    #[must_use]
    pub fn y_extent(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// The four corners in grid order: (min, min), (min, max), (max, min), (max, max).
    #[must_use]
    pub fn corners(&self) -> [Point3; 4] {
        [
            Point3::xy(self.x_min, self.y_min),
            Point3::xy(self.x_min, self.y_max),
            Point3::xy(self.x_max, self.y_min),
            Point3::xy(self.x_max, self.y_max),
        ]
    }

    /// Checks that both axes are finite and have a positive extent.
    pub fn validate(&self) -> Result<(), GridError> {
        for (axis, min, max) in [('x', self.x_min, self.x_max), ('y', self.y_min, self.y_max)] {
            if !min.is_finite() || !max.is_finite() || max <= min {
                return Err(GridError::InvalidDomain { axis, min, max });
            }
        }
        Ok(())
    }
}

/// Grid density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Same step along both axes.
    StepSize(f64),
    /// Number of intervals along x and y; the grid has one more point than intervals.
    IntervalCounts { x: u32, y: u32 },
}

impl Resolution {
    /// Checks the resolution against the domain it will sample.
    ///
    /// The domain itself is validated first so an empty axis is always reported
    /// as [`GridError::InvalidDomain`].
    pub fn validate_for(&self, domain: &Domain) -> Result<(), GridError> {
        domain.validate()?;
        match *self {
            Self::StepSize(step) => {
                if !step.is_finite() || step <= 0.0 {
                    return Err(GridError::InvalidResolution(format!(
                        "step size must be a positive number, got {step}"
                    )));
                }
                if domain.x_extent() < step || domain.y_extent() < step {
                    return Err(GridError::InvalidResolution(format!(
                        "step size {step} exceeds the domain extent ({} × {})",
                        domain.x_extent(),
                        domain.y_extent()
                    )));
                }
                if domain.x_extent() / step > MAX_SAMPLES_PER_AXIS
                    || domain.y_extent() / step > MAX_SAMPLES_PER_AXIS
                {
                    return Err(GridError::InvalidResolution(format!(
                        "step size {step} yields more than {MAX_SAMPLES_PER_AXIS} samples per axis"
                    )));
                }
                // The walk must move at both ends of each axis.
                for (axis, min, max) in [
                    ('x', domain.x_min, domain.x_max),
                    ('y', domain.y_min, domain.y_max),
                ] {
                    if min + step == min || max + step == max {
                        return Err(GridError::InvalidResolution(format!(
                            "step size {step} is below the floating point resolution of the {axis} domain [{min}, {max}]"
                        )));
                    }
                }
                check_total_samples(
                    (domain.x_extent() / step).floor() + 1.0,
                    (domain.y_extent() / step).floor() + 1.0,
                )?;
            }
            Self::IntervalCounts { x, y } => {
                if x == 0 || y == 0 {
                    return Err(GridError::InvalidResolution(format!(
                        "interval counts must be at least 1, got {x} × {y}"
                    )));
                }
                if f64::from(x) > MAX_SAMPLES_PER_AXIS || f64::from(y) > MAX_SAMPLES_PER_AXIS {
                    return Err(GridError::InvalidResolution(format!(
                        "interval counts {x} × {y} exceed {MAX_SAMPLES_PER_AXIS} per axis"
                    )));
                }
                check_total_samples(f64::from(x) + 1.0, f64::from(y) + 1.0)?;
            }
        }
        Ok(())
    }
}

fn check_total_samples(x_samples: f64, y_samples: f64) -> Result<(), GridError> {
    if x_samples * y_samples > MAX_TOTAL_SAMPLES {
        return Err(GridError::InvalidResolution(format!(
            "grid of {x_samples} × {y_samples} points exceeds {MAX_TOTAL_SAMPLES} points"
        )));
    }
    Ok(())
}

// ============================================================================
// PointGrid
// ============================================================================

/// Row-major grid of surface points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointGrid {
    rows: Vec<Vec<Point3>>,
}

impl PointGrid {
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<Point3>>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Point3>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<Point3>] {
        &mut self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<Point3>> {
        self.rows
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Total number of points over all rows.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Shortest and longest row length, `None` for a grid without rows.
    #[must_use]
    pub fn row_len_range(&self) -> Option<(usize, usize)> {
        let mut lengths = self.rows.iter().map(Vec::len);
        let first = lengths.next()?;
        Some(lengths.fold((first, first), |(lo, hi), len| (lo.min(len), hi.max(len))))
    }

    #[must_use]
    pub fn is_rectangular(&self) -> bool {
        matches!(self.row_len_range(), Some((lo, hi)) if lo == hi) || self.rows.is_empty()
    }

    /// Fails with [`GridError::RaggedRows`] naming the first row whose length
    /// differs from the first row.
    pub fn ensure_rectangular(&self) -> Result<(), GridError> {
        check_rectangular(&self.rows)
    }

    pub fn points(&self) -> impl Iterator<Item = &Point3> {
        self.rows.iter().flatten()
    }

    pub fn points_mut(&mut self) -> impl Iterator<Item = &mut Point3> {
        self.rows.iter_mut().flatten()
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.points())
    }

    /// Swap rows and columns. Requires a rectangular grid.
    pub fn transpose(&self) -> Result<Self, GridError> {
        transpose_rows(&self.rows).map(Self::from_rows)
    }

    /// Plain nested arrays, the shape handed to hosts.
    #[must_use]
    pub fn to_arrays(&self) -> Vec<Vec<[f64; 3]>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|p| p.to_array()).collect())
            .collect()
    }
}

fn check_rectangular<T>(rows: &[Vec<T>]) -> Result<(), GridError> {
    let Some(expected) = rows.first().map(Vec::len) else {
        return Ok(());
    };
    match rows.iter().position(|row| row.len() != expected) {
        Some(row) => Err(GridError::RaggedRows {
            row,
            expected,
            found: rows[row].len(),
        }),
        None => Ok(()),
    }
}

/// Transpose a rectangular table: `result[i][j] == rows[j][i]`.
///
/// Used both for point grids and for the line handles of rail sketches.
pub fn transpose_rows<T: Clone>(rows: &[Vec<T>]) -> Result<Vec<Vec<T>>, GridError> {
    check_rectangular(rows)?;
    let columns = rows.first().map_or(0, Vec::len);
    let transposed = (0..columns)
        .map(|column| rows.iter().map(|row| row[column].clone()).collect())
        .collect();
    Ok(transposed)
}

// ============================================================================
// Sampling
// ============================================================================

/// Build the (x, y) grid for `domain` at `resolution`. Elevations are left at zero.
pub fn sample_xy_grid(domain: &Domain, resolution: Resolution) -> Result<PointGrid, GridError> {
    resolution.validate_for(domain)?;

    let rows = match resolution {
        Resolution::StepSize(step) => sample_by_step(domain, step),
        Resolution::IntervalCounts { x, y } => sample_by_intervals(domain, x, y),
    };
    Ok(PointGrid::from_rows(rows))
}

fn sample_by_step(domain: &Domain, step: f64) -> Vec<Vec<Point3>> {
    let ys = walk_axis(domain.y_min, domain.y_max, step);
    walk_axis(domain.x_min, domain.x_max, step)
        .into_iter()
        .map(|x| ys.iter().map(|&y| Point3::xy(x, y)).collect())
        .collect()
}

/// Coordinates from `min` in steps of `step` while still within `max`.
///
/// The walk accumulates the step, so rounding decides whether a bound that is
/// a multiple of the step is reached. It never takes more than one sample past
/// the exact count, nor does it continue once the coordinate stops moving.
fn walk_axis(min: f64, max: f64, step: f64) -> Vec<f64> {
    let limit = ((max - min) / step).floor() as usize + 2;
    let mut values = Vec::with_capacity(limit);
    let mut value = min;
    while value <= max && values.len() < limit {
        values.push(value);
        let next = value + step;
        if next <= value {
            break;
        }
        value = next;
    }
    values
}

fn sample_by_intervals(domain: &Domain, count_x: u32, count_y: u32) -> Vec<Vec<Point3>> {
    let (nx, ny) = (f64::from(count_x), f64::from(count_y));
    (0..=count_x)
        .map(|i| {
            let x = (f64::from(i) / nx) * domain.x_extent() + domain.x_min;
            (0..=count_y)
                .map(|j| {
                    let y = (f64::from(j) / ny) * domain.y_extent() + domain.y_min;
                    Point3::xy(x, y)
                })
                .collect()
        })
        .collect()
}

// ============================================================================
// Centering
// ============================================================================

/// Shift the grid so its own x and y extents are centred on the origin.
///
/// The reference points are the grid's first and last row (x) and the first
/// row's first and last column (y), not the requested domain, so grids whose
/// stepping stopped short of the upper bound are centred on what was sampled.
/// Returns the `(x, y)` offsets that were subtracted.
pub fn center_grid(grid: &mut PointGrid) -> (f64, f64) {
    let (Some(first_row), Some(last_row)) = (grid.rows.first(), grid.rows.last()) else {
        return (0.0, 0.0);
    };
    let (Some(first), Some(last_in_first_row), Some(first_in_last_row)) =
        (first_row.first(), first_row.last(), last_row.first())
    else {
        return (0.0, 0.0);
    };

    let x_offset = (first.x + first_in_last_row.x) / 2.0;
    let y_offset = (first.y + last_in_first_row.y) / 2.0;

    for point in grid.points_mut() {
        point.x -= x_offset;
        point.y -= y_offset;
    }

    log::debug!("grid centred with offsets x={x_offset} y={y_offset}");
    (x_offset, y_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_swaps_indices() {
        let rows = vec![vec![1, 2, 3], vec![4, 5, 6]];
        let transposed = transpose_rows(&rows).expect("rectangular");
        assert_eq!(transposed, vec![vec![1, 4], vec![2, 5], vec![3, 6]]);
    }

    #[test]
    fn transpose_rejects_ragged_rows() {
        let rows = vec![vec![1, 2, 3], vec![4, 5]];
        assert_eq!(
            transpose_rows(&rows),
            Err(GridError::RaggedRows {
                row: 1,
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn transpose_of_empty_table_is_empty() {
        let rows: Vec<Vec<u8>> = Vec::new();
        assert!(transpose_rows(&rows).expect("empty").is_empty());
    }

    #[test]
    fn row_len_range_reports_extremes() {
        let grid = PointGrid::from_rows(vec![
            vec![Point3::ORIGIN; 3],
            vec![Point3::ORIGIN; 5],
            vec![Point3::ORIGIN; 4],
        ]);
        assert_eq!(grid.row_len_range(), Some((3, 5)));
        assert!(!grid.is_rectangular());
        assert_eq!(grid.vertex_count(), 12);
    }

    #[test]
    fn walk_stops_when_coordinate_does_not_move() {
        assert_eq!(walk_axis(1e16, 1e16 + 100.0, 1.0), vec![1e16]);
        assert_eq!(walk_axis(0.0, 1.0, 0.5), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn center_grid_on_empty_grid_is_noop() {
        let mut grid = PointGrid::default();
        assert_eq!(center_grid(&mut grid), (0.0, 0.0));
    }

    #[test]
    fn domain_validation_names_the_axis() {
        let domain = Domain::new(0.0, 1.0, 2.0, 2.0);
        assert_eq!(
            domain.validate(),
            Err(GridError::InvalidDomain {
                axis: 'y',
                min: 2.0,
                max: 2.0
            })
        );
    }
}
