use crate::geom::{Point3, PointGrid, transpose_rows};
use crate::kernel::{GeometryKernel, KernelError, PlaneRef, SectionMode};

use super::{BuildError, BuildStage};

/// A finished section together with the lines drawn between its points.
///
/// For profiles the closing line is not part of `lines`.
pub struct BuiltSection<K: GeometryKernel + ?Sized> {
    pub section: K::Section,
    pub lines: Vec<K::Line>,
}

/// Rail lines grouped per loft: `rails[i]` guides the loft between section
/// `i` and section `i + 1`, one line per grid column.
#[derive(Debug, Clone, PartialEq)]
pub struct RailSet<L> {
    pub rails: Vec<Vec<L>>,
    /// Number of sketches drawn for the rails, one per grid column.
    pub sketch_count: usize,
}

/// Draw one sketch with a line between every pair of consecutive points.
///
/// A [`SectionMode::Profile`] gets an extra closing line from the last point
/// back to the first.
pub fn make_section<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    plane: PlaneRef,
    points: &[Point3],
    mode: SectionMode,
) -> Result<BuiltSection<K>, KernelError> {
    let sketch = kernel.create_sketch(plane)?;
    let lines = points
        .windows(2)
        .map(|pair| kernel.add_line(&sketch, pair[0], pair[1]))
        .collect::<Result<Vec<_>, _>>()?;

    if mode == SectionMode::Profile {
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            kernel.add_line(&sketch, last, first)?;
        }
    }

    let section = kernel.finish_section(&sketch, mode)?;
    Ok(BuiltSection { section, lines })
}

/// One section per row, in row order.
pub fn make_sections<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    plane: PlaneRef,
    rows: &[Vec<Point3>],
    mode: SectionMode,
) -> Result<Vec<BuiltSection<K>>, KernelError> {
    rows.iter()
        .map(|row| make_section(kernel, plane, row, mode))
        .collect()
}

/// Draw every grid column as a polyline and regroup the lines per loft.
pub fn make_rails<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    plane: PlaneRef,
    grid: &PointGrid,
) -> Result<RailSet<K::Line>, BuildError> {
    let columns = grid.transpose()?;
    let polylines = make_sections(kernel, plane, columns.rows(), SectionMode::Polyline)
        .map_err(BuildError::kernel(BuildStage::Rails))?;

    let lines_per_column: Vec<Vec<K::Line>> =
        polylines.into_iter().map(|built| built.lines).collect();
    let rails = transpose_rows(&lines_per_column)?;

    Ok(RailSet {
        rails,
        sketch_count: lines_per_column.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KernelOp, LineId, RecordingKernel};

    fn grid_3x4() -> PointGrid {
        PointGrid::from_rows(
            (0..3)
                .map(|i| {
                    (0..4)
                        .map(|j| Point3::new(f64::from(i), f64::from(j), f64::from(i * j)))
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn path_section_draws_open_chain() {
        let mut kernel = RecordingKernel::new();
        let grid = grid_3x4();
        let row = &grid.rows()[1];
        let built = make_section(&mut kernel, PlaneRef::Xy, row, SectionMode::Path).expect("path");
        assert_eq!(built.lines.len(), 3);
        assert_eq!(kernel.line_count(), 3);
    }

    #[test]
    fn profile_section_adds_closing_line() {
        let mut kernel = RecordingKernel::new();
        let row = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 2.0),
            Point3::new(0.0, 1.0, -1.0),
            Point3::new(0.0, 0.0, -1.0),
        ];
        let built =
            make_section(&mut kernel, PlaneRef::Xy, &row, SectionMode::Profile).expect("profile");
        assert_eq!(built.lines.len(), 3);
        assert_eq!(kernel.line_count(), 4);
        let closing = kernel.ops().iter().rev().find_map(|op| match op {
            KernelOp::AddLine { start, end, .. } => Some((*start, *end)),
            _ => None,
        });
        assert_eq!(closing, Some((row[3], row[0])));
    }

    #[test]
    fn one_sketch_per_row() {
        let mut kernel = RecordingKernel::new();
        let grid = grid_3x4();
        let sections =
            make_sections(&mut kernel, PlaneRef::Xy, grid.rows(), SectionMode::Path).expect("paths");
        assert_eq!(sections.len(), 3);
        assert_eq!(kernel.sketch_count(), 3);
    }

    #[test]
    fn rails_connect_consecutive_rows() {
        let mut kernel = RecordingKernel::new();
        let grid = grid_3x4();
        let rail_set = make_rails(&mut kernel, PlaneRef::Xy, &grid).expect("rails");

        assert_eq!(rail_set.sketch_count, 4);
        assert_eq!(rail_set.rails.len(), 2);
        assert!(rail_set.rails.iter().all(|lines| lines.len() == 4));

        // Column j is drawn as sketch j with lines (row0→row1, row1→row2), so
        // rails[i][j] is line 2 * j + i.
        assert_eq!(rail_set.rails[0], vec![LineId(0), LineId(2), LineId(4), LineId(6)]);
        assert_eq!(rail_set.rails[1], vec![LineId(1), LineId(3), LineId(5), LineId(7)]);
    }

    #[test]
    fn ragged_grid_cannot_have_rails() {
        let mut kernel = RecordingKernel::new();
        let grid = PointGrid::from_rows(vec![
            vec![Point3::xy(0.0, 0.0), Point3::xy(0.0, 1.0)],
            vec![Point3::xy(1.0, 0.0)],
        ]);
        let error = make_rails(&mut kernel, PlaneRef::Xy, &grid).unwrap_err();
        assert!(matches!(error, BuildError::Grid(_)));
        assert_eq!(kernel.sketch_count(), 0);
    }
}
