use serde::Serialize;

use crate::geom::{PointGrid, SurfaceMetrics, TimingBucket};
use crate::kernel::{GeometryKernel, PlaneRef, SectionMode};

use super::sections::{make_rails, make_sections};
use super::timeline::{TimelineGroup, apply_timeline_groups};
use super::{BuildError, BuildStage};

/// Options for turning a grid into host geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    /// Plane for every sketch.
    pub plane: PlaneRef,
    /// Tolerance handed to the stitch of open surfaces.
    pub stitch_tolerance: f64,
    /// Group the created items on the host timeline afterwards.
    pub group_timeline: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            plane: PlaneRef::Xy,
            stitch_tolerance: 1.0,
            group_timeline: true,
        }
    }
}

impl BuildOptions {
    #[must_use]
    pub fn new(plane: PlaneRef) -> Self {
        Self {
            plane,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_stitch_tolerance(mut self, tolerance: f64) -> Self {
        self.stitch_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_timeline_groups(mut self, enabled: bool) -> Self {
        self.group_timeline = enabled;
        self
    }
}

/// What [`loft_multiple`] created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoftOutcome {
    pub loft_count: usize,
    pub stitched: bool,
}

/// Summary of one [`construct`] run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConstructionReport {
    pub section_count: usize,
    pub rail_sketch_count: usize,
    pub loft_count: usize,
    pub stitched: bool,
    pub timeline_groups: Vec<TimelineGroup>,
}

/// Loft every pair of consecutive sections along the rails between them.
///
/// Sections and rails are walked from the last row to the first, which gives
/// open surfaces outward facing normals. Open surfaces are stitched into one
/// body when more than one loft was made; solids join at every loft instead.
pub fn loft_multiple<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    mut sections: Vec<K::Section>,
    mut rails: Vec<Vec<K::Line>>,
    has_base: bool,
    stitch_tolerance: f64,
) -> Result<LoftOutcome, BuildError> {
    if sections.len() < 2 || rails.len() + 1 != sections.len() {
        return Err(BuildError::NotEnoughSections {
            rows: sections.len(),
            columns: rails.first().map_or(0, Vec::len),
        });
    }
    sections.reverse();
    rails.reverse();

    let mut bodies = Vec::new();
    for (pair, loft_rails) in sections.windows(2).zip(&rails) {
        let (_feature, body) = kernel
            .create_loft((&pair[0], &pair[1]), loft_rails)
            .map_err(BuildError::kernel(BuildStage::Loft))?;
        if !has_base {
            bodies.push(body);
        }
    }

    let stitched = !has_base && bodies.len() > 1;
    if stitched {
        kernel
            .stitch(&bodies, stitch_tolerance)
            .map_err(BuildError::kernel(BuildStage::Stitch))?;
    }

    Ok(LoftOutcome {
        loft_count: sections.len() - 1,
        stitched,
    })
}

/// Build the full loft for `grid`: sections, rails, lofts and timeline groups.
///
/// With `has_base` the rows are expected to already carry their base points
/// and are drawn as closed profiles; otherwise they are open paths. The grid
/// shape is checked before the first kernel call. A failing kernel call stops
/// construction; geometry created up to that point stays on the host.
pub fn construct<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    grid: &PointGrid,
    has_base: bool,
    options: &BuildOptions,
    metrics: &mut SurfaceMetrics,
) -> Result<ConstructionReport, BuildError> {
    grid.ensure_rectangular()?;
    let rows = grid.row_count();
    let columns = grid.rows().first().map_or(0, Vec::len);
    if rows < 2 || columns < 2 {
        return Err(BuildError::NotEnoughSections { rows, columns });
    }

    let mode = if has_base {
        SectionMode::Profile
    } else {
        SectionMode::Path
    };
    let sections = metrics
        .time(TimingBucket::Sections, || {
            make_sections(kernel, options.plane, grid.rows(), mode)
        })
        .map_err(BuildError::kernel(BuildStage::Sections))?;
    let rail_set = metrics.time(TimingBucket::Rails, || {
        make_rails(kernel, options.plane, grid)
    })?;

    let section_count = sections.len();
    let sections = sections.into_iter().map(|built| built.section).collect();
    let outcome = metrics.time(TimingBucket::Lofts, || {
        loft_multiple(
            kernel,
            sections,
            rail_set.rails,
            has_base,
            options.stitch_tolerance,
        )
    })?;

    let timeline_groups = if options.group_timeline {
        metrics
            .time(TimingBucket::Timeline, || {
                apply_timeline_groups(kernel, section_count, rail_set.sketch_count, has_base)
            })
            .map_err(BuildError::kernel(BuildStage::Timeline))?
    } else {
        Vec::new()
    };

    log::debug!(
        "constructed {section_count} sections, {} rail sketches, {} lofts (stitched: {})",
        rail_set.sketch_count,
        outcome.loft_count,
        outcome.stitched
    );

    Ok(ConstructionReport {
        section_count,
        rail_sketch_count: rail_set.sketch_count,
        loft_count: outcome.loft_count,
        stitched: outcome.stitched,
        timeline_groups,
    })
}
