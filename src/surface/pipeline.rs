//! End-to-end generation: request → points → host geometry.

use serde::Serialize;

use crate::build::{BuildOptions, BuildStage, ConstructionReport, construct};
use crate::expression::CompiledExpression;
use crate::geom::{
    GridDiagnostics, PointGrid, Resolution, SurfaceMetrics, SurfaceTimingReport, TimingBucket,
    add_z_dimension, center_grid, sample_xy_grid,
};
use crate::kernel::{GeometryKernel, KernelError, KernelOp, RecordingKernel};

use super::base::add_base_points;
use super::error::SurfaceError;
use super::request::{SurfaceRequest, VertexBudget};

/// The evaluated, centred grid of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfacePoints {
    /// Rows of points; with a base every row ends in its two base points.
    pub grid: PointGrid,
    /// Lowest elevation of the surface itself, base points excluded.
    pub min_z: f64,
    /// Elevation of the base plane, `None` without a base.
    pub base_level: Option<f64>,
    /// `[x, y]` shift applied to center the grid on the origin.
    pub offsets: [f64; 2],
    /// Taken before centering and before base points are added.
    pub diagnostics: GridDiagnostics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub min_z: f64,
    pub base_level: Option<f64>,
    pub offsets: [f64; 2],
    pub vertex_estimate: f64,
    pub construction: ConstructionReport,
    pub diagnostics: GridDiagnostics,
    pub timing: Option<SurfaceTimingReport>,
}

/// Every kernel call a generation would make, recorded without a host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildPlan {
    pub report: GenerationReport,
    pub ops: Vec<KernelOp>,
}

/// Sample, evaluate, center and (optionally) close the request's surface.
///
/// No geometry is created; all validation errors surface here.
pub fn calculate_points(request: &SurfaceRequest) -> Result<SurfacePoints, SurfaceError> {
    calculate_points_with_metrics(request, &mut SurfaceMetrics::default())
}

fn calculate_points_with_metrics(
    request: &SurfaceRequest,
    metrics: &mut SurfaceMetrics,
) -> Result<SurfacePoints, SurfaceError> {
    request.validate()?;
    let expression = CompiledExpression::compile(&request.equation)?;
    let resolution = request.resolution();

    let mut grid = metrics.time(TimingBucket::Sampling, || {
        sample_xy_grid(&request.domain, resolution)
    })?;
    let min_z = metrics.time(TimingBucket::Evaluation, || {
        add_z_dimension(&mut grid, &expression)
    })?;

    let mut diagnostics = GridDiagnostics::from_grid(&grid);
    if matches!(resolution, Resolution::StepSize(_)) {
        diagnostics.check_coverage(&request.domain);
    }
    log::debug!("sampled `{}`: {}", expression.source(), diagnostics.summary());

    let (offsets, base_level) = metrics.time(TimingBucket::Normalization, || {
        let (x_offset, y_offset) = center_grid(&mut grid);
        let base_level = request.has_base.then(|| {
            let level = request.base_type.base_level(min_z, request.base_offset);
            add_base_points(&mut grid, level);
            level
        });
        ([x_offset, y_offset], base_level)
    });
    if let Some(level) = base_level {
        log::debug!("base level {level} ({}, min_z {min_z})", request.base_type);
    }

    Ok(SurfacePoints {
        grid,
        min_z,
        base_level,
        offsets,
        diagnostics,
    })
}

/// Generate the surface with default build options in the request's plane.
pub fn generate<K: GeometryKernel + ?Sized>(
    request: &SurfaceRequest,
    kernel: &mut K,
) -> Result<GenerationReport, SurfaceError> {
    generate_with_options(request, kernel, &BuildOptions::new(request.plane))
}

/// Generate the surface and build it through `kernel`.
///
/// Errors are never swallowed here. A kernel failure is reported with the
/// stage it happened in; geometry created before it is not removed.
pub fn generate_with_options<K: GeometryKernel + ?Sized>(
    request: &SurfaceRequest,
    kernel: &mut K,
    options: &BuildOptions,
) -> Result<GenerationReport, SurfaceError> {
    let vertex_estimate = VertexBudget::estimate(request);
    let budget = VertexBudget::default();
    if budget.exceeds(request) {
        log::warn!(
            "about {vertex_estimate:.0} vertices requested (budget {}); construction may be slow",
            budget.max_vertices
        );
    }

    let mut metrics = SurfaceMetrics::default();
    metrics.begin();
    let points = calculate_points_with_metrics(request, &mut metrics)?;

    let construction = construct(kernel, &points.grid, request.has_base, options, &mut metrics)
        .inspect_err(|error| log::warn!("surface construction stopped: {error}"))?;

    Ok(GenerationReport {
        min_z: points.min_z,
        base_level: points.base_level,
        offsets: points.offsets,
        vertex_estimate,
        construction,
        diagnostics: points.diagnostics,
        timing: metrics.end(),
    })
}

/// Run the generation against a [`RecordingKernel`] and return its calls.
pub fn plan(request: &SurfaceRequest) -> Result<BuildPlan, SurfaceError> {
    let mut kernel = RecordingKernel::new();
    let report = generate(request, &mut kernel)?;
    Ok(BuildPlan {
        report,
        ops: kernel.into_ops(),
    })
}

/// Plot the request's points into one sketch.
pub fn preview_points<K: GeometryKernel + ?Sized>(
    request: &SurfaceRequest,
    kernel: &mut K,
) -> Result<SurfacePoints, SurfaceError> {
    let points = calculate_points(request)?;
    let as_preview_error = |source: KernelError| SurfaceError::GeometryConstruction {
        stage: BuildStage::Preview,
        source,
    };

    let sketch = kernel.create_sketch(request.plane).map_err(as_preview_error)?;
    for point in points.grid.points() {
        kernel
            .add_sketch_point(&sketch, *point)
            .map_err(as_preview_error)?;
    }
    Ok(points)
}

/// Preview while the user is still editing: failures are expected and only
/// logged.
pub fn preview<K: GeometryKernel + ?Sized>(
    request: &SurfaceRequest,
    kernel: &mut K,
) -> Option<SurfacePoints> {
    match preview_points(request, kernel) {
        Ok(points) => Some(points),
        Err(error) => {
            log::debug!("preview skipped: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Domain, Tolerance};
    use crate::surface::BasePolicy;

    #[test]
    fn base_points_do_not_change_min_z() {
        let request = SurfaceRequest::new("x + y")
            .with_intervals(2, 2)
            .with_base(BasePolicy::FixedPlane, -10.0);
        let points = calculate_points(&request).expect("valid");
        assert_eq!(points.min_z, -8.0);
        assert_eq!(points.base_level, Some(-10.0));
        assert!(points.grid.rows().iter().all(|row| row.len() == 5));
    }

    #[test]
    fn offsets_are_reported() {
        let request = SurfaceRequest::new("1")
            .with_domain(Domain::new(0.0, 2.0, 10.0, 12.0))
            .with_intervals(2, 2);
        let points = calculate_points(&request).expect("valid");
        assert_eq!(points.offsets, [1.0, 11.0]);
        assert_eq!(points.base_level, None);
    }

    #[test]
    fn diagnostics_describe_uncentred_grid() {
        let request = SurfaceRequest::new("x")
            .with_domain(Domain::new(0.0, 2.0, 0.0, 2.0))
            .with_intervals(2, 2);
        let points = calculate_points(&request).expect("valid");
        assert_eq!(points.diagnostics.bbox_min, Some([0.0, 0.0, 0.0]));
        assert_eq!(points.diagnostics.bbox_max, Some([2.0, 2.0, 2.0]));
    }

    #[test]
    fn preview_plots_every_point_in_one_sketch() {
        let request = SurfaceRequest::default().with_intervals(3, 4);
        let mut kernel = RecordingKernel::new();
        let points = preview(&request, &mut kernel).expect("preview");
        let plotted = kernel
            .ops()
            .iter()
            .filter(|op| matches!(op, KernelOp::AddSketchPoint { .. }))
            .count();
        assert_eq!(plotted, 20);
        assert_eq!(points.grid.vertex_count(), 20);
        assert_eq!(kernel.sketch_count(), 1);
    }

    #[test]
    fn preview_swallows_errors() {
        let request = SurfaceRequest::new("sqrt(-1 - x)");
        let mut kernel = RecordingKernel::new();
        assert!(preview(&request, &mut kernel).is_none());
        assert!(kernel.ops().is_empty());
    }

    #[test]
    fn invalid_equation_fails_before_kernel() {
        let request = SurfaceRequest::new("x +* ");
        let mut kernel = RecordingKernel::new();
        let error = generate(&request, &mut kernel).unwrap_err();
        assert!(matches!(error, SurfaceError::Expression(_)));
        assert!(error.is_input_error());
        assert!(kernel.ops().is_empty());
    }

    #[test]
    fn plan_records_timeline_groups_last() {
        let request = SurfaceRequest::new("x - y").with_intervals(2, 3);
        let plan = plan(&request).expect("planned");
        let last = plan.ops.last().expect("ops");
        assert!(matches!(last, KernelOp::CreateTimelineGroup { name, .. } if name == "Loft Paths"));
        assert_eq!(plan.report.construction.timeline_groups.len(), 3);
    }

    #[test]
    fn generation_report_counts_geometry() {
        let request = SurfaceRequest::new("x*y/4").with_intervals(4, 4);
        let mut kernel = RecordingKernel::new();
        let report = generate(&request, &mut kernel).expect("built");
        assert_eq!(report.construction.section_count, 5);
        assert_eq!(report.construction.rail_sketch_count, 5);
        assert_eq!(report.construction.loft_count, 4);
        assert!(report.construction.stitched);
        assert_eq!(report.vertex_estimate, 25.0);
        assert!(Tolerance::default_geom().approx_eq_f64(report.min_z, -4.0));
    }
}
