use eds_engine::SurfaceEngine;
use eds_engine::build::{BuildOptions, BuildStage, TimelineGroup};
use eds_engine::geom::{Domain, Point3, PointGrid, Tolerance};
use eds_engine::kernel::{BodyId, KernelOp, PlaneRef, RecordingKernel, SectionId, SectionMode};
use eds_engine::surface::{
    self, BasePolicy, SurfaceError, SurfaceRequest, VertexBudget, example_equation,
};

fn lofts(kernel: &RecordingKernel) -> Vec<[SectionId; 2]> {
    kernel
        .ops()
        .iter()
        .filter_map(|op| match op {
            KernelOp::CreateLoft { sections, .. } => Some(*sections),
            _ => None,
        })
        .collect()
}

fn stitches(kernel: &RecordingKernel) -> Vec<(Vec<BodyId>, f64)> {
    kernel
        .ops()
        .iter()
        .filter_map(|op| match op {
            KernelOp::Stitch { bodies, tolerance } => Some((bodies.clone(), *tolerance)),
            _ => None,
        })
        .collect()
}

fn group(start: usize, end: usize, name: &'static str) -> TimelineGroup {
    TimelineGroup { start, end, name }
}

#[test]
fn engine_starts_with_default_request() {
    let engine = SurfaceEngine::new();
    assert_eq!(engine.request(), &SurfaceRequest::default());
    assert_eq!(engine.estimate_vertices(), 64.0);
}

#[test]
fn paraboloid_is_centred_with_zero_minimum() {
    let request = SurfaceRequest::new("x**2+y**2").with_intervals(10, 10);
    let points = surface::calculate_points(&request).expect("valid request");
    let tol = Tolerance::LOOSE;

    assert_eq!(points.grid.row_count(), 11);
    assert!(points.grid.rows().iter().all(|row| row.len() == 11));
    assert!(tol.approx_zero_f64(points.min_z));
    assert!(tol.approx_zero_f64(points.offsets[0]));
    assert!(tol.approx_zero_f64(points.offsets[1]));

    let bbox = points.grid.bbox().expect("points");
    assert!(tol.approx_eq_f64(bbox.min.x, -bbox.max.x));
    assert!(tol.approx_eq_f64(bbox.min.y, -bbox.max.y));
    assert!(tol.approx_eq_f64(bbox.max.z, 32.0));
}

#[test]
fn fixed_plane_base_sits_at_offset() {
    let request = SurfaceRequest::new("x**2+y**2")
        .with_intervals(10, 10)
        .with_base(BasePolicy::FixedPlane, -1.0);
    let points = surface::calculate_points(&request).expect("valid request");

    assert_eq!(points.base_level, Some(-1.0));
    for row in points.grid.rows() {
        assert_eq!(row.len(), 13);
        assert_eq!(row[11].z, -1.0);
        assert_eq!(row[12].z, -1.0);
        assert_eq!(row[11].y, row[10].y);
        assert_eq!(row[12].y, row[0].y);
    }
}

#[test]
fn step_larger_than_domain_is_rejected_before_any_geometry() {
    let request = SurfaceRequest::new("x*y")
        .with_domain(Domain::new(0.0, 0.5, 0.0, 2.0))
        .with_step_size(1.0);
    let mut kernel = RecordingKernel::new();

    let error = surface::generate(&request, &mut kernel).unwrap_err();
    assert!(matches!(error, SurfaceError::InvalidResolution(_)));
    assert!(error.is_input_error());
    assert!(kernel.ops().is_empty());
}

#[test]
fn three_open_sections_loft_backwards_and_stitch_once() {
    let request = SurfaceRequest::new("x - y").with_intervals(2, 3);
    let mut kernel = RecordingKernel::new();
    let report = surface::generate(&request, &mut kernel).expect("built");

    assert_eq!(kernel.sections_with_mode(SectionMode::Path).len(), 3);
    assert_eq!(
        lofts(&kernel),
        vec![
            [SectionId(2), SectionId(1)],
            [SectionId(1), SectionId(0)],
        ]
    );
    assert_eq!(stitches(&kernel), vec![(vec![BodyId(0), BodyId(1)], 1.0)]);
    assert!(report.construction.stitched);
    assert_eq!(
        report.construction.timeline_groups,
        vec![
            group(7, 9, "Loft & Stitch"),
            group(3, 6, "Rails"),
            group(0, 2, "Loft Paths"),
        ]
    );
}

#[test]
fn solid_uses_profiles_and_skips_stitch() {
    let request = SurfaceRequest::new("x + y")
        .with_intervals(2, 2)
        .with_base(BasePolicy::FixedPlane, -10.0);
    let mut kernel = RecordingKernel::new();
    let report = surface::generate(&request, &mut kernel).expect("built");

    assert_eq!(kernel.sections_with_mode(SectionMode::Profile).len(), 3);
    assert_eq!(kernel.sections_with_mode(SectionMode::Polyline).len(), 5);
    assert!(stitches(&kernel).is_empty());
    assert!(!report.construction.stitched);
    assert_eq!(report.construction.loft_count, 2);
    assert_eq!(
        report.construction.timeline_groups,
        vec![
            group(8, 9, "Loft"),
            group(3, 7, "Rails"),
            group(0, 2, "Loft Profiles"),
        ]
    );
}

#[test]
fn groups_follow_existing_timeline_items() {
    let request = SurfaceRequest::new("x - y").with_intervals(2, 3);
    let mut kernel = RecordingKernel::with_existing_features(5);
    surface::generate(&request, &mut kernel).expect("built");

    let ranges: Vec<(usize, usize)> = kernel
        .groups()
        .iter()
        .map(|group| (group.start, group.end))
        .collect();
    assert_eq!(ranges, vec![(12, 14), (8, 11), (5, 7)]);
}

#[test]
fn grouping_can_be_disabled() {
    let request = SurfaceRequest::new("x - y").with_intervals(2, 3);
    let mut kernel = RecordingKernel::new();
    let options = BuildOptions::new(PlaneRef::Xy).with_timeline_groups(false);
    let report = surface::generate_with_options(&request, &mut kernel, &options).expect("built");

    assert!(report.construction.timeline_groups.is_empty());
    assert!(kernel.groups().is_empty());
}

#[test]
fn loft_failure_reports_stage_and_keeps_earlier_geometry() {
    let request = SurfaceRequest::new("x - y").with_intervals(3, 3);
    let mut kernel = RecordingKernel::new().fail_loft_at(1);

    let error = surface::generate(&request, &mut kernel).unwrap_err();
    assert!(matches!(
        error,
        SurfaceError::GeometryConstruction {
            stage: BuildStage::Loft,
            ..
        }
    ));
    assert!(!error.is_input_error());
    assert_eq!(kernel.loft_count(), 1);
    assert_eq!(kernel.sketch_count(), 8);
    assert!(stitches(&kernel).is_empty());
}

#[test]
fn preview_swallows_invalid_equations() {
    let mut kernel = RecordingKernel::new();
    let request = SurfaceRequest::new("x + unknown_var");
    assert!(surface::preview(&request, &mut kernel).is_none());
    assert!(kernel.ops().is_empty());

    let request = SurfaceRequest::new(example_equation("cone").expect("preset"));
    let points = surface::preview(&request, &mut kernel).expect("preview");
    assert_eq!(points.grid.vertex_count(), 81);
    assert_eq!(kernel.sketch_count(), 1);
}

#[test]
fn clamped_request_fits_budget_and_builds() {
    let request = SurfaceRequest::new("sin(x+y)-cos(x)").with_intervals(40, 40);
    let budget = VertexBudget::default();
    assert!(budget.exceeds(&request));

    let clamped = budget.clamp(&request);
    assert!(!budget.exceeds(&clamped));

    let plan = surface::plan(&clamped).expect("planned");
    assert_eq!(plan.report.construction.section_count, 18);
    assert_eq!(plan.report.construction.loft_count, 17);
    assert!(plan.report.vertex_estimate <= budget.max_vertices);
}

#[test]
fn ragged_grid_is_rejected_by_builder() {
    let grid = PointGrid::from_rows(vec![
        vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
        vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
        ],
    ]);
    let mut kernel = RecordingKernel::new();
    let mut metrics = eds_engine::geom::SurfaceMetrics::default();
    let error = eds_engine::build::construct(
        &mut kernel,
        &grid,
        false,
        &BuildOptions::default(),
        &mut metrics,
    )
    .unwrap_err();

    assert_eq!(error.stage(), None);
    assert!(kernel.ops().is_empty());
}
