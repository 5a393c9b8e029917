mod core;
mod diagnostics;
mod evaluate;
mod grid;
mod metrics;

pub use core::{BBox, Point3, Tolerance, Vec3};
pub use diagnostics::GridDiagnostics;
pub use evaluate::{EvaluationError, add_z_dimension};
pub use grid::{
    Domain, GridError, MAX_SAMPLES_PER_AXIS, MAX_TOTAL_SAMPLES, PointGrid, Resolution,
    center_grid, sample_xy_grid, transpose_rows,
};
pub use metrics::{SurfaceMetrics, SurfaceTimingReport, TimingBucket};
