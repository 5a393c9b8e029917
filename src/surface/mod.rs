//! Surface requests and the generation pipeline.

mod base;
mod error;
mod pipeline;
mod request;

pub use base::{BasePolicy, UnknownBasePolicy, add_base_points};
pub use error::SurfaceError;
pub use pipeline::{
    BuildPlan, GenerationReport, SurfacePoints, calculate_points, generate, generate_with_options,
    plan, preview, preview_points,
};
pub use request::{
    DEFAULT_EQUATION, EXAMPLE_EQUATIONS, ResolutionMode, SurfaceRequest, VertexBudget,
    example_equation,
};
