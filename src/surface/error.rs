use crate::build::{BuildError, BuildStage};
use crate::expression::ExpressionError;
use crate::geom::{EvaluationError, GridError};
use crate::kernel::KernelError;

/// Everything that can stop a surface from being generated.
///
/// Request, equation and evaluation errors are raised before the first
/// kernel call. Kernel failures leave already created geometry in place.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    #[error("invalid domain: {0}")]
    InvalidDomain(GridError),
    #[error("invalid resolution: {0}")]
    InvalidResolution(GridError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("geometry construction failed during {stage}: {source}")]
    GeometryConstruction {
        stage: BuildStage,
        #[source]
        source: KernelError,
    },
    #[error("cannot build surface: {0}")]
    Build(BuildError),
}

impl From<GridError> for SurfaceError {
    fn from(error: GridError) -> Self {
        match error {
            GridError::InvalidDomain { .. } => Self::InvalidDomain(error),
            GridError::InvalidResolution(_) => Self::InvalidResolution(error),
            GridError::RaggedRows { .. } => Self::Build(BuildError::Grid(error)),
        }
    }
}

impl From<BuildError> for SurfaceError {
    fn from(error: BuildError) -> Self {
        match error {
            BuildError::Kernel { stage, source } => Self::GeometryConstruction { stage, source },
            other => Self::Build(other),
        }
    }
}

impl SurfaceError {
    /// `true` when the request itself must change; `false` for host failures.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::GeometryConstruction { .. })
    }
}
