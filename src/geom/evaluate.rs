//! Elevation of a sampled grid by a surface equation.

use crate::expression::{CompiledExpression, ExpressionError};

use super::grid::PointGrid;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// The equation produced NaN or an infinity, e.g. `sqrt(-1)` or `1/x` at x = 0.
    #[error("equation is not defined at ({x}, {y}): evaluated to {value}")]
    NonFinite { x: f64, y: f64, value: f64 },
    #[error("equation failed at ({x}, {y}): {source}")]
    Expression {
        x: f64,
        y: f64,
        #[source]
        source: ExpressionError,
    },
    #[error("grid has no points to evaluate")]
    EmptyGrid,
}

/// Store `f(x, y)` as the z of every point and return the smallest z.
///
/// Points are visited in row-major order. The minimum is seeded with the
/// first point's value.
pub fn add_z_dimension(
    grid: &mut PointGrid,
    expression: &CompiledExpression,
) -> Result<f64, EvaluationError> {
    let mut min_z: Option<f64> = None;

    for point in grid.points_mut() {
        let (x, y) = (point.x, point.y);
        let value = expression
            .eval(x, y)
            .map_err(|source| EvaluationError::Expression { x, y, source })?;
        if !value.is_finite() {
            return Err(EvaluationError::NonFinite { x, y, value });
        }
        point.z = value;
        min_z = Some(min_z.map_or(value, |current| current.min(value)));
    }

    min_z.ok_or(EvaluationError::EmptyGrid)
}
