//! Sandboxed surface equations `z = f(x, y)`.
//!
//! Equations are parsed once by [`meval`] into a [`CompiledExpression`] and
//! evaluated per grid point afterwards. The language is plain arithmetic
//! (`+ - * / ^` and parentheses, `**` is accepted as an alias for `^`),
//! the variables `x` and `y`, the constants `pi`, `e` and `tau`, and the
//! function whitelist in [`FUNCTIONS`]. Anything else is rejected before the
//! first point is evaluated.
//!
//! `%` is rejected: meval truncates the remainder while the plugin syntax
//! floors it, so remainders are written `mod(a, b)`. `round` rounds halves to
//! even.

use std::f64::consts::TAU;
use std::fmt;
use std::sync::OnceLock;

use meval::{Context, ContextProvider, Expr};
use regex::Regex;

/// Variable names bound to the sample position.
pub const VARIABLES: &[&str] = &["x", "y", "X", "Y"];

/// Named constants available inside an equation.
pub const CONSTANTS: &[&str] = &["pi", "e", "tau"];

/// Every callable name. The first block is built into `meval`, the rest is
/// registered by [`build_context`].
pub const FUNCTIONS: &[&str] = &[
    "sqrt", "exp", "ln", "abs", "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "sinh",
    "cosh", "tanh", "asinh", "acosh", "atanh", "floor", "ceil", "signum", "max", "min",
    // registered below
    "round", "pow", "log", "log10", "log2", "fabs", "hypot", "degrees", "radians", "fmod", "trunc",
    "copysign", "expm1", "log1p", "sign", "clamp", "lerp", "mod",
];

const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Errors raised while compiling or evaluating an equation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("equation is empty")]
    Empty,
    #[error("equation contains unsupported character `{character}` at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("operator `%` at position {position} is not supported; use mod(a, b) for the remainder")]
    RemainderOperator { position: usize },
    #[error("equation could not be parsed: {0}")]
    Parse(String),
    #[error("unknown variable `{name}`{}", suggestion_suffix(.suggestion))]
    UnknownVariable {
        name: String,
        suggestion: Option<String>,
    },
    #[error("unknown function `{name}`{}", suggestion_suffix(.suggestion))]
    UnknownFunction {
        name: String,
        suggestion: Option<String>,
    },
    #[error("equation could not be evaluated: {0}")]
    Evaluate(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(", did you mean `{s}`?"))
        .unwrap_or_default()
}

/// A parsed equation together with its function table.
pub struct CompiledExpression {
    source: String,
    expr: Expr,
    context: Context<'static>,
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl CompiledExpression {
    /// Normalise, whitelist-check and parse `source`.
    ///
    /// A probe evaluation at the origin catches wrong argument counts. Its
    /// numeric result is ignored: a surface that is undefined at the origin
    /// is only an error once the origin is actually sampled.
    pub fn compile(source: &str) -> Result<Self, ExpressionError> {
        let normalized = normalize_expression(source);
        if normalized.is_empty() {
            return Err(ExpressionError::Empty);
        }
        if let Some(position) = normalized.find('%') {
            return Err(ExpressionError::RemainderOperator { position });
        }
        check_characters(&normalized)?;
        check_identifiers(&normalized)?;

        let expr: Expr = normalized
            .parse()
            .map_err(|error: meval::Error| ExpressionError::Parse(error.to_string()))?;

        let compiled = Self {
            source: normalized,
            expr,
            context: build_context(),
        };
        compiled.eval(0.0, 0.0)?;
        Ok(compiled)
    }

    /// The normalised source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate at one sample position. Non-finite results are returned as is.
    pub fn eval(&self, x: f64, y: f64) -> Result<f64, ExpressionError> {
        let sample = SampleContext { x, y };
        self.expr
            .eval_with_context((&sample, &self.context))
            .map_err(|error| match error {
                meval::Error::UnknownVariable(name) => unknown_variable(name),
                other => ExpressionError::Evaluate(other.to_string()),
            })
    }
}

struct SampleContext {
    x: f64,
    y: f64,
}

impl ContextProvider for SampleContext {
    fn get_var(&self, name: &str) -> Option<f64> {
        match name {
            "x" | "X" => Some(self.x),
            "y" | "Y" => Some(self.y),
            _ => None,
        }
    }
}

fn normalize_expression(source: &str) -> String {
    let mut normalized = source.trim().replace("**", "^");
    while normalized.ends_with(';') {
        normalized.pop();
        normalized = normalized.trim_end().to_owned();
    }
    normalized
}

fn allowed_characters() -> &'static Regex {
    static ALLOWED: OnceLock<Regex> = OnceLock::new();
    ALLOWED.get_or_init(|| {
        Regex::new(r"^[0-9A-Za-z_ .,+\-*/^()]*$").unwrap_or_else(|_| unreachable!())
    })
}

fn tokens() -> &'static Regex {
    static TOKENS: OnceLock<Regex> = OnceLock::new();
    TOKENS.get_or_init(|| {
        Regex::new(r"(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?|[A-Za-z_][A-Za-z0-9_]*")
            .unwrap_or_else(|_| unreachable!())
    })
}

fn check_characters(source: &str) -> Result<(), ExpressionError> {
    if allowed_characters().is_match(source) {
        return Ok(());
    }
    let (position, character) = source
        .char_indices()
        .find(|(_, c)| !allowed_characters().is_match(c.encode_utf8(&mut [0; 4])))
        .unwrap_or((0, '?'));
    Err(ExpressionError::InvalidCharacter {
        character,
        position,
    })
}

fn check_identifiers(source: &str) -> Result<(), ExpressionError> {
    for token in tokens().find_iter(source) {
        let name = token.as_str();
        if name.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            continue;
        }
        let is_call = source[token.end()..].trim_start().starts_with('(');
        if is_call {
            if !FUNCTIONS.contains(&name) {
                return Err(ExpressionError::UnknownFunction {
                    name: name.to_owned(),
                    suggestion: suggest(name, FUNCTIONS.iter()),
                });
            }
        } else if !VARIABLES.contains(&name) && !CONSTANTS.contains(&name) {
            return Err(unknown_variable(name.to_owned()));
        }
    }
    Ok(())
}

fn unknown_variable(name: String) -> ExpressionError {
    let suggestion = suggest(&name, VARIABLES.iter().chain(CONSTANTS));
    ExpressionError::UnknownVariable { name, suggestion }
}

/// Closest known name within [`MAX_SUGGESTION_DISTANCE`] edits, ignoring case.
fn suggest<'a>(name: &str, candidates: impl Iterator<Item = &'a &'static str>) -> Option<String> {
    let lowered = name.to_lowercase();
    candidates
        .map(|candidate| (levenshtein::levenshtein(&lowered, &candidate.to_lowercase()), *candidate))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_owned())
}

fn build_context() -> Context<'static> {
    let mut context = Context::new();
    context.var("tau", TAU);
    context.func("round", f64::round_ties_even);
    context.func2("pow", f64::powf);
    context.funcn("log", log_base, 1..3);
    context.func("log10", f64::log10);
    context.func("log2", f64::log2);
    context.func("fabs", f64::abs);
    context.func2("hypot", f64::hypot);
    context.func("degrees", f64::to_degrees);
    context.func("radians", f64::to_radians);
    context.func2("fmod", |a, b| a % b);
    context.func("trunc", f64::trunc);
    context.func2("copysign", f64::copysign);
    context.func("expm1", f64::exp_m1);
    context.func("log1p", f64::ln_1p);
    context.func("sign", sign);
    context.func3("clamp", clamp);
    context.func3("lerp", lerp);
    context.func2("mod", modulo);
    context
}

/// Natural logarithm, or logarithm to the base given as second argument.
fn log_base(args: &[f64]) -> f64 {
    match args {
        [value] => value.ln(),
        [value, base, ..] => value.ln() / base.ln(),
        [] => f64::NAN,
    }
}

fn sign(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value.signum() }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    let lower = min.min(max);
    let upper = min.max(max);
    value.max(lower).min(upper)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Floored modulo: the result takes the sign of the divisor.
fn modulo(dividend: f64, divisor: f64) -> f64 {
    if divisor == 0.0 {
        return f64::NAN;
    }
    let remainder = dividend % divisor;
    if remainder != 0.0 && (remainder < 0.0) != (divisor < 0.0) {
        remainder + divisor
    } else {
        remainder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str, x: f64, y: f64) -> f64 {
        CompiledExpression::compile(source)
            .expect("compiles")
            .eval(x, y)
            .expect("evaluates")
    }

    #[test]
    fn evaluates_default_equation() {
        let source = "cos((2/3)*pow((pow(x,2)+pow(y,2)),(1/2)))+1";
        assert!((eval(source, 0.0, 0.0) - 2.0).abs() < 1e-12);
        let expected = ((2.0_f64 / 3.0) * 5.0).cos() + 1.0;
        assert!((eval(source, 3.0, 4.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn accepts_python_power_operator_and_trailing_semicolon() {
        assert!((eval("x**2 + y**2;", 3.0, 4.0) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn uppercase_variables_are_bound() {
        assert!((eval("X - Y", 5.0, 2.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn log_takes_optional_base() {
        assert!((eval("log(8, 2)", 0.0, 0.0) - 3.0).abs() < 1e-12);
        assert!((eval("log(e)", 0.0, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert!((modulo(-1.0, 3.0) - 2.0).abs() < 1e-12);
        assert!((modulo(1.0, -3.0) + 2.0).abs() < 1e-12);
        assert!(modulo(1.0, 0.0).is_nan());
    }

    #[test]
    fn remainder_operator_points_to_mod() {
        let error = CompiledExpression::compile("x % 3").unwrap_err();
        assert_eq!(error, ExpressionError::RemainderOperator { position: 2 });
        assert!(error.to_string().contains("mod(a, b)"));
        assert!((eval("mod(x, 3)", -1.0, 0.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn round_takes_halves_to_even() {
        assert_eq!(eval("round(2.5)", 0.0, 0.0), 2.0);
        assert_eq!(eval("round(3.5)", 0.0, 0.0), 4.0);
        assert_eq!(eval("round(x)", -2.5, 0.0), -2.0);
        assert_eq!(eval("round(x)", 2.6, 0.0), 3.0);
    }

    #[test]
    fn scientific_notation_is_not_an_identifier() {
        assert!((eval("1e2 + x", 1.0, 0.0) - 101.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_variable_with_suggestion() {
        let error = CompiledExpression::compile("x + tua").unwrap_err();
        assert_eq!(
            error,
            ExpressionError::UnknownVariable {
                name: "tua".to_owned(),
                suggestion: Some("tau".to_owned())
            }
        );
        assert!(error.to_string().contains("did you mean `tau`"));
    }

    #[test]
    fn rejects_unknown_function() {
        let error = CompiledExpression::compile("sinus(x)").unwrap_err();
        assert!(matches!(
            error,
            ExpressionError::UnknownFunction { ref name, .. } if name == "sinus"
        ));
    }

    #[test]
    fn rejects_code_injection_characters() {
        let error = CompiledExpression::compile("__import__('os')").unwrap_err();
        assert!(matches!(
            error,
            ExpressionError::InvalidCharacter { character: '\'', .. }
        ));
    }

    #[test]
    fn rejects_wrong_argument_count() {
        let error = CompiledExpression::compile("pow(x)").unwrap_err();
        assert!(matches!(error, ExpressionError::Evaluate(_)));
    }

    #[test]
    fn rejects_empty_equation() {
        assert_eq!(CompiledExpression::compile("  ; ").unwrap_err(), ExpressionError::Empty);
    }

    #[test]
    fn domain_errors_evaluate_to_nan() {
        let expr = CompiledExpression::compile("sqrt(x)").expect("compiles");
        assert!(expr.eval(-1.0, 0.0).expect("evaluates").is_nan());
    }
}
