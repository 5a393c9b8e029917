use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geom::{Domain, Resolution};
use crate::kernel::PlaneRef;

use super::base::BasePolicy;
use super::error::SurfaceError;

/// Equation used when a request does not name one.
pub const DEFAULT_EQUATION: &str = "cos((2/3)*pow((pow(x,2)+pow(y,2)),(1/2)))+1";

/// Named example surfaces, `(name, equation)`.
pub const EXAMPLE_EQUATIONS: &[(&str, &str)] = &[
    ("ripple", DEFAULT_EQUATION),
    ("quadratic", "x**2+y**2"),
    ("exponential", "(exp(x)-exp(y))/10"),
    ("sinusoidal", "sin(x+y)-cos(x)"),
    ("hemisphere", "sqrt(40-x**2-y**2)"),
    ("cone", "sqrt(x**2+y**2)"),
];

/// Looks up an entry of [`EXAMPLE_EQUATIONS`] by name, ignoring case.
#[must_use]
pub fn example_equation(name: &str) -> Option<&'static str> {
    EXAMPLE_EQUATIONS
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
        .map(|(_, equation)| *equation)
}

/// Which resolution input of the request is in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionMode {
    /// Fixed step size along both axes.
    #[default]
    #[serde(rename = "Interval Length")]
    IntervalLength,
    /// Fixed number of intervals per axis.
    #[serde(rename = "Number of Intervals")]
    NumberOfIntervals,
}

impl ResolutionMode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::IntervalLength => "Interval Length",
            Self::NumberOfIntervals => "Number of Intervals",
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResolutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interval length" | "step" | "step-size" | "step_size" => Ok(Self::IntervalLength),
            "number of intervals" | "intervals" | "count" => Ok(Self::NumberOfIntervals),
            other => Err(format!("unknown resolution mode `{other}`")),
        }
    }
}

/// Everything needed to generate one surface, as entered in the host dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceRequest {
    pub equation: String,
    pub domain: Domain,
    pub has_base: bool,
    pub base_type: BasePolicy,
    pub base_offset: f64,
    pub resolution_mode: ResolutionMode,
    pub step_size: f64,
    pub num_interv_x: u32,
    pub num_interv_y: u32,
    pub plane: PlaneRef,
}

impl Default for SurfaceRequest {
    fn default() -> Self {
        Self {
            equation: DEFAULT_EQUATION.to_owned(),
            domain: Domain::default(),
            has_base: false,
            base_type: BasePolicy::Automatic,
            base_offset: -1.0,
            resolution_mode: ResolutionMode::IntervalLength,
            step_size: 1.0,
            num_interv_x: 10,
            num_interv_y: 10,
            plane: PlaneRef::Xy,
        }
    }
}

impl SurfaceRequest {
    #[must_use]
    pub fn new(equation: impl Into<String>) -> Self {
        Self {
            equation: equation.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    #[must_use]
    pub fn with_step_size(mut self, step: f64) -> Self {
        self.resolution_mode = ResolutionMode::IntervalLength;
        self.step_size = step;
        self
    }

    #[must_use]
    pub fn with_intervals(mut self, x: u32, y: u32) -> Self {
        self.resolution_mode = ResolutionMode::NumberOfIntervals;
        self.num_interv_x = x;
        self.num_interv_y = y;
        self
    }

    /// Close the surface into a solid whose base follows `policy`.
    #[must_use]
    pub fn with_base(mut self, policy: BasePolicy, offset: f64) -> Self {
        self.has_base = true;
        self.base_type = policy;
        self.base_offset = offset;
        self
    }

    #[must_use]
    pub fn without_base(mut self) -> Self {
        self.has_base = false;
        self
    }

    #[must_use]
    pub fn with_plane(mut self, plane: PlaneRef) -> Self {
        self.plane = plane;
        self
    }

    /// The grid resolution selected by [`resolution_mode`](Self::resolution_mode).
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        match self.resolution_mode {
            ResolutionMode::IntervalLength => Resolution::StepSize(self.step_size),
            ResolutionMode::NumberOfIntervals => Resolution::IntervalCounts {
                x: self.num_interv_x,
                y: self.num_interv_y,
            },
        }
    }

    /// Checks the domain, the resolution and the base offset. The equation is
    /// checked when it is compiled.
    pub fn validate(&self) -> Result<(), SurfaceError> {
        self.resolution().validate_for(&self.domain)?;
        if self.has_base && !self.base_offset.is_finite() {
            return Err(SurfaceError::InvalidRequest(format!(
                "base offset must be a finite number, got {}",
                self.base_offset
            )));
        }
        Ok(())
    }
}

/// Pre-flight check on the number of grid vertices.
///
/// Large grids make the host slow to loft. Exceeding the budget is only a
/// warning; [`clamp`](Self::clamp) produces the reduced request a host offers
/// as alternative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexBudget {
    pub max_vertices: f64,
}

impl Default for VertexBudget {
    fn default() -> Self {
        Self {
            max_vertices: Self::DEFAULT_MAX_VERTICES,
        }
    }
}

impl VertexBudget {
    pub const DEFAULT_MAX_VERTICES: f64 = 350.0;

    #[must_use]
    pub const fn new(max_vertices: f64) -> Self {
        Self { max_vertices }
    }

    /// Rough vertex count of the grid the request would produce.
    ///
    /// Step mode uses the domain area over the step, a cheap estimate that
    /// grows linearly with resolution rather than quadratically.
    #[must_use]
    pub fn estimate(request: &SurfaceRequest) -> f64 {
        let domain = &request.domain;
        match request.resolution_mode {
            ResolutionMode::IntervalLength => {
                domain.x_extent() * domain.y_extent() / request.step_size
            }
            ResolutionMode::NumberOfIntervals => {
                (f64::from(request.num_interv_x) + 1.0) * (f64::from(request.num_interv_y) + 1.0)
            }
        }
    }

    #[must_use]
    pub fn exceeds(&self, request: &SurfaceRequest) -> bool {
        Self::estimate(request) > self.max_vertices
    }

    /// Interval count per axis offered when the budget is exceeded.
    #[must_use]
    pub fn max_intervals(&self) -> u32 {
        (self.max_vertices.sqrt().round() - 2.0).max(1.0) as u32
    }

    /// The request with its active resolution reduced to fit the budget.
    ///
    /// Requests already within budget are returned unchanged.
    #[must_use]
    pub fn clamp(&self, request: &SurfaceRequest) -> SurfaceRequest {
        let mut clamped = request.clone();
        if !self.exceeds(request) {
            return clamped;
        }
        match request.resolution_mode {
            ResolutionMode::IntervalLength => {
                clamped.step_size =
                    request.domain.x_extent() * request.domain.y_extent() / self.max_vertices;
            }
            ResolutionMode::NumberOfIntervals => {
                clamped.num_interv_x = self.max_intervals();
                clamped.num_interv_y = self.max_intervals();
            }
        }
        log::warn!(
            "vertex estimate {:.0} exceeds {}; resolution reduced",
            Self::estimate(request),
            self.max_vertices
        );
        clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dialog() {
        let request = SurfaceRequest::default();
        assert_eq!(request.equation, DEFAULT_EQUATION);
        assert_eq!(request.domain, Domain::new(-4.0, 4.0, -4.0, 4.0));
        assert_eq!(request.resolution(), Resolution::StepSize(1.0));
        assert_eq!(request.base_offset, -1.0);
        assert!(!request.has_base);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn interval_mode_selects_counts() {
        let request = SurfaceRequest::default().with_intervals(4, 7);
        assert_eq!(request.resolution(), Resolution::IntervalCounts { x: 4, y: 7 });
    }

    #[test]
    fn step_larger_than_domain_is_invalid() {
        let request = SurfaceRequest::default()
            .with_domain(Domain::new(0.0, 0.5, 0.0, 0.5))
            .with_step_size(1.0);
        assert!(matches!(request.validate(), Err(SurfaceError::InvalidResolution(_))));
    }

    #[test]
    fn empty_domain_is_invalid_in_both_modes() {
        let domain = Domain::new(1.0, 1.0, 0.0, 1.0);
        for request in [
            SurfaceRequest::default().with_domain(domain),
            SurfaceRequest::default().with_domain(domain).with_intervals(3, 3),
        ] {
            assert!(matches!(request.validate(), Err(SurfaceError::InvalidDomain(_))));
        }
    }

    #[test]
    fn estimate_per_mode() {
        let step = SurfaceRequest::default().with_step_size(0.5);
        assert_eq!(VertexBudget::estimate(&step), 128.0);
        let counts = SurfaceRequest::default().with_intervals(10, 20);
        assert_eq!(VertexBudget::estimate(&counts), 231.0);
    }

    #[test]
    fn clamp_reduces_step_size() {
        let request = SurfaceRequest::default().with_step_size(0.1);
        let budget = VertexBudget::default();
        assert!(budget.exceeds(&request));
        let clamped = budget.clamp(&request);
        assert!((clamped.step_size - 64.0 / 350.0).abs() < 1e-12);
        assert!((VertexBudget::estimate(&clamped) - 350.0).abs() < 1e-9);
    }

    #[test]
    fn clamp_reduces_interval_counts_to_seventeen() {
        let request = SurfaceRequest::default().with_intervals(40, 40);
        let clamped = VertexBudget::default().clamp(&request);
        assert_eq!((clamped.num_interv_x, clamped.num_interv_y), (17, 17));
    }

    #[test]
    fn request_within_budget_is_unchanged() {
        let request = SurfaceRequest::default().with_intervals(10, 10);
        assert_eq!(VertexBudget::default().clamp(&request), request);
    }

    #[test]
    fn example_equations_are_found_by_name() {
        assert_eq!(example_equation("Cone"), Some("sqrt(x**2+y**2)"));
        assert!(example_equation("torus").is_none());
    }

    #[test]
    fn resolution_mode_parses_labels() {
        assert_eq!("Number of Intervals".parse::<ResolutionMode>(), Ok(ResolutionMode::NumberOfIntervals));
        assert_eq!("step".parse::<ResolutionMode>(), Ok(ResolutionMode::IntervalLength));
    }
}
