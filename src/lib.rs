#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod build;
pub mod expression;
pub mod geom;
pub mod kernel;
pub mod surface;

use std::fmt;

use serde::Serialize;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

use surface::{SurfaceRequest, VertexBudget};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            // no-op fallback when panic hook is disabled
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {
    // no-op fallback when debug logs are disabled
}

#[derive(Debug, Serialize)]
struct BudgetExport {
    estimate: f64,
    max_vertices: f64,
    exceeded: bool,
}

/// Publiek toegangspunt voor JavaScript-hosts.
///
/// Houdt het laatst ingestelde verzoek vast; elke aanroep rekent opnieuw.
#[wasm_bindgen]
pub struct SurfaceEngine {
    request: SurfaceRequest,
    budget: VertexBudget,
}

impl Default for SurfaceEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl SurfaceEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> SurfaceEngine {
        SurfaceEngine {
            request: SurfaceRequest::default(),
            budget: VertexBudget::default(),
        }
    }

    /// Vervang het volledige verzoek. Ontbrekende velden krijgen hun standaardwaarde.
    #[wasm_bindgen]
    pub fn set_request(&mut self, request: JsValue) -> Result<(), JsValue> {
        let request: SurfaceRequest = serde_wasm_bindgen::from_value(request)
            .map_err(|err| js_error(&format!("ongeldig verzoek: {err}")))?;
        self.request = request;
        Ok(())
    }

    /// Het huidige verzoek, inclusief standaardwaarden.
    #[wasm_bindgen]
    pub fn get_request(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.request).map_err(to_js_error)
    }

    /// Stel alleen de vergelijking in.
    #[wasm_bindgen]
    pub fn set_equation(&mut self, equation: &str) {
        self.request.equation = equation.to_owned();
    }

    /// Controleer domein, resolutie en vergelijking zonder punten te berekenen.
    #[wasm_bindgen]
    pub fn validate(&self) -> Result<(), JsValue> {
        self.check_request().map_err(to_js_error)
    }

    /// Geschat aantal punten voor het huidige verzoek.
    #[wasm_bindgen]
    pub fn estimate_vertices(&self) -> f64 {
        VertexBudget::estimate(&self.request)
    }

    /// Schatting, limiet en of de limiet overschreden wordt.
    #[wasm_bindgen]
    pub fn vertex_budget(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.budget_export()).map_err(to_js_error)
    }

    /// Verlaag de resolutie tot binnen het puntenbudget.
    #[wasm_bindgen]
    pub fn clamp_resolution(&mut self) {
        self.request = self.budget.clamp(&self.request);
    }

    /// Bereken de gecentreerde punten (met basispunten) als geneste `[x, y, z]`-arrays.
    #[wasm_bindgen]
    pub fn preview_points(&self) -> Result<JsValue, JsValue> {
        let points = surface::calculate_points(&self.request).map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&points).map_err(to_js_error)
    }

    /// Alle kernel-aanroepen die de constructie zou doen, plus het rapport.
    #[wasm_bindgen]
    pub fn build_plan(&self) -> Result<JsValue, JsValue> {
        let plan = surface::plan(&self.request).map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&plan).map_err(to_js_error)
    }
}

impl SurfaceEngine {
    /// Het huidige verzoek.
    #[must_use]
    pub fn request(&self) -> &SurfaceRequest {
        &self.request
    }

    /// Vervang het verzoek vanuit Rust.
    pub fn replace_request(&mut self, request: SurfaceRequest) {
        self.request = request;
    }

    fn check_request(&self) -> Result<(), surface::SurfaceError> {
        self.request.validate()?;
        expression::CompiledExpression::compile(&self.request.equation)?;
        Ok(())
    }

    fn budget_export(&self) -> BudgetExport {
        BudgetExport {
            estimate: VertexBudget::estimate(&self.request),
            max_vertices: self.budget.max_vertices,
            exceeded: self.budget.exceeds(&self.request),
        }
    }
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}
