//! The narrow interface to the host CAD application.
//!
//! Everything that creates persistent geometry (sketches, lines, loft and
//! stitch features, timeline groups) goes through [`GeometryKernel`]. Handle
//! types are associated types so a host can use its own object references; the
//! builder only ever stores and passes them back.

mod recording;

use serde::{Deserialize, Serialize};

use crate::geom::Point3;

pub use recording::{
    BodyId, FeatureId, KernelOp, LineId, RecordedGroup, RecordingKernel, SectionId, SketchId,
    TimelineItem,
};

/// Construction plane for new sketches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaneRef {
    #[default]
    #[serde(rename = "XY", alias = "xy")]
    Xy,
    #[serde(rename = "XZ", alias = "xz")]
    Xz,
    #[serde(rename = "YZ", alias = "yz")]
    Yz,
}

/// How the lines of a finished sketch are handed to a loft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionMode {
    /// Closed region bounded by the lines, used as a loft section for solids.
    Profile,
    /// The raw sketch curves, used for rails.
    Polyline,
    /// An open path over the lines, used as a loft section for surfaces.
    Path,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: usize },
}

impl KernelError {
    pub fn rejected(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.into(),
        }
    }
}

/// Host operations needed to build an equation driven surface.
pub trait GeometryKernel {
    type Sketch;
    type Line: Clone;
    type Section;
    type LoftFeature;
    type Body: Clone;

    fn create_sketch(&mut self, plane: PlaneRef) -> Result<Self::Sketch, KernelError>;

    fn add_sketch_point(&mut self, sketch: &Self::Sketch, point: Point3)
    -> Result<(), KernelError>;

    fn add_line(
        &mut self,
        sketch: &Self::Sketch,
        start: Point3,
        end: Point3,
    ) -> Result<Self::Line, KernelError>;

    /// Turn the lines drawn so far into a loft section or rail set.
    fn finish_section(
        &mut self,
        sketch: &Self::Sketch,
        mode: SectionMode,
    ) -> Result<Self::Section, KernelError>;

    /// Loft between two sections, guided by `rails`. The loft joins into the
    /// existing body when the host supports it.
    fn create_loft(
        &mut self,
        sections: (&Self::Section, &Self::Section),
        rails: &[Self::Line],
    ) -> Result<(Self::LoftFeature, Self::Body), KernelError>;

    fn stitch(&mut self, bodies: &[Self::Body], tolerance: f64) -> Result<(), KernelError>;

    /// Group the inclusive timeline range `start..=end` under `name`.
    fn create_timeline_group(
        &mut self,
        start: usize,
        end: usize,
        name: &str,
    ) -> Result<(), KernelError>;

    /// Number of items currently on the host timeline.
    fn timeline_count(&self) -> usize;
}
