//! Turns an evaluated point grid into host geometry.
//!
//! Rows become loft sections, columns become rails, consecutive sections are
//! lofted along the rails between them and the resulting features are grouped
//! on the host timeline.

mod construct;
mod sections;
mod timeline;

use std::fmt;

use serde::Serialize;

use crate::geom::GridError;
use crate::kernel::KernelError;

pub use construct::{BuildOptions, ConstructionReport, LoftOutcome, construct, loft_multiple};
pub use sections::{BuiltSection, RailSet, make_rails, make_section, make_sections};
pub use timeline::{
    SOLID_GROUP_NAMES, SURFACE_GROUP_NAMES, TimelineGroup, apply_timeline_groups,
    plan_timeline_groups,
};

/// Construction step that issued a failing kernel call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildStage {
    Preview,
    Sections,
    Rails,
    Loft,
    Stitch,
    Timeline,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preview => "preview",
            Self::Sections => "loft sections",
            Self::Rails => "rails",
            Self::Loft => "loft",
            Self::Stitch => "stitch",
            Self::Timeline => "timeline grouping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("at least two sections with two points each are needed, got {rows} × {columns}")]
    NotEnoughSections { rows: usize, columns: usize },
    #[error("{stage} failed: {source}")]
    Kernel {
        stage: BuildStage,
        #[source]
        source: KernelError,
    },
}

impl BuildError {
    pub(crate) fn kernel(stage: BuildStage) -> impl FnOnce(KernelError) -> Self {
        move |source| Self::Kernel { stage, source }
    }

    /// The stage of a kernel failure, `None` for grid shape errors.
    #[must_use]
    pub fn stage(&self) -> Option<BuildStage> {
        match self {
            Self::Kernel { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
