//! In-memory [`GeometryKernel`] that records every call.
//!
//! Handles are plain indices. The recorder enforces the checks a CAD host
//! would: lines must have length, profiles must bound a region, lofts need
//! two distinct sections and timeline groups must lie on the timeline.

use serde::Serialize;

use super::{GeometryKernel, KernelError, PlaneRef, SectionMode};
use crate::geom::{Point3, Tolerance, Vec3};

const ZERO_AREA: Tolerance = Tolerance::ZERO_LENGTH;

macro_rules! handle {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            pub const KIND: &'static str = $kind;
        }
    };
}

handle!(SketchId, "sketch");
handle!(LineId, "line");
handle!(SectionId, "section");
handle!(FeatureId, "loft feature");
handle!(BodyId, "body");

/// One recorded kernel call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum KernelOp {
    CreateSketch {
        sketch: SketchId,
        plane: PlaneRef,
    },
    AddSketchPoint {
        sketch: SketchId,
        point: Point3,
    },
    AddLine {
        sketch: SketchId,
        line: LineId,
        start: Point3,
        end: Point3,
    },
    FinishSection {
        sketch: SketchId,
        section: SectionId,
        mode: SectionMode,
    },
    CreateLoft {
        feature: FeatureId,
        body: BodyId,
        sections: [SectionId; 2],
        rails: Vec<LineId>,
    },
    Stitch {
        bodies: Vec<BodyId>,
        tolerance: f64,
    },
    CreateTimelineGroup {
        start: usize,
        end: usize,
        name: String,
    },
}

/// An entry on the recorded timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TimelineItem {
    /// Present before this kernel was handed to a builder.
    Existing,
    Sketch(SketchId),
    Loft(FeatureId),
    Stitch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedGroup {
    pub start: usize,
    pub end: usize,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
struct SketchRecord {
    lines: Vec<(LineId, Point3, Point3)>,
    finished: bool,
}

#[derive(Debug, Clone)]
struct SectionRecord {
    mode: SectionMode,
}

#[derive(Debug, Default)]
pub struct RecordingKernel {
    ops: Vec<KernelOp>,
    timeline: Vec<TimelineItem>,
    groups: Vec<RecordedGroup>,
    sketches: Vec<SketchRecord>,
    sections: Vec<SectionRecord>,
    line_count: usize,
    loft_count: usize,
    fail_loft_at: Option<usize>,
    tolerance: Tolerance,
}

impl RecordingKernel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A kernel whose timeline already holds `count` unrelated items.
    #[must_use]
    pub fn with_existing_features(count: usize) -> Self {
        Self {
            timeline: vec![TimelineItem::Existing; count],
            ..Self::default()
        }
    }

    /// Make the loft with zero-based index `index` fail, as a host does when
    /// sections and rails do not fit together.
    #[must_use]
    pub fn fail_loft_at(mut self, index: usize) -> Self {
        self.fail_loft_at = Some(index);
        self
    }

    #[must_use]
    pub fn ops(&self) -> &[KernelOp] {
        &self.ops
    }

    #[must_use]
    pub fn into_ops(self) -> Vec<KernelOp> {
        self.ops
    }

    #[must_use]
    pub fn timeline(&self) -> &[TimelineItem] {
        &self.timeline
    }

    #[must_use]
    pub fn groups(&self) -> &[RecordedGroup] {
        &self.groups
    }

    #[must_use]
    pub fn sketch_count(&self) -> usize {
        self.sketches.len()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    #[must_use]
    pub fn loft_count(&self) -> usize {
        self.loft_count
    }

    /// Sections of the given mode, in creation order.
    #[must_use]
    pub fn sections_with_mode(&self, mode: SectionMode) -> Vec<SectionId> {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, section)| section.mode == mode)
            .map(|(index, _)| SectionId(index))
            .collect()
    }

    fn sketch_mut(&mut self, sketch: SketchId) -> Result<&mut SketchRecord, KernelError> {
        self.sketches
            .get_mut(sketch.0)
            .ok_or(KernelError::UnknownHandle {
                kind: SketchId::KIND,
                id: sketch.0,
            })
    }

    fn check_section(&self, section: SectionId) -> Result<(), KernelError> {
        match self.sections.get(section.0) {
            Some(record) if record.mode != SectionMode::Polyline => Ok(()),
            Some(_) => Err(KernelError::rejected(
                "create_loft",
                format!("section {} is a polyline, not a loft section", section.0),
            )),
            None => Err(KernelError::UnknownHandle {
                kind: SectionId::KIND,
                id: section.0,
            }),
        }
    }
}

/// Area of the polygon through `points` using Newell's method.
fn polygon_area(points: &[Point3]) -> f64 {
    let normal = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .fold(Vec3::ZERO, |acc, (a, b)| acc + a.to_vec3().cross(b.to_vec3()));
    normal.length() * 0.5
}

impl GeometryKernel for RecordingKernel {
    type Sketch = SketchId;
    type Line = LineId;
    type Section = SectionId;
    type LoftFeature = FeatureId;
    type Body = BodyId;

    fn create_sketch(&mut self, plane: PlaneRef) -> Result<SketchId, KernelError> {
        let sketch = SketchId(self.sketches.len());
        self.sketches.push(SketchRecord::default());
        self.timeline.push(TimelineItem::Sketch(sketch));
        self.ops.push(KernelOp::CreateSketch { sketch, plane });
        Ok(sketch)
    }

    fn add_sketch_point(&mut self, sketch: &SketchId, point: Point3) -> Result<(), KernelError> {
        self.sketch_mut(*sketch)?;
        if !point.is_finite() {
            return Err(KernelError::rejected("add_sketch_point", "point is not finite"));
        }
        self.ops.push(KernelOp::AddSketchPoint {
            sketch: *sketch,
            point,
        });
        Ok(())
    }

    fn add_line(
        &mut self,
        sketch: &SketchId,
        start: Point3,
        end: Point3,
    ) -> Result<LineId, KernelError> {
        let line = LineId(self.line_count);
        let zero_length = self.tolerance.is_zero_length(start.distance_to(end));
        let record = self.sketch_mut(*sketch)?;
        if record.finished {
            return Err(KernelError::rejected(
                "add_line",
                format!("sketch {} is already finished", sketch.0),
            ));
        }
        if zero_length {
            return Err(KernelError::rejected(
                "add_line",
                format!("zero-length line at [{}, {}, {}]", start.x, start.y, start.z),
            ));
        }
        record.lines.push((line, start, end));
        self.line_count += 1;
        self.ops.push(KernelOp::AddLine {
            sketch: *sketch,
            line,
            start,
            end,
        });
        Ok(line)
    }

    fn finish_section(
        &mut self,
        sketch: &SketchId,
        mode: SectionMode,
    ) -> Result<SectionId, KernelError> {
        let tolerance = self.tolerance;
        let record = self.sketch_mut(*sketch)?;
        let Some(&(_, first_start, _)) = record.lines.first() else {
            return Err(KernelError::rejected(
                "finish_section",
                format!("sketch {} has no lines", sketch.0),
            ));
        };

        let connected = record
            .lines
            .windows(2)
            .all(|pair| tolerance.approx_eq_point3(pair[0].2, pair[1].1));
        if !connected {
            return Err(KernelError::rejected(
                "finish_section",
                format!("lines of sketch {} do not form a chain", sketch.0),
            ));
        }

        if mode == SectionMode::Profile {
            let (_, _, last_end) = record.lines[record.lines.len() - 1];
            let vertices: Vec<Point3> = record.lines.iter().map(|(_, start, _)| *start).collect();
            if !tolerance.approx_eq_point3(first_start, last_end) {
                return Err(KernelError::rejected(
                    "finish_section",
                    format!("sketch {} is not closed", sketch.0),
                ));
            }
            if ZERO_AREA.approx_zero_f64(polygon_area(&vertices)) {
                return Err(KernelError::rejected(
                    "finish_section",
                    format!("sketch {} encloses no area", sketch.0),
                ));
            }
        }

        record.finished = true;
        let section = SectionId(self.sections.len());
        self.sections.push(SectionRecord { mode });
        self.ops.push(KernelOp::FinishSection {
            sketch: *sketch,
            section,
            mode,
        });
        Ok(section)
    }

    fn create_loft(
        &mut self,
        sections: (&SectionId, &SectionId),
        rails: &[LineId],
    ) -> Result<(FeatureId, BodyId), KernelError> {
        let (&first, &second) = sections;
        self.check_section(first)?;
        self.check_section(second)?;
        if first == second {
            return Err(KernelError::rejected("create_loft", "sections must differ"));
        }
        if let Some(rail) = rails.iter().find(|rail| rail.0 >= self.line_count) {
            return Err(KernelError::UnknownHandle {
                kind: LineId::KIND,
                id: rail.0,
            });
        }
        if self.fail_loft_at == Some(self.loft_count) {
            return Err(KernelError::rejected(
                "create_loft",
                format!("loft {} could not be computed", self.loft_count),
            ));
        }

        let feature = FeatureId(self.loft_count);
        let body = BodyId(self.loft_count);
        self.loft_count += 1;
        self.timeline.push(TimelineItem::Loft(feature));
        self.ops.push(KernelOp::CreateLoft {
            feature,
            body,
            sections: [first, second],
            rails: rails.to_vec(),
        });
        Ok((feature, body))
    }

    fn stitch(&mut self, bodies: &[BodyId], tolerance: f64) -> Result<(), KernelError> {
        if bodies.is_empty() {
            return Err(KernelError::rejected("stitch", "no bodies to stitch"));
        }
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(KernelError::rejected(
                "stitch",
                format!("tolerance must be positive, got {tolerance}"),
            ));
        }
        if let Some(body) = bodies.iter().find(|body| body.0 >= self.loft_count) {
            return Err(KernelError::UnknownHandle {
                kind: BodyId::KIND,
                id: body.0,
            });
        }
        self.timeline.push(TimelineItem::Stitch);
        self.ops.push(KernelOp::Stitch {
            bodies: bodies.to_vec(),
            tolerance,
        });
        Ok(())
    }

    fn create_timeline_group(
        &mut self,
        start: usize,
        end: usize,
        name: &str,
    ) -> Result<(), KernelError> {
        if start > end || end >= self.timeline.len() {
            return Err(KernelError::rejected(
                "create_timeline_group",
                format!(
                    "range {start}..={end} is outside the timeline of {} items",
                    self.timeline.len()
                ),
            ));
        }
        self.groups.push(RecordedGroup {
            start,
            end,
            name: name.to_owned(),
        });
        self.ops.push(KernelOp::CreateTimelineGroup {
            start,
            end,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn timeline_count(&self) -> usize {
        self.timeline.len()
    }
}
