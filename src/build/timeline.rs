//! Timeline bookkeeping after construction.
//!
//! The builder creates, in order, the loft section sketches, the rail sketches
//! and the loft features (plus one stitch for open surfaces). Those items are
//! the last ones on the timeline, so the groups are laid out backwards from the
//! current timeline length.

use serde::Serialize;

use crate::kernel::{GeometryKernel, KernelError};

/// Group names for an open surface, newest items first.
pub const SURFACE_GROUP_NAMES: [&str; 3] = ["Loft & Stitch", "Rails", "Loft Paths"];

/// Group names for a closed solid, newest items first.
pub const SOLID_GROUP_NAMES: [&str; 3] = ["Loft", "Rails", "Loft Profiles"];

/// Inclusive timeline range under one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineGroup {
    pub start: usize,
    pub end: usize,
    pub name: &'static str,
}

/// Compute the timeline groups for a finished build.
///
/// With two sections or fewer there is a single loft and no stitch, so no
/// loft group is made and the loft itself is skipped. Returns `None` when the
/// groups would reach before the start of the timeline; grouping is cosmetic
/// and the caller only logs that case.
#[must_use]
pub fn plan_timeline_groups(
    timeline_count: usize,
    section_count: usize,
    rail_sketch_count: usize,
    has_base: bool,
) -> Option<Vec<TimelineGroup>> {
    let sections = section_count as i64;
    let (names, lengths) = if has_base {
        (SOLID_GROUP_NAMES, [sections - 1, rail_sketch_count as i64, sections])
    } else {
        (SURFACE_GROUP_NAMES, [sections, rail_sketch_count as i64, sections])
    };

    let mut start = timeline_count as i64;
    let skip = if section_count <= 2 {
        start -= 1;
        1
    } else {
        0
    };

    let mut groups = Vec::with_capacity(names.len() - skip);
    for (&name, &length) in names.iter().zip(lengths.iter()).skip(skip) {
        let end = start - 1;
        start = end - length + 1;
        if length <= 0 {
            continue;
        }
        if start < 0 {
            return None;
        }
        groups.push(TimelineGroup {
            start: start as usize,
            end: end as usize,
            name,
        });
    }
    Some(groups)
}

/// Plan the groups against the kernel's timeline and create them.
///
/// Returns the groups that were created; an empty list when the plan did not
/// fit on the timeline.
pub fn apply_timeline_groups<K: GeometryKernel + ?Sized>(
    kernel: &mut K,
    section_count: usize,
    rail_sketch_count: usize,
    has_base: bool,
) -> Result<Vec<TimelineGroup>, KernelError> {
    let timeline_count = kernel.timeline_count();
    let Some(groups) =
        plan_timeline_groups(timeline_count, section_count, rail_sketch_count, has_base)
    else {
        log::warn!(
            "timeline grouping skipped: {section_count} sections and {rail_sketch_count} rail \
             sketches do not fit on a timeline of {timeline_count} items"
        );
        return Ok(Vec::new());
    };

    for group in &groups {
        kernel.create_timeline_group(group.start, group.end, group.name)?;
    }
    Ok(groups)
}
