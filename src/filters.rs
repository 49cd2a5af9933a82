// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Stateless predicates deciding whether a read is usable as evidence for a junction.

use std::cmp;

use crate::junction::{Junction, Orientation};
use crate::read::Read;
use crate::sequence::{average_quality, Sequence};

/// Maximum distance between a soft clip boundary and the junction position for the
/// clip to count as explaining the junction.
pub const SOFT_CLIP_JUNCTION_TOLERANCE: i64 = 2;

/// True if the average base quality of `read` is strictly above `threshold`.
pub fn is_record_average_quality_above(read: &Read, threshold: u8) -> bool {
    read.average_quality() > threshold
}

/// True if the average quality of the bases on the far side of the junction is strictly
/// above `threshold`.
///
/// For forward junctions these are the bases aligned at or after the junction position,
/// for reverse junctions the bases at or before it. Reads without any such base fail.
pub fn is_record_average_quality_past_junction_above(
    read: &Read,
    junction: &Junction,
    threshold: u8,
) -> bool {
    let quals = read.base_quality();
    let len = quals.len() as i64;
    let index = read.read_index_at(junction.position());

    let (start, end) = match junction.orientation() {
        Orientation::Forward => (cmp::max(index, 0), len),
        Orientation::Reverse => (0, cmp::min(index + 1, len)),
    };
    if start >= end {
        return false;
    }
    average_quality(&quals[start as usize..end as usize]) > threshold
}

/// True if the read is soft clipped at the junction, on the side the junction points to.
///
/// For forward junctions the last aligned base has to be within
/// [`SOFT_CLIP_JUNCTION_TOLERANCE`] of the junction position and followed by a soft
/// clip; for reverse junctions the first aligned base, preceded by a soft clip.
pub fn record_soft_clips_near_junction(read: &Read, junction: &Junction) -> bool {
    let (clip, boundary) = match junction.orientation() {
        Orientation::Forward => (read.trailing_soft_clip(), read.alignment_end() - 1),
        Orientation::Reverse => (read.leading_soft_clip(), read.alignment_start()),
    };
    clip > 0 && (boundary - junction.position()).abs() <= SOFT_CLIP_JUNCTION_TOLERANCE
}
