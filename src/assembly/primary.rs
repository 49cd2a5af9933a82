// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use crate::assembly::support::{SupportChecker, Tolerance};
use crate::assembly::supported::SupportedAssembly;
use crate::read::{ReadId, ReadStore};
use crate::sequence::Sequence;

/// An assembly anchored to one side of a genomic breakpoint.
///
/// The base at `anchor_position_in_assembly` corresponds to reference position
/// `anchor_position` on `anchor_contig`.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize)]
pub struct PrimaryAssembly {
    #[getset(get = "pub")]
    supported: SupportedAssembly,
    #[getset(get = "pub")]
    anchor_contig: String,
    #[getset(get_copy = "pub")]
    anchor_position: i64,
    #[getset(get_copy = "pub")]
    anchor_position_in_assembly: usize,
    /// Opaque rendering metadata, carried along unchanged.
    #[getset(get = "pub")]
    diagrams: Vec<String>,
}

impl PrimaryAssembly {
    /// # Panics
    ///
    /// If the anchor index lies outside the assembly.
    pub fn new(
        name: &str,
        bases: Vec<u8>,
        anchor_contig: &str,
        anchor_position: i64,
        anchor_position_in_assembly: usize,
    ) -> Self {
        PrimaryAssembly::from_supported(
            SupportedAssembly::new(name, bases),
            anchor_contig,
            anchor_position,
            anchor_position_in_assembly,
            Vec::new(),
        )
    }

    fn from_supported(
        supported: SupportedAssembly,
        anchor_contig: &str,
        anchor_position: i64,
        anchor_position_in_assembly: usize,
        diagrams: Vec<String>,
    ) -> Self {
        assert!(
            anchor_position_in_assembly < supported.len(),
            "anchor index {} outside of assembly {} of length {}",
            anchor_position_in_assembly,
            supported.name(),
            supported.len()
        );
        PrimaryAssembly {
            supported,
            anchor_contig: anchor_contig.to_owned(),
            anchor_position,
            anchor_position_in_assembly,
            diagrams,
        }
    }

    /// Build an assembly that replaces `original` with new bases and a new anchor.
    ///
    /// Support of every contributor anchored where `original` is anchored is carried
    /// over, shifted by the change of the in-assembly anchor index. Support of
    /// contributors anchored elsewhere is dropped.
    pub fn derived<'a>(
        name: &str,
        bases: Vec<u8>,
        original: &PrimaryAssembly,
        contributors: impl IntoIterator<Item = &'a PrimaryAssembly>,
        anchor_position: i64,
        anchor_position_in_assembly: usize,
    ) -> Self {
        let mut derived = PrimaryAssembly::from_supported(
            SupportedAssembly::new(name, bases),
            &original.anchor_contig,
            anchor_position,
            anchor_position_in_assembly,
            original.diagrams.clone(),
        );

        for contributor in contributors {
            if !contributor.has_same_anchor(original) {
                debug!(
                    "dropping support of {} while deriving {}: anchored elsewhere",
                    contributor.name(),
                    name
                );
                continue;
            }
            let anchor_delta = anchor_position_in_assembly as i32
                - contributor.anchor_position_in_assembly as i32;
            for support in contributor.supported.support() {
                derived.supported.add_support(support.shifted(anchor_delta));
            }
        }

        derived
    }

    pub fn has_same_anchor(&self, other: &PrimaryAssembly) -> bool {
        self.anchor_contig == other.anchor_contig && self.anchor_position == other.anchor_position
    }

    pub fn add_diagram(&mut self, diagram: String) {
        self.diagrams.push(diagram);
    }

    pub fn try_add_support<C: SupportChecker>(
        &mut self,
        checker: &C,
        reads: &ReadStore,
        read: ReadId,
        tolerance: Tolerance,
    ) -> bool {
        self.supported
            .try_add_support(checker, reads, read, tolerance)
    }

    pub fn add_evidence_at(&mut self, read: ReadId, offset: i32) {
        self.supported.add_evidence_at(read, offset);
    }

    pub fn recalculate_base_quality(&mut self, reads: &ReadStore) {
        self.supported.recalculate_base_quality(reads);
    }

    /// Remove bases from both ends.
    ///
    /// Returns `None` if nothing would be left, which means the assembly should be
    /// discarded. The anchor is moved back into the trimmed assembly if it was cut off,
    /// keeping the genomic position in step with the in-assembly index. Support starting
    /// at or after the new end is dropped, support overhanging the new start is kept.
    pub fn trim(&self, remove_left: usize, remove_right: usize) -> Option<PrimaryAssembly> {
        let len = self.len() as i64;
        let new_len = len - remove_left as i64 - remove_right as i64;
        if new_len <= 0 {
            return None;
        }
        let range = remove_left..remove_left + new_len as usize;

        let mut anchor_index = self.anchor_position_in_assembly as i64 - remove_left as i64;
        let mut anchor_position = self.anchor_position;
        if anchor_index >= new_len {
            let shift = anchor_index - new_len + 1;
            anchor_index -= shift;
            anchor_position -= shift;
        } else if anchor_index < 0 {
            anchor_position -= anchor_index;
            anchor_index = 0;
        }

        let support = self
            .supported
            .support()
            .iter()
            .map(|support| support.shifted(-(remove_left as i32)))
            .filter(|support| (support.offset() as i64) < new_len)
            .collect();

        let supported = SupportedAssembly::from_parts(
            self.name(),
            self.bases()[range.clone()].to_vec(),
            self.base_quality()[range].to_vec(),
            support,
        );

        Some(PrimaryAssembly::from_supported(
            supported,
            &self.anchor_contig,
            anchor_position,
            anchor_index as usize,
            self.diagrams.clone(),
        ))
    }
}
