// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::cmp;

use crate::assembly::support::{SupportChecker, Tolerance};
use crate::read::{ReadId, ReadStore};
use crate::sequence::Sequence;

/// Quality of assembly positions that no supporting read covers.
pub const UNSUPPORTED_BASE_QUALITY: u8 = 0;

/// Evidence that a read aligns against an assembly, starting at `offset`.
///
/// Offsets may be negative or exceed the assembly length while an assembly is being
/// grown. If `reverse_complemented` is set, the reverse complement of the stored read
/// is the one that aligns.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct ReadSupport {
    read: ReadId,
    offset: i32,
    #[new(default)]
    reverse_complemented: bool,
}

impl ReadSupport {
    pub fn shifted(self, delta: i32) -> Self {
        ReadSupport {
            offset: self.offset + delta,
            ..self
        }
    }

    /// Project the support onto the reverse complement of an assembly of the given length.
    pub fn mirrored(self, assembly_len: usize, read_len: usize) -> Self {
        ReadSupport {
            read: self.read,
            offset: assembly_len as i32 - self.offset - read_len as i32,
            reverse_complemented: !self.reverse_complemented,
        }
    }
}

/// A named assembly together with the reads supporting it.
#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
pub struct SupportedAssembly {
    name: String,
    bases: Vec<u8>,
    base_quality: Vec<u8>,
    #[getset(get = "pub")]
    support: Vec<ReadSupport>,
}

impl SupportedAssembly {
    /// New assembly without support. Qualities stay at [`UNSUPPORTED_BASE_QUALITY`]
    /// until they are recalculated.
    pub fn new(name: &str, bases: Vec<u8>) -> Self {
        let base_quality = vec![UNSUPPORTED_BASE_QUALITY; bases.len()];
        SupportedAssembly::from_parts(name, bases, base_quality, Vec::new())
    }

    pub(crate) fn from_parts(
        name: &str,
        bases: Vec<u8>,
        base_quality: Vec<u8>,
        support: Vec<ReadSupport>,
    ) -> Self {
        assert_eq!(
            bases.len(),
            base_quality.len(),
            "bases and qualities of assembly {} differ in length",
            name
        );
        SupportedAssembly {
            name: name.to_owned(),
            bases,
            base_quality,
            support,
        }
    }

    /// Ask `checker` where `read` aligns and record it as support if it does.
    /// Returns false, without touching the assembly, if the read does not align.
    pub fn try_add_support<C: SupportChecker>(
        &mut self,
        checker: &C,
        reads: &ReadStore,
        read: ReadId,
        tolerance: Tolerance,
    ) -> bool {
        match checker.support_index(&*self, reads.get(read), tolerance) {
            Some(offset) => {
                self.add_evidence_at(read, offset);
                true
            }
            None => false,
        }
    }

    pub fn add_evidence_at(&mut self, read: ReadId, offset: i32) {
        self.support.push(ReadSupport::new(read, offset));
    }

    pub(crate) fn add_support(&mut self, support: ReadSupport) {
        self.support.push(support);
    }

    pub(crate) fn set_base_quality(&mut self, pos: usize, qual: u8) {
        self.base_quality[pos] = qual;
    }

    pub fn supporting_reads(&self) -> impl Iterator<Item = ReadId> + '_ {
        self.support.iter().map(|support| support.read())
    }

    /// Visit every `(assembly position, read quality)` pair covered by support. Bases of
    /// a supporting read that fall outside the assembly are skipped.
    fn for_each_covered<F: FnMut(usize, u8)>(&self, reads: &ReadStore, mut f: F) {
        let len = self.bases.len() as i64;
        for support in &self.support {
            let quals = reads.get(support.read()).base_quality();
            let read_len = quals.len() as i64;
            let offset = support.offset() as i64;
            let first = cmp::max(0, -offset);
            let last = cmp::min(read_len, len - offset);
            for i in first..last {
                let qual = if support.reverse_complemented() {
                    quals[(read_len - 1 - i) as usize]
                } else {
                    quals[i as usize]
                };
                f((offset + i) as usize, qual);
            }
        }
    }

    /// Recompute the consensus quality of every position as the mean of the qualities
    /// of all supporting read bases covering it, rounded toward zero.
    ///
    /// Bases are left untouched and repeated calls give the same result.
    pub fn recalculate_base_quality(&mut self, reads: &ReadStore) {
        let mut sums = vec![0u64; self.bases.len()];
        let mut counts = vec![0u64; self.bases.len()];
        self.for_each_covered(reads, |pos, qual| {
            sums[pos] += qual as u64;
            counts[pos] += 1;
        });

        self.base_quality = sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| {
                if count == 0 {
                    UNSUPPORTED_BASE_QUALITY
                } else {
                    (sum / count) as u8
                }
            })
            .collect();
    }

    /// Number of supporting reads covering each position.
    pub fn support_depth(&self, reads: &ReadStore) -> Vec<u32> {
        let mut depth = vec![0; self.bases.len()];
        self.for_each_covered(reads, |pos, _| depth[pos] += 1);
        depth
    }
}

impl Sequence for SupportedAssembly {
    fn name(&self) -> &str {
        &self.name
    }

    fn bases(&self) -> &[u8] {
        &self.bases
    }

    fn base_quality(&self) -> &[u8] {
        &self.base_quality
    }
}
