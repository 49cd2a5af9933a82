// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use itertools::Itertools;

use crate::assembly::extended::ExtendedAssembly;
use crate::assembly::support::{SupportChecker, Tolerance};
use crate::assembly::supported::{SupportedAssembly, UNSUPPORTED_BASE_QUALITY};
use crate::read::{ReadId, ReadStore};
use crate::sequence::Sequence;

/// Marks a gap of unknown length between two sources. Never occurs in read data.
pub const GAP_SEPARATOR: u8 = b'X';

/// Several assemblies joined across unresolved gaps.
///
/// The bases are the source bases joined by [`GAP_SEPARATOR`], hence the length is the
/// sum of the source lengths plus one per gap.
#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
pub struct GappedAssembly {
    #[getset(get = "pub")]
    supported: SupportedAssembly,
    #[getset(get = "pub")]
    sources: Vec<ExtendedAssembly>,
}

impl GappedAssembly {
    /// Join `sources` in the given order. The support of each source is carried over
    /// at the position of that source inside the joined assembly.
    ///
    /// # Panics
    ///
    /// If `sources` is empty.
    pub fn new(name: &str, sources: Vec<ExtendedAssembly>) -> Self {
        let mut gapped = GappedAssembly::from_sources(name, sources);
        let offsets = gapped.source_offsets();
        for (source, offset) in gapped.sources.iter().zip(offsets) {
            for support in source.supported().support() {
                gapped.supported.add_support(support.shifted(offset as i32));
            }
        }
        gapped
    }

    fn from_sources(name: &str, sources: Vec<ExtendedAssembly>) -> Self {
        assert!(
            !sources.is_empty(),
            "gapped assembly {} needs at least one source",
            name
        );
        let bases = Itertools::intersperse(
            sources.iter().map(|source| source.bases()),
            &[GAP_SEPARATOR][..],
        )
        .flatten()
        .cloned()
        .collect();
        let quals = Itertools::intersperse(
            sources.iter().map(|source| source.base_quality()),
            &[UNSUPPORTED_BASE_QUALITY][..],
        )
        .flatten()
        .cloned()
        .collect();

        GappedAssembly {
            supported: SupportedAssembly::from_parts(name, bases, quals, Vec::new()),
            sources,
        }
    }

    /// Start of every source inside the joined assembly.
    pub fn source_offsets(&self) -> Vec<usize> {
        self.sources
            .iter()
            .scan(0, |offset, source| {
                let start = *offset;
                *offset += source.len() + 1;
                Some(start)
            })
            .collect()
    }

    /// Offer `read` to each source in turn. The first source it supports decides the
    /// offset inside the joined assembly, no further sources are tried.
    pub fn try_add_support<C: SupportChecker>(
        &mut self,
        checker: &C,
        reads: &ReadStore,
        read: ReadId,
        tolerance: Tolerance,
    ) -> bool {
        let mut offset = 0;
        for source in &self.sources {
            if let Some(index) = checker.support_index(source, reads.get(read), tolerance) {
                self.supported.add_evidence_at(read, offset + index);
                return true;
            }
            offset += source.len() as i32 + 1;
        }
        false
    }

    pub fn add_evidence_at(&mut self, read: ReadId, offset: i32) {
        self.supported.add_evidence_at(read, offset);
    }

    /// Recalculate consensus qualities. Gap positions always keep
    /// [`UNSUPPORTED_BASE_QUALITY`].
    pub fn recalculate_base_quality(&mut self, reads: &ReadStore) {
        self.supported.recalculate_base_quality(reads);
        let gaps = self
            .bases()
            .iter()
            .positions(|base| *base == GAP_SEPARATOR)
            .collect_vec();
        for pos in gaps {
            self.supported.set_base_quality(pos, UNSUPPORTED_BASE_QUALITY);
        }
    }

    /// The joined assembly read from the opposite strand.
    ///
    /// Every source is flipped and the source order is reversed. Every support of this
    /// assembly is mirrored onto the flipped one, and qualities are recalculated.
    /// Flipping twice yields the original sources and support.
    pub fn flip_strand(&self, reads: &ReadStore) -> GappedAssembly {
        let sources = self
            .sources
            .iter()
            .rev()
            .map(|source| source.flip_strand(reads))
            .collect();
        let mut flipped = GappedAssembly::from_sources(self.name(), sources);
        debug_assert_eq!(flipped.len(), self.len());

        let len = flipped.len();
        for support in self.supported.support() {
            flipped
                .supported
                .add_support(support.mirrored(len, reads.get(support.read()).len()));
        }
        flipped.recalculate_base_quality(reads);

        flipped
    }
}
