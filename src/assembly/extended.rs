// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use bio::alphabets::dna;

use crate::assembly::primary::PrimaryAssembly;
use crate::assembly::support::{SupportChecker, Tolerance};
use crate::assembly::supported::{SupportedAssembly, UNSUPPORTED_BASE_QUALITY};
use crate::read::{ReadId, ReadStore};
use crate::sequence::Sequence;

/// An assembly grown beyond the primary assembly it started from.
#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
pub struct ExtendedAssembly {
    #[getset(get = "pub")]
    supported: SupportedAssembly,
    /// Name of the primary assembly this one was grown from.
    #[getset(get = "pub")]
    primary_name: String,
    #[getset(get = "pub")]
    diagrams: Vec<String>,
}

impl ExtendedAssembly {
    /// Start from a copy of `primary`, keeping its support.
    pub fn new(name: &str, primary: &PrimaryAssembly) -> Self {
        let source = primary.supported();
        ExtendedAssembly {
            supported: SupportedAssembly::from_parts(
                name,
                source.bases().to_vec(),
                source.base_quality().to_vec(),
                source.support().clone(),
            ),
            primary_name: primary.name().to_owned(),
            diagrams: primary.diagrams().clone(),
        }
    }

    /// Copy with `prefix` and `suffix` added around the current bases. Existing support
    /// moves right by the prefix length, new bases start out unsupported.
    pub fn extended(&self, prefix: &[u8], suffix: &[u8]) -> Self {
        let mut bases = Vec::with_capacity(prefix.len() + self.len() + suffix.len());
        bases.extend_from_slice(prefix);
        bases.extend_from_slice(self.bases());
        bases.extend_from_slice(suffix);

        let mut quals = vec![UNSUPPORTED_BASE_QUALITY; prefix.len()];
        quals.extend_from_slice(self.base_quality());
        quals.resize(bases.len(), UNSUPPORTED_BASE_QUALITY);

        let delta = prefix.len() as i32;
        let support = self
            .supported
            .support()
            .iter()
            .map(|support| support.shifted(delta))
            .collect();

        ExtendedAssembly {
            supported: SupportedAssembly::from_parts(self.name(), bases, quals, support),
            primary_name: self.primary_name.clone(),
            diagrams: self.diagrams.clone(),
        }
    }

    /// The same assembly read from the opposite strand: bases are reverse complemented,
    /// qualities reversed and every support mirrored onto the new orientation.
    pub fn flip_strand(&self, reads: &ReadStore) -> Self {
        let len = self.len();
        let bases = dna::revcomp(self.bases());
        let quals = self.base_quality().iter().rev().cloned().collect();
        let support = self
            .supported
            .support()
            .iter()
            .map(|support| support.mirrored(len, reads.get(support.read()).len()))
            .collect();

        ExtendedAssembly {
            supported: SupportedAssembly::from_parts(self.name(), bases, quals, support),
            primary_name: self.primary_name.clone(),
            diagrams: self.diagrams.clone(),
        }
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

    pub fn recalculate_base_quality(&mut self, reads: &ReadStore) {
        self.supported.recalculate_base_quality(reads);
    }
}
