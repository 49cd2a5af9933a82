// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

pub mod extended;
pub mod gapped;
pub mod primary;
pub mod support;
pub mod supported;

pub use self::extended::ExtendedAssembly;
pub use self::gapped::{GappedAssembly, GAP_SEPARATOR};
pub use self::primary::PrimaryAssembly;
pub use self::support::{MismatchSupportChecker, SupportChecker, Tolerance};
pub use self::supported::{ReadSupport, SupportedAssembly, UNSUPPORTED_BASE_QUALITY};

use crate::read::{ReadId, ReadStore};

/// An assembly as handed to downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Assembly {
    Primary(PrimaryAssembly),
    Gapped(GappedAssembly),
}

impl Assembly {
    pub fn supported(&self) -> &SupportedAssembly {
        match self {
            Assembly::Primary(assembly) => assembly.supported(),
            Assembly::Gapped(assembly) => assembly.supported(),
        }
    }

    pub fn try_add_support<C: SupportChecker>(
        &mut self,
        checker: &C,
        reads: &ReadStore,
        read: ReadId,
        tolerance: Tolerance,
    ) -> bool {
        match self {
            Assembly::Primary(assembly) => {
                assembly.try_add_support(checker, reads, read, tolerance)
            }
            Assembly::Gapped(assembly) => {
                assembly.try_add_support(checker, reads, read, tolerance)
            }
        }
    }

    pub fn recalculate_base_quality(&mut self, reads: &ReadStore) {
        match self {
            Assembly::Primary(assembly) => assembly.recalculate_base_quality(reads),
            Assembly::Gapped(assembly) => assembly.recalculate_base_quality(reads),
        }
    }
}

impl_sequence_via_supported!(PrimaryAssembly, ExtendedAssembly, GappedAssembly, Assembly);
