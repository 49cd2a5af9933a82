// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::ops::Range;

/// A base sequence paired with per-base Phred qualities.
///
/// Implementors guarantee that `bases()` and `base_quality()` have equal length.
pub trait Sequence {
    fn name(&self) -> &str;

    fn bases(&self) -> &[u8];

    fn base_quality(&self) -> &[u8];

    fn len(&self) -> usize {
        self.bases().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arithmetic mean of the base qualities, rounded toward zero. Empty sequences have
    /// an average quality of 0.
    fn average_quality(&self) -> u8 {
        average_quality(self.base_quality())
    }

    /// Borrow the bases and qualities of `start..start + len` without copying.
    fn sub_sequence(&self, start: usize, len: usize) -> SequenceView<'_> {
        SequenceView::new(self.name(), self.bases(), self.base_quality(), start..start + len)
    }
}

/// Floored mean of the given qualities.
pub fn average_quality(quals: &[u8]) -> u8 {
    if quals.is_empty() {
        return 0;
    }
    let sum: u64 = quals.iter().map(|q| *q as u64).sum();
    (sum / quals.len() as u64) as u8
}

/// A borrowed sub-range of another sequence.
#[derive(Debug, Clone, Copy)]
pub struct SequenceView<'a> {
    name: &'a str,
    bases: &'a [u8],
    quals: &'a [u8],
}

impl<'a> SequenceView<'a> {
    fn new(name: &'a str, bases: &'a [u8], quals: &'a [u8], range: Range<usize>) -> Self {
        assert_eq!(
            bases.len(),
            quals.len(),
            "bases and qualities of {} differ in length",
            name
        );
        assert!(
            range.end <= bases.len(),
            "sub-sequence {:?} exceeds length {} of {}",
            range,
            bases.len(),
            name
        );
        SequenceView {
            name,
            bases: &bases[range.clone()],
            quals: &quals[range],
        }
    }
}

impl<'a> Sequence for SequenceView<'a> {
    fn name(&self) -> &str {
        self.name
    }

    fn bases(&self) -> &[u8] {
        self.bases
    }

    fn base_quality(&self) -> &[u8] {
        self.quals
    }
}

/// Implement [`Sequence`] for a type that exposes a `SupportedAssembly` via `supported()`.
macro_rules! impl_sequence_via_supported {
    ($($t:ty),+) => {
        $(
            impl $crate::sequence::Sequence for $t {
                fn name(&self) -> &str {
                    $crate::sequence::Sequence::name(self.supported())
                }

                fn bases(&self) -> &[u8] {
                    $crate::sequence::Sequence::bases(self.supported())
                }

                fn base_quality(&self) -> &[u8] {
                    $crate::sequence::Sequence::base_quality(self.supported())
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain {
        bases: Vec<u8>,
        quals: Vec<u8>,
    }

    impl Sequence for Plain {
        fn name(&self) -> &str {
            "plain"
        }

        fn bases(&self) -> &[u8] {
            &self.bases
        }

        fn base_quality(&self) -> &[u8] {
            &self.quals
        }
    }

    #[test]
    fn test_average_quality_rounds_toward_zero() {
        assert_eq!(average_quality(&[30, 31]), 30);
        assert_eq!(average_quality(&[10, 10, 11]), 10);
        assert_eq!(average_quality(&[]), 0);
    }

    #[test]
    fn test_sub_sequence() {
        let seq = Plain {
            bases: b"ACGTACGT".to_vec(),
            quals: vec![10, 20, 30, 40, 10, 20, 30, 40],
        };
        let view = seq.sub_sequence(2, 3);
        assert_eq!(view.bases(), b"GTA");
        assert_eq!(view.base_quality(), &[30, 40, 10]);
        assert_eq!(view.average_quality(), 26);
        assert_eq!(view.name(), "plain");

        let nested = view.sub_sequence(1, 2);
        assert_eq!(nested.bases(), b"TA");
    }

    #[test]
    #[should_panic]
    fn test_sub_sequence_out_of_bounds() {
        let seq = Plain {
            bases: b"ACGT".to_vec(),
            quals: vec![30; 4],
        };
        seq.sub_sequence(2, 3);
    }
}
