// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::cmp;

use crate::assembly::gapped::GAP_SEPARATOR;
use crate::config::AssemblyConfig;
use crate::sequence::Sequence;

/// How forgiving a support check is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tolerance {
    Weak,
    Strict,
}

/// Decides whether, and at which offset, a read aligns against an assembly.
pub trait SupportChecker {
    /// Offset of the first read base relative to the first assembly base, if the read
    /// supports the assembly. The offset is negative if the read starts before the
    /// assembly.
    fn support_index<A, R>(&self, assembly: &A, read: &R, tolerance: Tolerance) -> Option<i32>
    where
        A: Sequence + ?Sized,
        R: Sequence + ?Sized;

    fn weak_support_index<A, R>(&self, assembly: &A, read: &R) -> Option<i32>
    where
        A: Sequence + ?Sized,
        R: Sequence + ?Sized,
    {
        self.support_index(assembly, read, Tolerance::Weak)
    }

    fn strict_support_index<A, R>(&self, assembly: &A, read: &R) -> Option<i32>
    where
        A: Sequence + ?Sized,
        R: Sequence + ?Sized,
    {
        self.support_index(assembly, read, Tolerance::Strict)
    }
}

/// Ungapped overlap check that counts mismatching bases.
///
/// Every offset with at least `min_overlap` overlapping bases is tried, so reads or
/// assemblies shorter than `min_overlap` never align. Under weak
/// tolerance, mismatches at read bases with a quality below `low_base_quality` are not
/// counted. The offset with the fewest mismatches wins, ties are broken by the larger
/// overlap and then by the leftmost offset.
#[derive(new, Debug, Clone, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct MismatchSupportChecker {
    min_overlap: usize,
    weak_max_mismatches: usize,
    strict_max_mismatches: usize,
    low_base_quality: u8,
}

impl MismatchSupportChecker {
    pub fn from_config(config: &AssemblyConfig) -> Self {
        MismatchSupportChecker::new(
            config.min_overlap,
            config.weak_max_mismatches,
            config.strict_max_mismatches,
            config.low_base_quality,
        )
    }

    fn max_mismatches(&self, tolerance: Tolerance) -> usize {
        match tolerance {
            Tolerance::Weak => self.weak_max_mismatches,
            Tolerance::Strict => self.strict_max_mismatches,
        }
    }
}

fn bases_match(read_base: u8, assembly_base: u8) -> bool {
    if assembly_base == GAP_SEPARATOR {
        return false;
    }
    let (read_base, assembly_base) = (
        read_base.to_ascii_uppercase(),
        assembly_base.to_ascii_uppercase(),
    );
    read_base == assembly_base || read_base == b'N' || assembly_base == b'N'
}

impl SupportChecker for MismatchSupportChecker {
    fn support_index<A, R>(&self, assembly: &A, read: &R, tolerance: Tolerance) -> Option<i32>
    where
        A: Sequence + ?Sized,
        R: Sequence + ?Sized,
    {
        let asm = assembly.bases();
        let bases = read.bases();
        let quals = read.base_quality();
        let min_overlap = self.min_overlap;
        if min_overlap == 0 || asm.len() < min_overlap || bases.len() < min_overlap {
            return None;
        }
        let max_mismatches = self.max_mismatches(tolerance);

        // (mismatches, overlap, offset)
        let mut best: Option<(usize, usize, i32)> = None;
        let first = min_overlap as i64 - bases.len() as i64;
        let last = asm.len() as i64 - min_overlap as i64;
        for offset in first..=last {
            let read_start = cmp::max(0, -offset) as usize;
            let asm_start = cmp::max(0, offset) as usize;
            let overlap = cmp::min(bases.len() - read_start, asm.len() - asm_start);
            if overlap < min_overlap {
                continue;
            }

            let mut mismatches = 0;
            for k in 0..overlap {
                if bases_match(bases[read_start + k], asm[asm_start + k]) {
                    continue;
                }
                if tolerance == Tolerance::Weak && quals[read_start + k] < self.low_base_quality {
                    continue;
                }
                mismatches += 1;
                if mismatches > max_mismatches {
                    break;
                }
            }
            if mismatches > max_mismatches {
                continue;
            }

            let better = match best {
                None => true,
                Some((best_mismatches, best_overlap, _)) => {
                    mismatches < best_mismatches
                        || (mismatches == best_mismatches && overlap > best_overlap)
                }
            };
            if better {
                best = Some((mismatches, overlap, offset as i32));
            }
        }

        best.map(|(_, _, offset)| offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::tests::read;
    use crate::read::Read;
    use rust_htslib::bam::record::Cigar;

    fn plain(bases: &[u8], quals: Vec<u8>) -> Read {
        read("r", 0, vec![Cigar::Match(bases.len() as u32)], bases, quals)
    }

    fn assembly(bases: &[u8]) -> Read {
        plain(bases, vec![40; bases.len()])
    }

    #[test]
    fn test_exact_match() {
        let checker = MismatchSupportChecker::new(4, 2, 0, 20);
        let asm = assembly(b"AAACCCGGGTTT");
        assert_eq!(
            checker.strict_support_index(&asm, &plain(b"CCGGG", vec![30; 5])),
            Some(4)
        );
    }

    #[test]
    fn test_overhanging_read() {
        let checker = MismatchSupportChecker::new(4, 2, 0, 20);
        let asm = assembly(b"GGGTTTAC");
        // read starts two bases before the assembly
        assert_eq!(
            checker.strict_support_index(&asm, &plain(b"CAGGGT", vec![30; 6])),
            Some(-2)
        );
        // and ends after it
        assert_eq!(
            checker.strict_support_index(&asm, &plain(b"TTACGA", vec![30; 6])),
            Some(4)
        );
    }

    #[test]
    fn test_tolerance() {
        let checker = MismatchSupportChecker::new(6, 1, 0, 20);
        let asm = assembly(b"ACGTACGTAC");
        let one_mismatch = plain(b"ACGAACGT", vec![30; 8]);
        assert_eq!(checker.strict_support_index(&asm, &one_mismatch), None);
        assert_eq!(checker.weak_support_index(&asm, &one_mismatch), Some(0));

        // low quality mismatches are ignored under weak tolerance only
        let mut quals = vec![30; 8];
        quals[1] = 5;
        quals[3] = 5;
        let low_quality = plain(b"AGGAACGT", quals);
        assert_eq!(checker.weak_support_index(&asm, &low_quality), Some(0));
        assert_eq!(checker.strict_support_index(&asm, &low_quality), None);
    }

    #[test]
    fn test_no_support() {
        let checker = MismatchSupportChecker::new(4, 1, 0, 20);
        let asm = assembly(b"AAAAAAAA");
        assert_eq!(
            checker.weak_support_index(&asm, &plain(b"CCCCGGGG", vec![30; 8])),
            None
        );
        // shorter than the minimum overlap never supports an empty assembly
        assert_eq!(
            checker.weak_support_index(&assembly(b""), &plain(b"AAAA", vec![30; 4])),
            None
        );
    }

    #[test]
    fn test_min_overlap() {
        let checker = MismatchSupportChecker::new(20, 4, 1, 26);
        let asm = assembly(&b"ACGT".repeat(8)[..30]);
        // matches at offset 2, but is shorter than the minimum overlap
        assert_eq!(
            checker.strict_support_index(&asm, &plain(b"GTA", vec![30; 3])),
            None
        );

        // a long read ending in a short assembly only overlaps by five bases
        let mut bases = b"T".repeat(25);
        bases.extend_from_slice(b"ACGTA");
        assert_eq!(
            checker.weak_support_index(&assembly(b"ACGTA"), &plain(&bases, vec![30; 30])),
            None
        );

        // the same read against a long enough assembly aligns
        let long = assembly(&bases[5..]);
        assert_eq!(
            checker.strict_support_index(&long, &plain(&bases, vec![30; 30])),
            Some(-5)
        );
    }

    #[test]
    fn test_largest_overlap_wins() {
        let checker = MismatchSupportChecker::new(4, 0, 0, 20);
        // matches at offset -2 by four bases and at offset 8 by all six
        let asm = assembly(b"GTACTTTTACGTAC");
        let read = plain(b"ACGTAC", vec![30; 6]);
        assert_eq!(checker.strict_support_index(&asm, &read), Some(8));

        // equal overlaps at offsets 0 and 4, the leftmost wins
        let asm = assembly(b"ACGTACGTAC");
        assert_eq!(checker.strict_support_index(&asm, &read), Some(0));
    }

    #[test]
    fn test_n_bases_match() {
        let checker = MismatchSupportChecker::new(4, 0, 0, 20);
        let asm = assembly(b"ACGTNCGT");
        assert_eq!(
            checker.strict_support_index(&asm, &plain(b"ACGTACGT", vec![30; 8])),
            Some(0)
        );
    }
}
