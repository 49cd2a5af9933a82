// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::ops::Range;

use anyhow::Result;
use itertools::Itertools;
use rust_htslib::bam::record::{Cigar, CigarString};

use crate::read::Read;
use crate::reference::ReferenceLookup;
use crate::sequence::Sequence;

/// Qualities at or below this value mark an untrusted read tail.
pub const QUALITY_TAIL_MARKER: u8 = 2;

/// Repairs reads whose soft clipped bases actually match the reference next to the
/// alignment.
#[derive(Debug, Clone)]
pub struct ReadRescue<R> {
    reference: R,
}

impl<R: ReferenceLookup> ReadRescue<R> {
    pub fn new(reference: R) -> Self {
        ReadRescue { reference }
    }

    /// Fold soft clipped bases that match the adjacent reference into the alignment.
    ///
    /// Matching is done base by base, walking outward from the alignment boundary and
    /// stopping at the first mismatch. Rescued bases at the 3' end of the sequenced
    /// molecule that carry the [`QUALITY_TAIL_MARKER`] take the quality of the nearest
    /// 5'-ward trusted base. Bases are never changed; if nothing can be rescued an equal
    /// read is returned.
    pub fn rescue_read(&self, read: &Read) -> Result<Read> {
        let len = read.len();
        let leading = read.leading_soft_clip() as usize;
        let trailing = read.trailing_soft_clip() as usize;

        let mut rescued_left = 0;
        for k in 0..leading {
            let pos = read.alignment_start() - 1 - k as i64;
            if !self.matches_reference(read, leading - 1 - k, pos)? {
                break;
            }
            rescued_left += 1;
        }

        let trailing_start = len - trailing;
        let mut rescued_right = 0;
        for k in 0..trailing {
            let pos = read.alignment_end() + k as i64;
            if !self.matches_reference(read, trailing_start + k, pos)? {
                break;
            }
            rescued_right += 1;
        }

        if rescued_left == 0 && rescued_right == 0 {
            return Ok(read.clone());
        }
        debug!(
            "rescued {} leading and {} trailing soft clipped bases of read {}",
            rescued_left,
            rescued_right,
            read.name()
        );

        let cigar = rescued_cigar(read.cigar(), rescued_left as u32, rescued_right as u32);
        let quals = rescued_quality(
            read,
            leading - rescued_left..leading,
            trailing_start..trailing_start + rescued_right,
        );

        Ok(read.realigned(
            read.alignment_start() - rescued_left as i64,
            cigar,
            quals,
        ))
    }

    fn matches_reference(&self, read: &Read, read_idx: usize, pos: i64) -> Result<bool> {
        let base = read.bases()[read_idx].to_ascii_uppercase();
        if base == b'N' {
            return Ok(false);
        }
        Ok(self
            .reference
            .base(read.contig(), pos)?
            .map_or(false, |ref_base| ref_base.to_ascii_uppercase() == base))
    }
}

/// Index of the leading or trailing soft clip, looking through an outer hard clip.
fn soft_clip_index(cigar: &CigarString, trailing: bool) -> Option<usize> {
    let n = cigar.len();
    let (outer, inner) = if trailing {
        (n.checked_sub(1), n.checked_sub(2))
    } else {
        (Some(0), Some(1))
    };
    match outer.and_then(|i| cigar.get(i)) {
        Some(Cigar::SoftClip(_)) => outer,
        Some(Cigar::HardClip(_)) => match inner.and_then(|i| cigar.get(i)) {
            Some(Cigar::SoftClip(_)) => inner,
            _ => None,
        },
        _ => None,
    }
}

fn rescued_cigar(cigar: &CigarString, left: u32, right: u32) -> CigarString {
    let leading = soft_clip_index(cigar, false);
    let trailing = soft_clip_index(cigar, true);

    let mut ops = Vec::with_capacity(cigar.len() + 2);
    for (i, op) in cigar.iter().enumerate() {
        match *op {
            Cigar::SoftClip(l) if left > 0 && Some(i) == leading => {
                ops.push(Cigar::SoftClip(l - left));
                ops.push(Cigar::Match(left));
            }
            Cigar::SoftClip(l) if right > 0 && Some(i) == trailing => {
                ops.push(Cigar::Match(right));
                ops.push(Cigar::SoftClip(l - right));
            }
            op => ops.push(op),
        }
    }

    CigarString(
        ops.into_iter()
            .filter(|op| op.len() > 0)
            .coalesce(|a, b| match (a, b) {
                (Cigar::Match(x), Cigar::Match(y)) => Ok(Cigar::Match(x + y)),
                _ => Err((a, b)),
            })
            .collect(),
    )
}

/// Qualities of the rescued read in reference orientation. The 3' end of the molecule
/// is the trailing end for forward reads and the leading end for reverse reads, hence
/// the repair runs on the qualities in sequencing order.
fn rescued_quality(read: &Read, left: Range<usize>, right: Range<usize>) -> Vec<u8> {
    let mut quals = read.base_quality().to_vec();
    let len = quals.len();

    if read.is_reverse() {
        quals.reverse();
        lift_tail_marker(&mut quals, len - left.end..len - left.start);
        quals.reverse();
    } else {
        lift_tail_marker(&mut quals, right);
    }

    quals
}

fn lift_tail_marker(quals: &mut [u8], range: Range<usize>) {
    let mut fill = quals[..range.start]
        .iter()
        .rev()
        .find(|qual| **qual > QUALITY_TAIL_MARKER)
        .cloned();
    for i in range {
        if quals[i] > QUALITY_TAIL_MARKER {
            fill = Some(quals[i]);
        } else if let Some(qual) = fill {
            quals[i] = qual;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bio_types::strand::ReqStrand;

    use super::*;

    const REFERENCE: &[u8] = b"ACGTACGTACGTACGTACGT";

    fn rescue() -> ReadRescue<HashMap<String, Vec<u8>>> {
        let mut reference = HashMap::new();
        reference.insert("chr1".to_owned(), REFERENCE.to_vec());
        ReadRescue::new(reference)
    }

    fn read(
        start: i64,
        cigar: Vec<Cigar>,
        bases: &[u8],
        quals: Vec<u8>,
        strand: ReqStrand,
    ) -> Read {
        Read::new(
            "r",
            "chr1",
            start,
            CigarString(cigar),
            bases.to_vec(),
            quals,
            strand,
        )
    }

    #[test]
    fn test_rescue_trailing_forward() {
        let mut quals = vec![30; 6];
        quals.extend(&[2, 2, 2, 2]);
        // clip should read GTAC, last base mismatches
        let r = read(
            4,
            vec![Cigar::Match(6), Cigar::SoftClip(4)],
            b"ACGTACGTAG",
            quals,
            ReqStrand::Forward,
        );
        let rescued = rescue().rescue_read(&r).unwrap();

        assert_eq!(rescued.bases(), r.bases());
        assert_eq!(
            rescued.cigar(),
            &CigarString(vec![Cigar::Match(9), Cigar::SoftClip(1)])
        );
        assert_eq!(rescued.alignment_start(), 4);
        assert_eq!(rescued.base_quality(), &[30, 30, 30, 30, 30, 30, 30, 30, 30, 2]);
        // the input is left alone
        assert_eq!(r.cigar().len(), 2);
        assert_eq!(r.base_quality()[6], 2);
    }

    #[test]
    fn test_rescue_leading_reverse() {
        // clip should read TAC, first base mismatches
        let r = read(
            10,
            vec![Cigar::SoftClip(3), Cigar::Match(5)],
            b"GACGTACG",
            vec![2, 2, 2, 35, 35, 35, 35, 35],
            ReqStrand::Reverse,
        );
        let rescued = rescue().rescue_read(&r).unwrap();

        assert_eq!(
            rescued.cigar(),
            &CigarString(vec![Cigar::SoftClip(1), Cigar::Match(7)])
        );
        assert_eq!(rescued.alignment_start(), 8);
        // the leading end is the 3' end of a reverse read
        assert_eq!(rescued.base_quality(), &[2, 35, 35, 35, 35, 35, 35, 35]);
        assert_eq!(rescued.bases(), r.bases());
    }

    #[test]
    fn test_rescue_leading_forward_keeps_quality() {
        let r = read(
            10,
            vec![Cigar::HardClip(5), Cigar::SoftClip(2), Cigar::Match(4)],
            b"ACGTAC",
            vec![2, 2, 30, 30, 30, 30],
            ReqStrand::Forward,
        );
        let rescued = rescue().rescue_read(&r).unwrap();

        assert_eq!(
            rescued.cigar(),
            &CigarString(vec![Cigar::HardClip(5), Cigar::Match(6)])
        );
        assert_eq!(rescued.alignment_start(), 8);
        assert_eq!(rescued.base_quality(), r.base_quality());
    }

    #[test]
    fn test_nothing_to_rescue() {
        let r = read(
            4,
            vec![Cigar::Match(6), Cigar::SoftClip(2)],
            b"ACGTACCC",
            vec![30; 8],
            ReqStrand::Forward,
        );
        assert_eq!(rescue().rescue_read(&r).unwrap(), r);

        let unclipped = read(
            4,
            vec![Cigar::Match(4)],
            b"ACGT",
            vec![30; 4],
            ReqStrand::Forward,
        );
        assert_eq!(rescue().rescue_read(&unclipped).unwrap(), unclipped);
    }

    #[test]
    fn test_clip_beyond_contig_end() {
        let r = read(
            16,
            vec![Cigar::Match(4), Cigar::SoftClip(3)],
            b"ACGTACG",
            vec![30; 7],
            ReqStrand::Forward,
        );
        assert_eq!(rescue().rescue_read(&r).unwrap(), r);
    }
}
