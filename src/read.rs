// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::ops::Index;
use std::str;

use anyhow::Result;
use bio_types::strand::ReqStrand;
use rust_htslib::bam;
use rust_htslib::bam::record::{Cigar, CigarString};
use rust_htslib::bam::Read as BamRead;

use crate::errors::Error;
use crate::sequence::Sequence;

/// Handle of a read inside a [`ReadStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReadId(usize);

/// An aligned read. Bases and qualities are stored in reference orientation, the way
/// they are reported in BAM records.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct Read {
    name: String,
    #[getset(get = "pub")]
    contig: String,
    /// 0-based position of the first aligned reference base.
    #[getset(get_copy = "pub")]
    alignment_start: i64,
    #[getset(get = "pub")]
    cigar: CigarString,
    bases: Vec<u8>,
    quals: Vec<u8>,
    #[getset(get_copy = "pub")]
    strand: ReqStrand,
}

impl Read {
    /// Create a new read.
    ///
    /// # Panics
    ///
    /// If bases and qualities differ in length or the CIGAR does not consume exactly
    /// the given bases.
    pub fn new(
        name: &str,
        contig: &str,
        alignment_start: i64,
        cigar: CigarString,
        bases: Vec<u8>,
        quals: Vec<u8>,
        strand: ReqStrand,
    ) -> Self {
        assert_eq!(
            bases.len(),
            quals.len(),
            "bases and qualities of read {} differ in length",
            name
        );
        assert_eq!(
            query_len(&cigar),
            bases.len() as u32,
            "CIGAR of read {} does not match its length",
            name
        );
        Read {
            name: name.to_owned(),
            contig: contig.to_owned(),
            alignment_start,
            cigar,
            bases,
            quals,
            strand,
        }
    }

    /// Convert a mapped BAM record aligned to `contig`. Records without sequence or base
    /// qualities (`*` in SAM) are rejected with [`Error::UnusableRecord`].
    pub fn from_record(record: &bam::Record, contig: &str) -> Result<Self> {
        let name = str::from_utf8(record.qname())?.to_owned();
        if record.is_unmapped() {
            return Err(Error::UnmappedRecord { name }.into());
        }
        let unusable = |reason: &str| Error::UnusableRecord {
            name: name.clone(),
            reason: reason.to_owned(),
        };
        if record.seq_len() == 0 {
            return Err(unusable("missing sequence").into());
        }
        // htslib marks missing qualities with 0xff
        if record.qual()[0] == 0xff {
            return Err(unusable("missing base qualities").into());
        }
        let cigar = record.cigar().take();
        if query_len(&cigar) as usize != record.seq_len() {
            return Err(unusable("CIGAR does not match sequence length").into());
        }
        let strand = if record.is_reverse() {
            ReqStrand::Reverse
        } else {
            ReqStrand::Forward
        };
        Ok(Read::new(
            &name,
            contig,
            record.pos(),
            cigar,
            record.seq().as_bytes(),
            record.qual().to_vec(),
            strand,
        ))
    }

    pub fn is_reverse(&self) -> bool {
        self.strand == ReqStrand::Reverse
    }

    /// Number of reference bases covered by the alignment.
    pub fn reference_len(&self) -> i64 {
        self.cigar
            .iter()
            .map(|op| match *op {
                Cigar::Match(l)
                | Cigar::Equal(l)
                | Cigar::Diff(l)
                | Cigar::Del(l)
                | Cigar::RefSkip(l) => l as i64,
                _ => 0,
            })
            .sum()
    }

    /// Exclusive end of the alignment on the reference.
    pub fn alignment_end(&self) -> i64 {
        self.alignment_start + self.reference_len()
    }

    /// Leading soft clip, looking through an outer hard clip.
    pub fn leading_soft_clip(&self) -> u32 {
        soft_clip(self.cigar.first(), self.cigar.get(1))
    }

    /// Trailing soft clip, looking through an outer hard clip.
    pub fn trailing_soft_clip(&self) -> u32 {
        let n = self.cigar.len();
        if n == 0 {
            return 0;
        }
        soft_clip(
            self.cigar.last(),
            n.checked_sub(2).and_then(|i| self.cigar.get(i)),
        )
    }

    pub fn is_soft_clipped(&self) -> bool {
        self.leading_soft_clip() > 0 || self.trailing_soft_clip() > 0
    }

    /// Index of the read base aligned to the given reference position.
    ///
    /// Positions inside a deletion map to the next aligned base. Positions outside the
    /// alignment are extrapolated through the soft clips, hence the result may be negative
    /// or exceed the read length.
    pub fn read_index_at(&self, pos: i64) -> i64 {
        let mut ref_pos = self.alignment_start;
        let mut read_idx = 0;

        if pos < ref_pos {
            return self.leading_soft_clip() as i64 - (ref_pos - pos);
        }

        for op in self.cigar.iter() {
            match *op {
                Cigar::Match(l) | Cigar::Equal(l) | Cigar::Diff(l) => {
                    let l = l as i64;
                    if pos < ref_pos + l {
                        return read_idx + (pos - ref_pos);
                    }
                    ref_pos += l;
                    read_idx += l;
                }
                Cigar::Del(l) | Cigar::RefSkip(l) => {
                    let l = l as i64;
                    if pos < ref_pos + l {
                        return read_idx;
                    }
                    ref_pos += l;
                }
                Cigar::Ins(l) | Cigar::SoftClip(l) => read_idx += l as i64,
                Cigar::HardClip(_) | Cigar::Pad(_) => (),
            }
        }

        read_idx - self.trailing_soft_clip() as i64 + (pos - ref_pos)
    }

    /// Same read, aligned differently. Bases are never changed.
    pub(crate) fn realigned(
        &self,
        alignment_start: i64,
        cigar: CigarString,
        quals: Vec<u8>,
    ) -> Self {
        Read::new(
            &self.name,
            &self.contig,
            alignment_start,
            cigar,
            self.bases.clone(),
            quals,
            self.strand,
        )
    }
}

impl Sequence for Read {
    fn name(&self) -> &str {
        &self.name
    }

    fn bases(&self) -> &[u8] {
        &self.bases
    }

    fn base_quality(&self) -> &[u8] {
        &self.quals
    }
}

fn soft_clip(outer: Option<&Cigar>, inner: Option<&Cigar>) -> u32 {
    match (outer, inner) {
        (Some(&Cigar::HardClip(_)), Some(&Cigar::SoftClip(l))) => l,
        (Some(&Cigar::SoftClip(l)), _) => l,
        _ => 0,
    }
}

/// Number of read bases consumed by the CIGAR.
pub(crate) fn query_len(cigar: &CigarString) -> u32 {
    cigar
        .iter()
        .map(|op| match *op {
            Cigar::Match(l)
            | Cigar::Equal(l)
            | Cigar::Diff(l)
            | Cigar::Ins(l)
            | Cigar::SoftClip(l) => l,
            _ => 0,
        })
        .sum()
}

/// Arena of reads, owned by whoever orchestrates the assembly of a junction.
#[derive(Debug, Default)]
pub struct ReadStore {
    reads: Vec<Read>,
}

impl ReadStore {
    pub fn new() -> Self {
        ReadStore::default()
    }

    pub fn push(&mut self, read: Read) -> ReadId {
        self.reads.push(read);
        ReadId(self.reads.len() - 1)
    }

    pub fn get(&self, id: ReadId) -> &Read {
        &self.reads[id.0]
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ReadId> {
        (0..self.reads.len()).map(ReadId)
    }

    /// Load all primary, non-duplicate alignments of `contig` overlapping `start..end`
    /// with a mapping quality of at least `min_mapq`. Records lacking sequence or base
    /// qualities are skipped.
    pub fn fetch(
        &mut self,
        bam: &mut bam::IndexedReader,
        contig: &str,
        start: i64,
        end: i64,
        min_mapq: u8,
    ) -> Result<Vec<ReadId>> {
        if bam.header().tid(contig.as_bytes()).is_none() {
            return Err(Error::UnknownContig {
                contig: contig.to_owned(),
            }
            .into());
        }
        bam.fetch((contig, start.max(0), end))?;

        let mut ids = Vec::new();
        let mut skipped = 0;
        let mut record = bam::Record::new();
        while let Some(res) = bam.read(&mut record) {
            res?;
            if record.is_unmapped()
                || record.is_secondary()
                || record.is_supplementary()
                || record.is_duplicate()
                || record.is_quality_check_failed()
                || record.mapq() < min_mapq
            {
                continue;
            }
            match Read::from_record(&record, contig) {
                Ok(read) => ids.push(self.push(read)),
                Err(e) => match e.downcast_ref::<Error>() {
                    Some(Error::UnusableRecord { .. }) => {
                        debug!("{}", e);
                        skipped += 1;
                    }
                    _ => return Err(e),
                },
            }
        }
        debug!(
            "fetched {} reads from {}:{}-{}, skipped {} unusable records",
            ids.len(),
            contig,
            start,
            end,
            skipped
        );

        Ok(ids)
    }
}

impl Index<ReadId> for ReadStore {
    type Output = Read;

    fn index(&self, id: ReadId) -> &Read {
        self.get(id)
    }
}
