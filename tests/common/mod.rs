use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bio_types::strand::ReqStrand;
use rust_htslib::bam;
use rust_htslib::bam::record::{Cigar, CigarString};
use rust_htslib::bam::Read as BamRead;

use breakpoint_assembly::{Read, ReadId, ReadStore};

/// 200 bases of chr1. The deletion used below removes 60..120.
pub const REFERENCE: &str = "TTAGTTGTGCCGCAGCGAAGTAGTGCTTGAAATATGCGACCCCTAAGTAGGAGCGTATGCGCCCAGTAACCAATGCCTGTTGAGATGCCAGACGCGTAACCAAAACATAGAAACCATCAATAGACAGGTCATAATCGGTCCACCGGATCATTGGTGCATAGAGCCTGGGCGTTAACGCCCTTTATTACTAGCTTAATGGT";

pub fn setup_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn reference(range: std::ops::Range<usize>) -> &'static str {
    &REFERENCE[range]
}

pub fn push_read(
    store: &mut ReadStore,
    name: &str,
    start: i64,
    cigar: Vec<Cigar>,
    bases: &str,
) -> ReadId {
    store.push(Read::new(
        name,
        "chr1",
        start,
        CigarString(cigar),
        bases.as_bytes().to_vec(),
        vec![30; bases.len()],
        ReqStrand::Forward,
    ))
}

/// Write `REFERENCE` as indexed FASTA.
pub fn write_reference(dir: &Path) -> PathBuf {
    let path = dir.join("ref.fa");
    fs::write(&path, format!(">chr1\n{}\n", REFERENCE)).unwrap();
    fs::write(
        dir.join("ref.fa.fai"),
        format!("chr1\t{}\t6\t{}\t{}\n", REFERENCE.len(), REFERENCE.len(), REFERENCE.len() + 1),
    )
    .unwrap();
    path
}

/// A read for the BAM file: name, 0-based start, CIGAR and bases.
pub struct SamRecord<'a> {
    pub name: &'a str,
    pub start: i64,
    pub cigar: String,
    pub bases: String,
}

/// Write coordinate sorted records as indexed BAM file, going through SAM.
pub fn write_bam(dir: &Path, records: &[SamRecord]) -> PathBuf {
    let lines: Vec<_> = records
        .iter()
        .map(|record| {
            format!(
                "{}\t0\tchr1\t{}\t60\t{}\t*\t0\t0\t{}\t{}",
                record.name,
                record.start + 1,
                record.cigar,
                record.bases,
                "?".repeat(record.bases.len())
            )
        })
        .collect();
    write_bam_lines(dir, &lines)
}

/// Write raw, coordinate sorted SAM alignment lines as indexed BAM file.
pub fn write_bam_lines(dir: &Path, lines: &[String]) -> PathBuf {
    let sam_path = dir.join("reads.sam");
    let mut sam = fs::File::create(&sam_path).unwrap();
    writeln!(sam, "@HD\tVN:1.6\tSO:coordinate").unwrap();
    writeln!(sam, "@SQ\tSN:chr1\tLN:{}", REFERENCE.len()).unwrap();
    for line in lines {
        writeln!(sam, "{}", line).unwrap();
    }
    drop(sam);

    let bam_path = dir.join("reads.bam");
    let mut reader = bam::Reader::from_path(&sam_path).unwrap();
    let header = bam::Header::from_template(reader.header());
    let mut writer = bam::Writer::from_path(&bam_path, &header, bam::Format::Bam).unwrap();
    for record in reader.records() {
        writer.write(&record.unwrap()).unwrap();
    }
    drop(writer);
    bam::index::build(&bam_path, None, bam::index::Type::Bai, 1).unwrap();

    bam_path
}
