use std::fs;

use rust_htslib::bam;
use rust_htslib::bam::record::Cigar;
use serde_json::Value;

use breakpoint_assembly::assembly::{MismatchSupportChecker, Tolerance, GAP_SEPARATOR};
use breakpoint_assembly::cli::{run, BreakpointAssembly};
use breakpoint_assembly::{
    ExtendedAssembly, GappedAssembly, PrimaryAssembly, ReadStore, Sequence,
};

mod common;

use common::{push_read, reference, write_bam, write_bam_lines, write_reference, SamRecord};

fn gapped_from(bases: &[&str]) -> GappedAssembly {
    let sources = bases
        .iter()
        .enumerate()
        .map(|(i, bases)| {
            let name = format!("p{}", i);
            let primary = PrimaryAssembly::new(&name, bases.as_bytes().to_vec(), "chr1", 0, 0);
            ExtendedAssembly::new(&name, &primary)
        })
        .collect();
    GappedAssembly::new("gapped", sources)
}

#[test]
fn test_gapped_assembly_offsets() {
    let mut reads = ReadStore::new();
    let id = push_read(&mut reads, "r", 0, vec![Cigar::Match(4)], "GTTT");
    let checker = MismatchSupportChecker::new(4, 1, 0, 20);

    let mut gapped = gapped_from(&["AAACCC", "GGGTTT"]);
    assert_eq!(gapped.bases(), b"AAACCCXGGGTTT");
    assert_eq!(gapped.len(), 13);
    assert_eq!(gapped.bases()[6], GAP_SEPARATOR);

    assert!(gapped.try_add_support(&checker, &reads, id, Tolerance::Strict));
    assert_eq!(gapped.supported().support()[0].offset(), 9);
}

#[test]
fn test_trim_relocates_anchor() {
    let primary = PrimaryAssembly::new("p", b"ACGTACGTAC".to_vec(), "chr1", 500, 8);
    let trimmed = primary.trim(0, 3).unwrap();

    assert_eq!(trimmed.len(), 7);
    assert!(trimmed.anchor_position_in_assembly() < 7);
    let delta = 8 - trimmed.anchor_position_in_assembly() as i64;
    assert_eq!(trimmed.anchor_position(), 500 - delta);
}

#[test]
fn test_flip_strand_twice() {
    let mut reads = ReadStore::new();
    let a = push_read(&mut reads, "a", 0, vec![Cigar::Match(4)], "ACCC");
    let b = push_read(&mut reads, "b", 0, vec![Cigar::Match(5)], "GGGTT");

    let mut gapped = gapped_from(&["AAACCC", "GGGTTT", "CAT"]);
    gapped.add_evidence_at(a, 2);
    gapped.add_evidence_at(b, 7);
    gapped.recalculate_base_quality(&reads);

    let flipped = gapped.flip_strand(&reads);
    assert_eq!(flipped.bases(), b"ATGXAAACCCXGGGTTT");
    let back = flipped.flip_strand(&reads);
    assert_eq!(back, gapped);
}

/// Reads around a deletion of 60..120, clipped at both sides of it.
fn deletion_records() -> Vec<SamRecord<'static>> {
    let left = |name, start: usize, clipped: usize| SamRecord {
        name,
        start: start as i64,
        cigar: format!("{}M{}S", 60 - start, clipped),
        bases: format!("{}{}", reference(start..60), reference(120..120 + clipped)),
    };
    let right = |name, clipped: usize, aligned: usize| SamRecord {
        name,
        start: 120,
        cigar: format!("{}S{}M", clipped, aligned),
        bases: format!(
            "{}{}",
            reference(60 - clipped..60),
            reference(120..120 + aligned)
        ),
    };
    vec![
        SamRecord {
            name: "n2",
            start: 0,
            cigar: "35M".to_owned(),
            bases: reference(0..35).to_owned(),
        },
        left("l3", 30, 5),
        left("l1", 35, 10),
        left("l2", 40, 15),
        right("r1", 8, 27),
        right("r2", 12, 23),
        right("r3", 6, 29),
        SamRecord {
            name: "n1",
            start: 140,
            cigar: "35M".to_owned(),
            bases: reference(140..175).to_owned(),
        },
    ]
}

#[test]
fn test_assemble_deletion() {
    common::setup_logger();
    let dir = tempfile::tempdir().unwrap();
    let reference_path = write_reference(dir.path());
    let bam_path = write_bam(dir.path(), &deletion_records());

    let junctions = dir.path().join("junctions.tsv");
    fs::write(&junctions, "chr1\t59\t+\tdel\nchr1\t120\t-\tdel\n").unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(&config, "min_overlap: 10\n").unwrap();
    let output = dir.path().join("assemblies.jsonl");

    run(BreakpointAssembly::Assemble {
        bam: bam_path,
        reference: reference_path,
        junctions,
        config: Some(config),
        output: Some(output.clone()),
        threads: 2,
        reference_buffer_size: 1,
        verbose: false,
    })
    .unwrap();

    let assemblies: Vec<Value> = fs::read_to_string(&output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(assemblies.len(), 3);

    let forward = &assemblies[0];
    let forward_bases = format!("{}{}", reference(40..60), reference(120..135));
    assert_eq!(forward["name"], "chr1:59+");
    assert_eq!(forward["kind"], "primary");
    assert_eq!(forward["bases"], forward_bases.as_str());
    assert_eq!(forward["anchor"]["position"], 59);
    assert_eq!(forward["anchor"]["index"], 19);
    assert_eq!(forward["support"].as_array().unwrap().len(), 6);
    assert_eq!(forward["support"][0]["read"], "l2");

    let reverse = &assemblies[1];
    let reverse_bases = format!("{}{}", reference(48..60), reference(120..143));
    assert_eq!(reverse["name"], "chr1:120-");
    assert_eq!(reverse["bases"], reverse_bases.as_str());
    assert_eq!(reverse["anchor"]["position"], 120);
    assert_eq!(reverse["anchor"]["index"], 12);

    let gapped = &assemblies[2];
    assert_eq!(gapped["name"], "del");
    assert_eq!(gapped["kind"], "gapped");
    assert_eq!(
        gapped["bases"],
        format!("{}X{}", forward_bases, reverse_bases).as_str()
    );
    assert_eq!(gapped["sources"][0], "chr1:59+");
    assert_eq!(gapped["sources"][1], "chr1:120-");
    assert_eq!(gapped["support"].as_array().unwrap().len(), 12);
    assert_eq!(gapped["base_quality"][35], 0);
    assert_eq!(gapped["base_quality"][0], 30);
    assert!(gapped.get("anchor").is_none());
}

#[test]
fn test_fetch_skips_records_without_sequence_or_qualities() {
    common::setup_logger();
    let dir = tempfile::tempdir().unwrap();
    let lines = vec![
        "noseq\t0\tchr1\t11\t60\t10M\t*\t0\t0\t*\t*".to_owned(),
        format!(
            "noqual\t0\tchr1\t16\t60\t10M\t*\t0\t0\t{}\t*",
            reference(15..25)
        ),
        format!(
            "usable\t0\tchr1\t21\t60\t10M\t*\t0\t0\t{}\t{}",
            reference(20..30),
            "?".repeat(10)
        ),
    ];
    let bam_path = write_bam_lines(dir.path(), &lines);

    let mut bam = bam::IndexedReader::from_path(&bam_path).unwrap();
    let mut reads = ReadStore::new();
    let ids = reads.fetch(&mut bam, "chr1", 0, 100, 0).unwrap();

    assert_eq!(ids.len(), 1);
    assert_eq!(reads[ids[0]].name(), "usable");
    assert_eq!(reads[ids[0]].base_quality(), &[30; 10][..]);
}

#[test]
fn test_unknown_contig_is_skipped() {
    common::setup_logger();
    let dir = tempfile::tempdir().unwrap();
    let reference_path = write_reference(dir.path());
    let bam_path = write_bam(dir.path(), &deletion_records());

    let junctions = dir.path().join("junctions.tsv");
    fs::write(&junctions, "chr2\t59\t+\nchr1\t59\t+\n").unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(&config, "min_overlap: 10\n").unwrap();
    let output = dir.path().join("assemblies.jsonl");

    run(BreakpointAssembly::Assemble {
        bam: bam_path,
        reference: reference_path,
        junctions,
        config: Some(config),
        output: Some(output.clone()),
        threads: 1,
        reference_buffer_size: 1,
        verbose: false,
    })
    .unwrap();

    let assemblies: Vec<Value> = fs::read_to_string(&output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(assemblies.len(), 1);
    assert_eq!(assemblies[0]["name"], "chr1:59+");
}
