// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use crossbeam::channel::{Receiver, Sender};
use rust_htslib::bam;
use structopt::StructOpt;

use crate::assembler::{AssemblyRecord, JunctionAssembler, JunctionAssemblerBuilder};
use crate::assembly::Assembly;
use crate::config::AssemblyConfig;
use crate::errors::{invalid_junction_record, Error};
use crate::junction::{Junction, Orientation};
use crate::read::ReadStore;
use crate::reference;
use crate::utils::{worker_pool, Orderable};

#[derive(Debug, StructOpt, Clone)]
#[structopt(
    name = "breakpoint-assembly",
    about = "Local assembly of reads around candidate structural variant junctions."
)]
#[structopt(setting = structopt::clap::AppSettings::ColoredHelp)]
pub enum BreakpointAssembly {
    #[structopt(
        name = "assemble",
        about = "Assemble the soft clipped reads at each given junction and print one JSON record per assembly."
    )]
    #[structopt(setting = structopt::clap::AppSettings::ColoredHelp)]
    Assemble {
        #[structopt(
            long,
            parse(from_os_str),
            help = "Indexed BAM file with the aligned reads."
        )]
        bam: PathBuf,
        #[structopt(
            long,
            parse(from_os_str),
            help = "FASTA file with reference genome. Has to be indexed with samtools faidx."
        )]
        reference: PathBuf,
        #[structopt(
            long,
            parse(from_os_str),
            help = "TSV file with one junction per line: contig, 0-based position, orientation \
                    (+/F or -/R) and an optional group name. Junctions of the same group are \
                    additionally joined into a gapped assembly."
        )]
        junctions: PathBuf,
        #[structopt(
            long,
            parse(from_os_str),
            help = "YAML file with assembly thresholds (if omitted, defaults are used)."
        )]
        config: Option<PathBuf>,
        #[structopt(
            long,
            parse(from_os_str),
            help = "File that shall contain the assemblies as JSON lines (if omitted, write to STDOUT)."
        )]
        output: Option<PathBuf>,
        #[structopt(
            short,
            long,
            default_value = "1",
            help = "Number of threads assembling junctions in parallel."
        )]
        threads: usize,
        #[structopt(
            long = "reference-buffer-size",
            default_value = "10",
            help = "Number of reference contigs to keep in memory."
        )]
        reference_buffer_size: usize,
        #[structopt(short, long, help = "Print debug information.")]
        verbose: bool,
    },
}

impl BreakpointAssembly {
    pub fn verbose(&self) -> bool {
        match self {
            BreakpointAssembly::Assemble { verbose, .. } => *verbose,
        }
    }
}

pub fn run(opt: BreakpointAssembly) -> Result<()> {
    match opt {
        BreakpointAssembly::Assemble {
            bam: bam_path,
            reference: reference_path,
            junctions,
            config,
            output,
            threads,
            reference_buffer_size,
            ..
        } => {
            let config = match config {
                Some(path) => AssemblyConfig::from_path(path)?,
                None => AssemblyConfig::default(),
            };
            let groups = read_junctions(&junctions)?;
            let threads = threads.max(1);
            info!(
                "assembling {} junction groups from {:?} with {} threads",
                groups.len(),
                bam_path,
                threads
            );

            let reference = Arc::new(reference::Buffer::from_path(
                &reference_path,
                reference_buffer_size,
            )?);
            let mut writer: Box<dyn Write + Send> = match output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(BufWriter::new(io::stdout())),
            };

            let preprocessor = |sender: Sender<(usize, JunctionGroup)>| -> Result<()> {
                for item in groups.into_iter().enumerate() {
                    sender
                        .send(item)
                        .map_err(|_| anyhow!("all assembly workers stopped"))?;
                }
                Ok(())
            };

            let workers = (0..threads).map(|_| {
                let reference = Arc::clone(&reference);
                let config = config.clone();
                let bam_path = bam_path.clone();
                move |receiver: Receiver<(usize, JunctionGroup)>,
                      sender: Sender<Box<AssembledGroup>>|
                      -> Result<()> {
                    let mut bam = bam::IndexedReader::from_path(&bam_path)?;
                    let assembler = JunctionAssemblerBuilder::default()
                        .assembly_config(config)
                        .reference(reference)
                        .build()?;
                    for (index, group) in receiver {
                        let records = assemble_group(&assembler, &mut bam, &group)?;
                        sender
                            .send(Box::new(AssembledGroup { index, records }))
                            .map_err(|_| anyhow!("assembly output stopped"))?;
                    }
                    Ok(())
                }
            });

            let mut written = 0;
            let postprocessor = |group: Box<AssembledGroup>| -> Result<()> {
                for record in &group.records {
                    serde_json::to_writer(&mut writer, record)?;
                    writeln!(writer)?;
                    written += 1;
                }
                Ok(())
            };

            worker_pool(preprocessor, workers, postprocessor, threads * 2, threads * 2)?;
            writer.flush()?;
            info!("wrote {} assemblies", written);

            Ok(())
        }
    }
}

/// Junctions that are assembled together, in input order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JunctionGroup {
    name: Option<String>,
    junctions: Vec<Junction>,
}

struct AssembledGroup {
    index: usize,
    records: Vec<AssemblyRecord>,
}

impl Orderable for AssembledGroup {
    fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Deserialize)]
struct JunctionRecord {
    contig: String,
    position: i64,
    orientation: String,
    #[serde(default)]
    group: Option<String>,
}

/// Read junctions from a headerless TSV file. Lines starting with `#` are ignored.
/// Ungrouped junctions form a group of their own.
pub(crate) fn read_junctions<P: AsRef<Path>>(path: P) -> Result<Vec<JunctionGroup>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_path(path)?;

    let mut groups: Vec<JunctionGroup> = Vec::new();
    let mut group_index = HashMap::new();
    for (i, record) in reader.deserialize().enumerate() {
        let i = i + 1;
        let record: JunctionRecord =
            record.map_err(|e| invalid_junction_record(i, &e.to_string()))?;
        if record.position < 0 {
            return Err(invalid_junction_record(i, "position must not be negative").into());
        }
        let orientation: Orientation = record
            .orientation
            .parse()
            .map_err(|e: Error| invalid_junction_record(i, &e.to_string()))?;
        let junction = Junction::new(record.contig, record.position, orientation);

        match record.group {
            Some(name) => {
                let idx = *group_index.entry(name.clone()).or_insert_with(|| {
                    groups.push(JunctionGroup {
                        name: Some(name),
                        junctions: Vec::new(),
                    });
                    groups.len() - 1
                });
                groups[idx].junctions.push(junction);
            }
            None => groups.push(JunctionGroup {
                name: None,
                junctions: vec![junction],
            }),
        }
    }

    Ok(groups)
}

/// Assemble every junction of the group from a fresh read store. Groups with more than
/// one assembly are additionally joined into a gapped assembly. Groups with a junction on
/// a contig unknown to the BAM header are skipped.
fn assemble_group(
    assembler: &JunctionAssembler<Arc<reference::Buffer>>,
    bam: &mut bam::IndexedReader,
    group: &JunctionGroup,
) -> Result<Vec<AssemblyRecord>> {
    let config = assembler.config();
    let mut reads = ReadStore::new();
    let mut primaries = Vec::new();
    let mut candidates = Vec::new();

    for junction in &group.junctions {
        let fetched = match reads.fetch(
            bam,
            junction.contig(),
            junction.position() - config.window,
            junction.position() + config.window + 1,
            config.min_mapq,
        ) {
            Ok(fetched) => fetched,
            Err(e) => match e.downcast_ref::<Error>() {
                Some(Error::UnknownContig { .. }) => {
                    warn!("skipping junction group of {}: {}", junction, e);
                    return Ok(Vec::new());
                }
                _ => return Err(e),
            },
        };
        let fetched = assembler.rescue_reads(junction, &mut reads, &fetched)?;
        match assembler.assemble(junction, &reads, &fetched) {
            Some(assembly) => primaries.push(assembly),
            None => info!("no assembly for junction {}", junction),
        }
        candidates.extend(fetched);
    }

    let gapped = match group.name {
        Some(ref name) if primaries.len() > 1 => {
            assembler.link(name, &primaries, &reads, &candidates)
        }
        _ => None,
    };

    Ok(primaries
        .into_iter()
        .map(Assembly::Primary)
        .chain(gapped.map(Assembly::Gapped))
        .map(|assembly| AssemblyRecord::new(&assembly, &reads))
        .collect())
}
