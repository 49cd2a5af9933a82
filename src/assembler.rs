// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Assembly of the reads around a single junction, and linking of the resulting
//! assemblies into gapped assemblies.

use std::collections::HashSet;

use anyhow::Result;

use crate::assembly::{
    Assembly, ExtendedAssembly, GappedAssembly, MismatchSupportChecker, PrimaryAssembly,
    Tolerance,
};
use crate::config::AssemblyConfig;
use crate::filters::{
    is_record_average_quality_above, is_record_average_quality_past_junction_above,
    record_soft_clips_near_junction,
};
use crate::junction::{Junction, Orientation};
use crate::read::{Read, ReadId, ReadStore};
use crate::reference::ReferenceLookup;
use crate::rescue::ReadRescue;
use crate::sequence::Sequence;

#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct JunctionAssembler<R> {
    #[builder(private)]
    config: AssemblyConfig,
    #[builder(private)]
    checker: MismatchSupportChecker,
    #[builder(private)]
    rescue: ReadRescue<R>,
}

impl<R: ReferenceLookup> JunctionAssemblerBuilder<R> {
    /// Thresholds for read filtering, support checks and trimming.
    pub fn assembly_config(self, config: AssemblyConfig) -> Self {
        self.checker(MismatchSupportChecker::from_config(&config))
            .config(config)
    }

    /// Reference used to rescue soft clipped bases.
    pub fn reference(self, reference: R) -> Self {
        self.rescue(ReadRescue::new(reference))
    }
}

impl<R: ReferenceLookup> JunctionAssembler<R> {
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Rescue the soft clips of reads that are clipped away from the junction.
    ///
    /// Reads clipped at the junction are the evidence we are looking for and are left
    /// alone. Rescued reads are added to the store; the returned ids replace the given
    /// candidates, in the same order.
    pub fn rescue_reads(
        &self,
        junction: &Junction,
        reads: &mut ReadStore,
        candidates: &[ReadId],
    ) -> Result<Vec<ReadId>> {
        let mut ids = Vec::with_capacity(candidates.len());
        let mut rescued = 0;
        for &id in candidates {
            let rescued_read = {
                let read = reads.get(id);
                if !read.is_soft_clipped() || record_soft_clips_near_junction(read, junction) {
                    None
                } else {
                    Some(self.rescue.rescue_read(read)?).filter(|rescued| rescued != read)
                }
            };
            match rescued_read {
                Some(read) => {
                    ids.push(reads.push(read));
                    rescued += 1;
                }
                None => ids.push(id),
            }
        }
        debug!("rescued {} of {} reads at {}", rescued, candidates.len(), junction);

        Ok(ids)
    }

    /// Assemble the reads clipped at `junction`.
    ///
    /// The seed read reaching furthest past the junction provides the bases, anchored at
    /// the junction position. Every usable read is then offered as support, seeds with
    /// strict and all others with weak tolerance. Finally both ends are trimmed back to
    /// the first position covered by at least `min_support_depth` reads.
    ///
    /// Returns `None` if no read qualifies as seed or nothing is left after trimming.
    pub fn assemble(
        &self,
        junction: &Junction,
        reads: &ReadStore,
        candidates: &[ReadId],
    ) -> Option<PrimaryAssembly> {
        let usable: Vec<ReadId> = candidates
            .iter()
            .cloned()
            .filter(|id| {
                is_record_average_quality_above(&reads[*id], self.config.min_average_quality)
            })
            .collect();
        let seeds: HashSet<ReadId> = usable
            .iter()
            .cloned()
            .filter(|id| self.is_seed(&reads[*id], junction))
            .collect();

        let seed = match usable
            .iter()
            .cloned()
            .filter(|id| seeds.contains(id))
            .max_by_key(|id| extent_past_junction(&reads[*id], junction))
        {
            Some(seed) => seed,
            None => {
                debug!("no seed read for junction {}", junction);
                return None;
            }
        };

        let mut assembly = seed_assembly(junction, &reads[seed]);
        assembly.add_evidence_at(seed, 0);

        let mut supporting = 1;
        for id in usable.into_iter().filter(|id| *id != seed) {
            let tolerance = if seeds.contains(&id) {
                Tolerance::Strict
            } else {
                Tolerance::Weak
            };
            if assembly.try_add_support(&self.checker, reads, id, tolerance) {
                supporting += 1;
            }
        }
        assembly.recalculate_base_quality(reads);

        let depth = assembly.supported().support_depth(reads);
        let min_depth = self.config.min_support_depth;
        let remove_left = depth.iter().take_while(|d| **d < min_depth).count();
        let remove_right = depth.iter().rev().take_while(|d| **d < min_depth).count();

        let trimmed = assembly.trim(remove_left, remove_right);
        match trimmed {
            Some(ref trimmed) => debug!(
                "assembled {} bases at {} from {} supporting reads",
                trimmed.len(),
                junction,
                supporting
            ),
            None => debug!(
                "discarding assembly at {}: no position covered by {} reads",
                junction, min_depth
            ),
        }
        trimmed
    }

    /// Join the assemblies of linked junctions, in the given order, and offer every
    /// candidate not yet supporting one of them to the joined assembly.
    ///
    /// Returns `None` if there is nothing to join.
    pub fn link(
        &self,
        name: &str,
        assemblies: &[PrimaryAssembly],
        reads: &ReadStore,
        candidates: &[ReadId],
    ) -> Option<GappedAssembly> {
        if assemblies.is_empty() {
            return None;
        }
        let sources = assemblies
            .iter()
            .map(|assembly| ExtendedAssembly::new(assembly.name(), assembly))
            .collect();
        let mut gapped = GappedAssembly::new(name, sources);

        // the same read may have been fetched once per junction
        let mut seen: HashSet<(&str, i64)> = gapped
            .supported()
            .supporting_reads()
            .map(|id| read_key(&reads[id]))
            .collect();
        for &id in candidates {
            let read = &reads[id];
            if !seen.insert(read_key(read))
                || !is_record_average_quality_above(read, self.config.min_average_quality)
            {
                continue;
            }
            gapped.try_add_support(&self.checker, reads, id, Tolerance::Weak);
        }
        gapped.recalculate_base_quality(reads);

        Some(gapped)
    }

    fn is_seed(&self, read: &Read, junction: &Junction) -> bool {
        record_soft_clips_near_junction(read, junction)
            && is_record_average_quality_past_junction_above(
                read,
                junction,
                self.config.min_quality_past_junction,
            )
    }
}

fn read_key(read: &Read) -> (&str, i64) {
    (read.name(), read.alignment_start())
}

/// Number of read bases at or past the junction position.
fn extent_past_junction(read: &Read, junction: &Junction) -> i64 {
    let index = read.read_index_at(junction.position());
    match junction.orientation() {
        Orientation::Forward => read.len() as i64 - index,
        Orientation::Reverse => index + 1,
    }
}

/// Assembly made of the seed read, anchored at the read base aligned to the junction.
fn seed_assembly(junction: &Junction, seed: &Read) -> PrimaryAssembly {
    let index = seed.read_index_at(junction.position());
    let anchor_index = index.max(0).min(seed.len() as i64 - 1);

    PrimaryAssembly::new(
        &junction.to_string(),
        seed.bases().to_vec(),
        junction.contig(),
        junction.position() + (anchor_index - index),
        anchor_index as usize,
    )
}

/// Output representation of an assembly, with read handles resolved to names.
#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
#[getset(get = "pub")]
pub struct AssemblyRecord {
    name: String,
    kind: AssemblyKind,
    bases: String,
    base_quality: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    anchor: Option<AnchorRecord>,
    sources: Vec<String>,
    support: Vec<SupportRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyKind {
    Primary,
    Gapped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnchorRecord {
    pub contig: String,
    pub position: i64,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportRecord {
    pub read: String,
    pub alignment_start: i64,
    pub offset: i32,
    pub reverse_complemented: bool,
}

impl AssemblyRecord {
    pub fn new(assembly: &Assembly, reads: &ReadStore) -> Self {
        let (kind, anchor, sources) = match assembly {
            Assembly::Primary(primary) => (
                AssemblyKind::Primary,
                Some(AnchorRecord {
                    contig: primary.anchor_contig().to_owned(),
                    position: primary.anchor_position(),
                    index: primary.anchor_position_in_assembly(),
                }),
                Vec::new(),
            ),
            Assembly::Gapped(gapped) => (
                AssemblyKind::Gapped,
                None,
                gapped
                    .sources()
                    .iter()
                    .map(|source| source.name().to_owned())
                    .collect(),
            ),
        };
        let support = assembly
            .supported()
            .support()
            .iter()
            .map(|support| {
                let read = &reads[support.read()];
                SupportRecord {
                    read: read.name().to_owned(),
                    alignment_start: read.alignment_start(),
                    offset: support.offset(),
                    reverse_complemented: support.reverse_complemented(),
                }
            })
            .collect();

        AssemblyRecord {
            name: assembly.name().to_owned(),
            kind,
            bases: String::from_utf8_lossy(assembly.bases()).into_owned(),
            base_quality: assembly.base_quality().to_vec(),
            anchor,
            sources,
            support,
        }
    }
}
