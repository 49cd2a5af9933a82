use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

/// Thresholds used while assembling a junction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Reads need an average base quality strictly above this value.
    pub min_average_quality: u8,
    /// Seed reads need an average quality past the junction strictly above this value.
    pub min_quality_past_junction: u8,
    /// Bases left and right of a junction to collect reads from.
    pub window: i64,
    pub min_mapq: u8,
    /// Minimum number of bases a read has to overlap an assembly with.
    pub min_overlap: usize,
    pub weak_max_mismatches: usize,
    pub strict_max_mismatches: usize,
    /// Under weak tolerance, mismatches at read bases below this quality are ignored.
    pub low_base_quality: u8,
    /// Assembly ends covered by fewer supporting reads are trimmed.
    pub min_support_depth: u32,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        AssemblyConfig {
            min_average_quality: 25,
            min_quality_past_junction: 25,
            window: 500,
            min_mapq: 1,
            min_overlap: 20,
            weak_max_mismatches: 4,
            strict_max_mismatches: 1,
            low_base_quality: 26,
            min_support_depth: 2,
        }
    }
}

impl AssemblyConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = File::open(path.as_ref())
            .with_context(|| format!("unable to open config file {:?}", path.as_ref()))?;
        let config = serde_yaml::from_reader(reader)
            .with_context(|| format!("invalid config file {:?}", path.as_ref()))?;
        Ok(config)
    }
}
