use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::{Mutex, RwLock};

use anyhow::Result;
use bio::io::fasta;
use lru_time_cache::LruCache;

/// Random access to single reference bases.
///
/// Implementations are shared between threads assembling different junctions.
pub trait ReferenceLookup: Send + Sync {
    /// Base at the 0-based position on `contig`, or `None` if the position lies outside
    /// the contig.
    fn base(&self, contig: &str, pos: i64) -> Result<Option<u8>>;
}

/// A lazy buffer for reference sequences.
pub struct Buffer {
    reader: RwLock<fasta::IndexedReader<fs::File>>,
    sequences: Mutex<LruCache<String, Arc<Vec<u8>>>>,
    reference_path: PathBuf,
}

impl Buffer {
    /// Open an indexed FASTA file, keeping at most `capacity` contigs in memory.
    pub fn from_path<P: AsRef<Path> + std::fmt::Debug>(path: P, capacity: usize) -> Result<Self> {
        let fasta: fasta::IndexedReader<fs::File> = fasta::IndexedReader::from_file(&path)?;
        Ok(Buffer {
            reader: RwLock::new(fasta),
            sequences: Mutex::new(LruCache::with_capacity(capacity)),
            reference_path: path.as_ref().to_path_buf(),
        })
    }

    pub fn reference_path(&self) -> &PathBuf {
        &self.reference_path
    }

    /// Load given contig and return it. This is O(1) if the contig was loaded before.
    pub fn seq(&self, contig: &str) -> Result<Arc<Vec<u8>>> {
        let mut sequences = self.sequences.lock().unwrap();

        if let Some(sequence) = sequences.get(contig) {
            return Ok(Arc::clone(sequence));
        }

        let mut sequence = Vec::new();
        {
            let mut reader = self.reader.write().unwrap();
            reader.fetch_all(contig)?;
            reader.read(&mut sequence)?;
        }
        debug!(
            "loaded contig {} ({} bases) from {:?}",
            contig,
            sequence.len(),
            self.reference_path
        );

        let sequence = Arc::new(sequence);
        sequences.insert(contig.to_owned(), Arc::clone(&sequence));
        Ok(sequence)
    }
}

impl ReferenceLookup for Buffer {
    fn base(&self, contig: &str, pos: i64) -> Result<Option<u8>> {
        if pos < 0 {
            return Ok(None);
        }
        Ok(self.seq(contig)?.get(pos as usize).cloned())
    }
}

impl<T: ReferenceLookup + ?Sized> ReferenceLookup for Arc<T> {
    fn base(&self, contig: &str, pos: i64) -> Result<Option<u8>> {
        (**self).base(contig, pos)
    }
}

/// Reference sequences held in memory, keyed by contig name.
impl ReferenceLookup for HashMap<String, Vec<u8>> {
    fn base(&self, contig: &str, pos: i64) -> Result<Option<u8>> {
        if pos < 0 {
            return Ok(None);
        }
        Ok(self
            .get(contig)
            .and_then(|seq| seq.get(pos as usize))
            .cloned())
    }
}
