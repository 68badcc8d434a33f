use crate::coverage::Stage;
use crate::error::{PipelineError, Result};
use log::{debug, info};
use rust_htslib::bam::{self, Read};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Name idxstats reports for reads without a reference.
pub const UNMAPPED_REFERENCE: &str = "*";

/// Sidecar index of `bam`, if one exists.
pub fn existing_index(bam: &Path) -> Option<PathBuf> {
    ["bai", "csi"].iter().find_map(|ext| {
        let mut name = bam.as_os_str().to_os_string();
        name.push(".");
        name.push(ext);
        let candidate = PathBuf::from(name);
        candidate.exists().then_some(candidate)
    })
}

/// Builds `<bam>.bai` unless a `.bai` or `.csi` index is already present.
/// Returns `true` when an index was created.
pub fn ensure_index(bam: &Path, threads: usize) -> Result<bool> {
    if let Some(index) = existing_index(bam) {
        debug!("Using existing index {}", index.display());
        return Ok(false);
    }

    info!("Indexing {}", bam.display());
    bam::index::build(bam, None, bam::index::Type::Bai, threads.max(1) as u32)
        .map_err(|e| PipelineError::alignment(Stage::Index, bam, e))?;
    Ok(true)
}

/// Reference sequence lengths in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromSizes {
    entries: Vec<(String, u64)>,
}

impl ChromSizes {
    /// Builds the table from `(tid, length, mapped, unmapped)` index
    /// statistics. Entries with a negative tid are the unmapped `*` bucket
    /// and are skipped.
    pub fn from_index_stats<F>(stats: &[(i64, u64, u64, u64)], name_of: F) -> Self
    where
        F: Fn(u32) -> String,
    {
        let entries = stats
            .iter()
            .filter(|(tid, ..)| *tid >= 0)
            .map(|&(tid, length, ..)| (name_of(tid as u32), length))
            .filter(|(name, _)| name != UNMAPPED_REFERENCE)
            .collect();
        Self { entries }
    }

    /// Reads the index statistics of an indexed BAM file.
    pub fn from_bam(bam: &Path) -> Result<Self> {
        let mut reader = bam::IndexedReader::from_path(bam)
            .map_err(|e| PipelineError::alignment(Stage::ChromSizes, bam, e))?;
        let stats = reader
            .index_stats()
            .map_err(|e| PipelineError::alignment(Stage::ChromSizes, bam, e))?;
        let header = reader.header().clone();

        Ok(Self::from_index_stats(&stats, |tid| {
            String::from_utf8_lossy(header.tid2name(tid)).into_owned()
        }))
    }

    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the two-column `name\tlength` table consumed by bedtools and
    /// bedGraphToBigWig.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| PipelineError::fs(path, e))?;
        let mut writer = BufWriter::new(file);
        for (name, length) in &self.entries {
            writeln!(writer, "{}\t{}", name, length).map_err(|e| PipelineError::fs(path, e))?;
        }
        writer.flush().map_err(|e| PipelineError::fs(path, e))?;
        Ok(())
    }
}
