//! BAM to bigWig conversion.
//!
//! The pipeline is strictly sequential over one alignment file:
//! index -> chromosome sizes -> optional strand split -> per branch
//! (coverage -> round -> sort -> pack -> cleanup) -> final cleanup.
//! Coverage, sorting and packing are delegated to bedtools, `sort` and the
//! UCSC `bedGraphToBigWig` binary; everything touching the BAM goes through
//! htslib.

pub mod bedgraph;
pub mod index;
pub mod paths;
pub mod stage;
pub mod strand;

pub use index::ChromSizes;
pub use paths::{BranchPaths, Strand};
pub use stage::Stage;

use crate::api::{ProgressCallback, ProgressEvent};
use crate::config::{Config, ToolPaths};
use crate::error::{PipelineError, Result};
use crate::utils::external_tools::ToolInvocation;
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

const TASK: &str = "bam-to-bw";

#[derive(Debug, Clone)]
pub struct CoverageOptions {
    /// Produce separate `.PLUS`/`.MINUS` tracks.
    pub stranded: bool,
    /// Reserved: read-length aware coverage. Accepted and ignored.
    pub read_length: bool,
    /// Coverage scaling ratio passed to the coverage tool.
    pub scale: f64,
    pub keep_temp: bool,
    pub threads: usize,
    pub timeout: Duration,
    pub tools: ToolPaths,
}

impl CoverageOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stranded: false,
            read_length: false,
            scale: 1.0,
            keep_temp: false,
            threads: config.htslib_threads,
            timeout: config.tool_timeout(),
            tools: config.tools.clone(),
        }
    }
}

pub struct CoveragePipeline {
    bam: PathBuf,
    options: CoverageOptions,
    progress_callback: Option<ProgressCallback>,
}

impl CoveragePipeline {
    pub fn new(bam: impl Into<PathBuf>, options: CoverageOptions) -> Self {
        Self {
            bam: bam.into(),
            options,
            progress_callback: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// External programs the pipeline will invoke.
    pub fn required_tools(&self) -> [&str; 3] {
        [
            self.options.tools.genome_coverage_bed.as_str(),
            self.options.tools.sort.as_str(),
            self.options.tools.bed_graph_to_big_wig.as_str(),
        ]
    }

    /// Runs every stage and returns the bigWig files produced, one per
    /// branch. On failure intermediates are left on disk.
    pub fn run(&self) -> Result<Vec<PathBuf>> {
        self.emit_progress(ProgressEvent::Started {
            task: TASK.to_string(),
        });

        match self.run_stages() {
            Ok(tracks) => {
                self.emit_progress(ProgressEvent::Completed {
                    task: TASK.to_string(),
                });
                Ok(tracks)
            }
            Err(e) => {
                self.emit_progress(ProgressEvent::Error {
                    task: TASK.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn run_stages(&self) -> Result<Vec<PathBuf>> {
        let bam = self.bam.as_path();
        if !bam.is_file() {
            return Err(PipelineError::fs(
                bam,
                io::Error::new(io::ErrorKind::NotFound, "alignment file not found"),
            ));
        }
        if self.options.read_length {
            warn!("-l (read-length aware coverage) is reserved and currently has no effect");
        }

        self.enter(Stage::Index, bam);
        index::ensure_index(bam, self.options.threads)?;

        self.enter(Stage::ChromSizes, bam);
        let chrom_sizes = ChromSizes::from_bam(bam)?;
        if chrom_sizes.is_empty() {
            return Err(PipelineError::input(
                bam,
                0,
                "index lists no reference sequences",
            ));
        }
        let chrom_sizes_path = paths::chrom_sizes_path(bam);
        chrom_sizes.write(&chrom_sizes_path)?;
        info!(
            "Wrote {} reference lengths to {}",
            chrom_sizes.len(),
            chrom_sizes_path.display()
        );

        let branch_bams = if self.options.stranded {
            self.enter(Stage::StrandSplit, bam);
            let (plus, minus, counts) = strand::split_by_strand(bam, self.options.threads)?;
            if counts.plus == 0 || counts.minus == 0 {
                warn!(
                    "{} has {} forward and {} reverse reads; one track will be empty",
                    bam.display(),
                    counts.plus,
                    counts.minus
                );
            }
            vec![plus, minus]
        } else {
            vec![bam.to_path_buf()]
        };

        let mut tracks = Vec::with_capacity(branch_bams.len());
        for branch_bam in &branch_bams {
            let branch = BranchPaths::for_bam(branch_bam);
            tracks.push(self.process_branch(&branch, &chrom_sizes_path)?);
        }

        if !self.options.keep_temp {
            self.enter(Stage::Cleanup, bam);
            remove_intermediate(&chrom_sizes_path)?;
            if self.options.stranded {
                for branch_bam in &branch_bams {
                    remove_intermediate(branch_bam)?;
                }
            }
        }

        Ok(tracks)
    }

    fn process_branch(&self, branch: &BranchPaths, chrom_sizes: &Path) -> Result<PathBuf> {
        let tools = &self.options.tools;

        self.enter(Stage::Coverage, &branch.bam);
        ToolInvocation::new(&tools.genome_coverage_bed, Stage::Coverage, &branch.bam)
            .arg("-bg")
            .arg("-split")
            .arg("-ibam")
            .arg(&branch.bam)
            .arg("-g")
            .arg(chrom_sizes)
            .arg("-scale")
            .arg(self.options.scale.to_string())
            .stdout_to(&branch.bedgraph)
            .timeout(self.options.timeout)
            .run()?;

        self.enter(Stage::Round, &branch.bedgraph);
        let rows = bedgraph::round_in_place(&branch.bedgraph)?;
        if rows == 0 {
            warn!("{} has no coverage records", branch.bedgraph.display());
        }

        self.enter(Stage::Sort, &branch.bedgraph);
        bedgraph::sort_invocation(&tools.sort, &branch.bedgraph, &branch.sorted_bedgraph)
            .timeout(self.options.timeout)
            .run()?;

        self.enter(Stage::Pack, &branch.sorted_bedgraph);
        ToolInvocation::new(&tools.bed_graph_to_big_wig, Stage::Pack, &branch.sorted_bedgraph)
            .arg(&branch.sorted_bedgraph)
            .arg(chrom_sizes)
            .arg(&branch.bigwig)
            .timeout(self.options.timeout)
            .run()?;

        if !self.options.keep_temp {
            self.enter(Stage::Cleanup, &branch.bam);
            for intermediate in branch.intermediates() {
                remove_intermediate(intermediate)?;
            }
        }

        info!("Wrote {}", branch.bigwig.display());
        Ok(branch.bigwig.clone())
    }

    fn enter(&self, stage: Stage, subject: &Path) {
        info!("[{}] {}", stage, subject.display());
        self.emit_progress(ProgressEvent::Message {
            task: TASK.to_string(),
            message: format!("{}: {}", stage, subject.display()),
        });
    }

    fn emit_progress(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress_callback {
            callback(event);
        }
    }
}

fn remove_intermediate(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::fs(path, e)),
    }
}
