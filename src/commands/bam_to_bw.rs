use crate::api::{ProgressCallback, ProgressEvent};
use crate::config::Config;
use crate::coverage::{CoverageOptions, CoveragePipeline};
use crate::utils::external_tools::check_tool;
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct BamToBwArgs {
    pub bam_file: PathBuf,
    pub stranded: bool,
    pub read_length: bool,
    pub scale: f64,
    pub keep_temp: bool,
    pub timeout: Option<u64>,
    pub threads: Option<usize>,
}

pub fn run(args: BamToBwArgs, config: &Config) -> Result<()> {
    let mut options = CoverageOptions::from_config(config);
    options.stranded = args.stranded;
    options.read_length = args.read_length;
    options.scale = args.scale;
    options.keep_temp = args.keep_temp;
    if let Some(secs) = args.timeout {
        options.timeout = Duration::from_secs(secs);
    }
    if let Some(threads) = args.threads {
        options.threads = threads;
    }

    let spinner = ProgressBarBuilder::new("Converting BAM to bigWig...")
        .with_template("{spinner:.green} [{elapsed_precise}] {msg}")
        .with_tick()
        .build()?;
    let status = spinner.clone();
    let callback: ProgressCallback = Arc::new(move |event: ProgressEvent| match event {
        ProgressEvent::Message { message, .. } => status.set_message(message),
        ProgressEvent::Error { error, .. } => status.abandon_with_message(error),
        _ => {}
    });

    let pipeline = CoveragePipeline::new(&args.bam_file, options).with_progress(callback);
    let [coverage, sort, pack] = pipeline.required_tools();
    check_tool(coverage, "bedtools, https://bedtools.readthedocs.io")?;
    check_tool(sort, "GNU coreutils")?;
    check_tool(pack, "UCSC kent utilities, http://hgdownload.soe.ucsc.edu/admin/exe/")?;

    let tracks = pipeline
        .run()
        .with_context(|| format!("Failed to convert {}", args.bam_file.display()))?;

    spinner.finish_with_message(format!("Wrote {} track(s)", tracks.len()));
    for track in &tracks {
        info!("Track: {}", track.display());
    }
    Ok(())
}
