use crate::api::{ProgressCallback, ProgressEvent};
use crate::config::Config;
use crate::predict::{self, OnnxClassifier};
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use std::sync::Arc;

pub fn run(
    model: &Path,
    input: &Path,
    output_dir: &Path,
    batch_size: Option<usize>,
    config: &Config,
) -> Result<()> {
    let prepared = predict::prepare_input(input)
        .with_context(|| format!("Failed to prepare sequences from {}", input.display()))?;

    let classifier = OnnxClassifier::load(model, prepared.sequence_length())
        .context("Failed to initialise the classifier")?;

    let total = prepared.encoded.len() as u64;
    let progress = ProgressBarBuilder::new("Predicting")
        .with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .with_progress_bar(total)
        .build()?;
    let bar = progress.clone();
    let callback: ProgressCallback = Arc::new(move |event: ProgressEvent| {
        if let ProgressEvent::Progress { current, .. } = event {
            bar.set_position(current);
        }
    });

    let output = predict::classify_and_write(
        &prepared,
        &classifier,
        model,
        output_dir,
        batch_size.unwrap_or(config.batch_size),
        Some(&callback),
    )
    .context("Prediction failed")?;

    progress.finish_with_message("done");
    info!("Results written to {}", output.display());
    Ok(())
}
