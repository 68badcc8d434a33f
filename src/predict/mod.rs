//! Poly(A) site sequence classification.
//!
//! Rows are read from a TSV file, one-hot encoded, run through a
//! [`Predictor`] and written back with a trailing 0/1 label.

pub mod classifier;
pub mod encoder;
pub mod reader;
pub mod writer;

pub use classifier::{argmax, OnnxClassifier, Predictor};
pub use encoder::{encode, EncodedSequence};
pub use reader::{read_sequences, SequenceRecord};
pub use writer::{write_results, RESULT_FILE_NAME};

use crate::api::{ProgressCallback, ProgressEvent};
use crate::error::Result;
use log::{info, warn};
use std::path::{Path, PathBuf};

const TASK: &str = "predict";

/// Encoded input ready for a model of a known sequence length.
pub struct PreparedInput {
    pub records: Vec<SequenceRecord>,
    pub encoded: Vec<EncodedSequence>,
}

impl PreparedInput {
    /// Length shared by every sequence; the reader guarantees it is uniform
    /// and non-zero.
    pub fn sequence_length(&self) -> usize {
        self.encoded.first().map(EncodedSequence::len).unwrap_or(0)
    }
}

pub fn prepare_input(input: &Path) -> Result<PreparedInput> {
    let records = read_sequences(input)?;

    let unknown: usize = records
        .iter()
        .map(|r| encoder::count_unknown(r.sequence()))
        .sum();
    if unknown > 0 {
        warn!(
            "{} characters outside A/T/U/G/C/N in {}; encoded as N",
            unknown,
            input.display()
        );
    }

    let encoded = records.iter().map(|r| encode(r.sequence())).collect();
    info!("Encoded {} sequences from {}", records.len(), input.display());
    Ok(PreparedInput { records, encoded })
}

/// Labels every prepared sequence and writes the result file. Nothing is
/// written unless every batch succeeds.
pub fn classify_and_write<P: Predictor>(
    prepared: &PreparedInput,
    predictor: &P,
    model_path: &Path,
    output_dir: &Path,
    batch_size: usize,
    progress: Option<&ProgressCallback>,
) -> Result<PathBuf> {
    let total = prepared.encoded.len() as u64;
    let emit = |event: ProgressEvent| {
        if let Some(cb) = progress {
            cb(event);
        }
    };
    emit(ProgressEvent::Started {
        task: TASK.to_string(),
    });

    let mut labels = Vec::with_capacity(prepared.encoded.len());
    for chunk in prepared.encoded.chunks(batch_size.max(1)) {
        let probabilities = predictor.predict(chunk)?;
        labels.extend(classifier::labels_from_probabilities(
            model_path,
            &probabilities,
        )?);
        emit(ProgressEvent::Progress {
            task: TASK.to_string(),
            current: labels.len() as u64,
            total,
        });
    }

    if labels.len() != prepared.records.len() {
        return Err(crate::error::PipelineError::Inference(format!(
            "model returned {} predictions for {} sequences",
            labels.len(),
            prepared.records.len()
        )));
    }

    let positives = labels.iter().filter(|&&l| l == 1).count();
    info!(
        "Predicted {} of {} sequences as poly(A) site derived",
        positives,
        labels.len()
    );

    let output = write_results(output_dir, &prepared.records, &labels)?;
    emit(ProgressEvent::Completed {
        task: TASK.to_string(),
    });
    Ok(output)
}
