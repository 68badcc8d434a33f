use crate::error::{PipelineError, Result};
use crate::predict::encoder::{EncodedSequence, CHANNELS};
use log::{debug, info};
use std::path::{Path, PathBuf};
use tract_onnx::prelude::*;

/// Number of classes the DeepPASS head emits: not-PAS, PAS.
pub const NUM_CLASSES: usize = 2;

/// The sealed model boundary. Implementations return one probability vector
/// per input sequence, in input order.
pub trait Predictor {
    fn predict(&self, batch: &[EncodedSequence]) -> Result<Vec<Vec<f32>>>;
}

/// Index of the largest value. Ties go to the lowest index and NaN never
/// wins, so `[0.5, 0.5]` is class 0.
pub fn argmax(probabilities: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &p) in probabilities.iter().enumerate() {
        if p.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if p <= current => {}
            _ => best = Some((idx, p)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Converts per-row probabilities into 0/1 labels, insisting on exactly
/// [`NUM_CLASSES`] outputs per row.
pub fn labels_from_probabilities(model: &Path, rows: &[Vec<f32>]) -> Result<Vec<u8>> {
    rows.iter()
        .enumerate()
        .map(|(row, probs)| {
            if probs.len() != NUM_CLASSES {
                return Err(PipelineError::ModelLoad {
                    path: model.to_path_buf(),
                    reason: format!(
                        "expected {} class probabilities, model produced {}",
                        NUM_CLASSES,
                        probs.len()
                    ),
                });
            }
            argmax(probs).map(|idx| idx as u8).ok_or_else(|| {
                PipelineError::Inference(format!("row {} has no finite probability", row + 1))
            })
        })
        .collect()
}

type Plan = TypedRunnableModel<TypedModel>;

/// ONNX export of the DeepPASS network, executed on the CPU with tract.
///
/// Loading is the one-time runtime initialisation: the input is pinned to
/// `(1, sequence_length, 4)` and the graph optimised before the first
/// prediction. Keras `.h5` checkpoints must be converted first, e.g. with
/// `python -m tf2onnx.convert --keras model.h5 --output model.onnx`.
pub struct OnnxClassifier {
    path: PathBuf,
    sequence_length: usize,
    plan: Plan,
}

impl OnnxClassifier {
    pub fn load(path: &Path, sequence_length: usize) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::ModelLoad {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }
        if path.extension().is_some_and(|ext| ext == "h5") {
            return Err(PipelineError::ModelLoad {
                path: path.to_path_buf(),
                reason: "Keras HDF5 checkpoints are not supported; convert the model to ONNX with tf2onnx".to_string(),
            });
        }

        let model_err = |e: TractError| PipelineError::ModelLoad {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        };

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(0, f32::fact([1, sequence_length, CHANNELS]).into())
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(model_err)?;

        info!(
            "Loaded model {} for sequences of length {}",
            path.display(),
            sequence_length
        );
        Ok(Self {
            path: path.to_path_buf(),
            sequence_length,
            plan,
        })
    }

    fn predict_one(&self, sequence: &EncodedSequence) -> Result<Vec<f32>> {
        if sequence.len() != self.sequence_length {
            return Err(PipelineError::Inference(format!(
                "model {} expects sequences of length {}, got {}",
                self.path.display(),
                self.sequence_length,
                sequence.len()
            )));
        }

        let data: Vec<f32> = sequence.flat().collect();
        let input: Tensor =
            tract_ndarray::Array3::from_shape_vec((1, self.sequence_length, CHANNELS), data)
                .map_err(|e| PipelineError::Inference(e.to_string()))?
                .into();

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| PipelineError::Inference(format!("{:#}", e)))?;
        let output = outputs
            .first()
            .ok_or_else(|| PipelineError::Inference("model produced no output".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| PipelineError::Inference(format!("{:#}", e)))?;

        Ok(view.iter().copied().collect())
    }
}

impl Predictor for OnnxClassifier {
    fn predict(&self, batch: &[EncodedSequence]) -> Result<Vec<Vec<f32>>> {
        debug!("Running {} sequences through {}", batch.len(), self.path.display());
        batch.iter().map(|seq| self.predict_one(seq)).collect()
    }
}
