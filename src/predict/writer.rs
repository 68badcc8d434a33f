use crate::error::{PipelineError, Result};
use crate::predict::reader::SequenceRecord;
use csv::{QuoteStyle, WriterBuilder};
use std::fs;
use crate::utils::output_file::staging_file_in;
use std::path::{Path, PathBuf};

pub const RESULT_FILE_NAME: &str = "Predict_Result.txt";

/// Writes every input row followed by its label into
/// `<output_dir>/Predict_Result.txt`. The file only appears once it has been
/// written completely.
pub fn write_results(
    output_dir: &Path,
    records: &[SequenceRecord],
    labels: &[u8],
) -> Result<PathBuf> {
    if records.len() != labels.len() {
        return Err(PipelineError::Inference(format!(
            "{} labels for {} input rows",
            labels.len(),
            records.len()
        )));
    }

    fs::create_dir_all(output_dir).map_err(|e| PipelineError::fs(output_dir, e))?;
    let output_path = output_dir.join(RESULT_FILE_NAME);

    let tmp = staging_file_in(output_dir).map_err(|e| PipelineError::fs(output_dir, e))?;
    {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .from_writer(tmp.as_file());

        for (record, label) in records.iter().zip(labels) {
            let label = label.to_string();
            writer
                .write_record(
                    record
                        .columns()
                        .iter()
                        .map(String::as_str)
                        .chain(std::iter::once(label.as_str())),
                )
                .map_err(|e| csv_write_error(&output_path, e))?;
        }
        writer
            .flush()
            .map_err(|e| PipelineError::fs(&output_path, e))?;
    }

    tmp.persist(&output_path)
        .map_err(|e| PipelineError::fs(&output_path, e.error))?;
    Ok(output_path)
}

fn csv_write_error(path: &Path, err: csv::Error) -> PipelineError {
    match err.into_kind() {
        csv::ErrorKind::Io(source) => PipelineError::fs(path, source),
        other => PipelineError::Inference(format!("failed to write {}: {:?}", path.display(), other)),
    }
}
