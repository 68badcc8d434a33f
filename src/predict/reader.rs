use crate::error::{PipelineError, Result};
use csv::{ErrorKind, Position, ReaderBuilder, StringRecord};
use log::debug;
use std::io::Read;
use std::path::Path;

/// One input row, kept verbatim so it can be echoed into the result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    columns: Vec<String>,
}

impl SequenceRecord {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn id(&self) -> &str {
        self.columns.first().map(String::as_str).unwrap_or_default()
    }

    /// The nucleotide sequence, always the last column.
    pub fn sequence(&self) -> &str {
        self.columns.last().map(String::as_str).unwrap_or_default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Reads a headerless tab-separated file whose last column is a sequence.
/// Gzip, bzip2 and xz inputs are decompressed transparently.
pub fn read_sequences(path: &Path) -> Result<Vec<SequenceRecord>> {
    let (reader, format) = niffler::from_path(path).map_err(|e| match e {
        niffler::Error::IOError(source) => PipelineError::fs(path, source),
        other => PipelineError::input(path, 0, other.to_string()),
    })?;
    debug!("Reading {} (compression: {:?})", path.display(), format);
    parse_sequences(reader, path)
}

pub(crate) fn parse_sequences<R: Read>(mut reader: R, path: &Path) -> Result<Vec<SequenceRecord>> {
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|e| PipelineError::fs(path, e))?;

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .from_reader(data.as_slice());

    let mut records = Vec::new();
    let mut expected_len: Option<usize> = None;
    let mut row = StringRecord::new();

    loop {
        let fallback = records.len() + 1;
        match csv_reader.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                let line = e.position().map_or(fallback, |pos| record_line(&data, pos));
                return Err(csv_error(path, line, e));
            }
        }
        let line = row.position().map_or(fallback, |pos| record_line(&data, pos));

        let record = SequenceRecord::new(row.iter().map(str::to_string).collect());
        let seq_len = record.sequence().len();
        if seq_len == 0 {
            return Err(PipelineError::input(path, line, "empty sequence column"));
        }
        match expected_len {
            None => expected_len = Some(seq_len),
            Some(expected) if expected != seq_len => {
                return Err(PipelineError::input(
                    path,
                    line,
                    format!(
                        "sequence '{}' has length {}, expected {} like the first row",
                        record.id(),
                        seq_len,
                        expected
                    ),
                ));
            }
            Some(_) => {}
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(PipelineError::input(path, 0, "no sequences found"));
    }
    Ok(records)
}

/// Line on which the record at `pos` starts. The reader stamps a record
/// with its position before skipping blank lines, so those are added here.
fn record_line(data: &[u8], pos: &Position) -> usize {
    let skipped = data
        .get(pos.byte() as usize..)
        .unwrap_or_default()
        .iter()
        .take_while(|&&b| b == b'\n' || b == b'\r')
        .filter(|&&b| b == b'\n')
        .count();
    pos.line() as usize + skipped
}

fn csv_error(path: &Path, line: usize, err: csv::Error) -> PipelineError {
    match err.into_kind() {
        ErrorKind::Io(source) => PipelineError::fs(path, source),
        ErrorKind::UnequalLengths { expected_len, len, .. } => PipelineError::input(
            path,
            line,
            format!("found {} columns, expected {}", len, expected_len),
        ),
        ErrorKind::Utf8 { err, .. } => PipelineError::input(path, line, err.to_string()),
        other => PipelineError::input(path, line, format!("{:?}", other)),
    }
}
