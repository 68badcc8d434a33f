use crate::coverage::Stage;
use crate::error::{PipelineError, Result};
use crate::utils::external_tools::ToolInvocation;
use crate::utils::output_file::staging_file_in;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Rounds a coverage value as printed by the coverage tool.
pub fn round_coverage(raw: &str) -> std::result::Result<u64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("invalid coverage value '{}'", raw))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("coverage value '{}' is not a non-negative number", raw));
    }
    Ok(value.round_ties_even() as u64)
}

/// Rewrites `path` with every coverage value rounded. Output goes to a
/// temporary file next to `path` which then replaces it, so the original is
/// never left half written.
pub fn round_in_place(path: &Path) -> Result<u64> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let input = File::open(path).map_err(|e| PipelineError::fs(path, e))?;
    let tmp = staging_file_in(dir).map_err(|e| PipelineError::fs(dir, e))?;

    let mut rows = 0u64;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        for (idx, line) in BufReader::new(input).lines().enumerate() {
            let line = line.map_err(|e| PipelineError::fs(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(PipelineError::input(
                    path,
                    idx + 1,
                    format!("expected 4 fields, found {}", fields.len()),
                ));
            }
            let rounded = round_coverage(fields[3])
                .map_err(|reason| PipelineError::input(path, idx + 1, reason))?
                .to_string();
            fields[3] = &rounded;
            writeln!(writer, "{}", fields.join("\t")).map_err(|e| PipelineError::fs(path, e))?;
            rows += 1;
        }
        writer.flush().map_err(|e| PipelineError::fs(path, e))?;
    }

    tmp.persist(path)
        .map_err(|e| PipelineError::fs(path, e.error))?;
    Ok(rows)
}

/// Builds the `sort` call ordering `input` by chromosome name (byte order)
/// then numeric start into `output`. `-s` keeps records with equal keys in
/// their original order and `LC_ALL=C` pins byte-wise comparison. Large
/// files spill to disk instead of being held in memory.
pub fn sort_invocation(program: &str, input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new(program, Stage::Sort, input)
        .env("LC_ALL", "C")
        .arg("-s")
        .arg("-k1,1")
        .arg("-k2,2n")
        .arg(input)
        .stdout_to(output)
}
