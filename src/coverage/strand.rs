use crate::coverage::paths::{stranded_bam_path, Strand};
use crate::coverage::Stage;
use crate::error::{PipelineError, Result};
use log::info;
use rust_htslib::bam::{self, Header, Read, Reader, Record, Writer};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SplitCounts {
    pub plus: u64,
    pub minus: u64,
}

/// Splits `bam` into `<prefix>.PLUS.bam` (flag 0x10 unset) and
/// `<prefix>.MINUS.bam` (flag 0x10 set). The header is copied to both.
pub fn split_by_strand(bam: &Path, threads: usize) -> Result<(PathBuf, PathBuf, SplitCounts)> {
    let err = |path: &Path| {
        let path = path.to_path_buf();
        move |e| PipelineError::alignment(Stage::StrandSplit, &path, e)
    };

    let plus_path = stranded_bam_path(bam, Strand::Plus);
    let minus_path = stranded_bam_path(bam, Strand::Minus);

    let mut reader = Reader::from_path(bam).map_err(err(bam))?;
    if threads > 1 {
        reader.set_threads(threads).map_err(err(bam))?;
    }
    let header = Header::from_template(reader.header());

    let mut plus = Writer::from_path(&plus_path, &header, bam::Format::Bam)
        .map_err(err(&plus_path))?;
    let mut minus = Writer::from_path(&minus_path, &header, bam::Format::Bam)
        .map_err(err(&minus_path))?;
    if threads > 1 {
        plus.set_threads(threads).map_err(err(&plus_path))?;
        minus.set_threads(threads).map_err(err(&minus_path))?;
    }

    let mut counts = SplitCounts::default();
    let mut record = Record::new();
    while let Some(result) = reader.read(&mut record) {
        result.map_err(err(bam))?;
        if record.is_reverse() {
            minus.write(&record).map_err(err(&minus_path))?;
            counts.minus += 1;
        } else {
            plus.write(&record).map_err(err(&plus_path))?;
            counts.plus += 1;
        }
    }

    info!(
        "Split {}: {} forward, {} reverse reads",
        bam.display(),
        counts.plus,
        counts.minus
    );
    Ok((plus_path, minus_path, counts))
}
