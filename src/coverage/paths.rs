use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Strand marker inserted before the extension of split BAM files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    pub fn marker(&self) -> &'static str {
        match self {
            Strand::Plus => "PLUS",
            Strand::Minus => "MINUS",
        }
    }
}

/// `path` with its extension removed and `suffix` appended verbatim:
/// `dir/sample.bam` + `_sorted.bg` -> `dir/sample_sorted.bg`.
pub fn replace_extension(path: &Path, suffix: &str) -> PathBuf {
    let mut stem: OsString = path.with_extension("").into_os_string();
    stem.push(suffix);
    PathBuf::from(stem)
}

pub fn chrom_sizes_path(bam: &Path) -> PathBuf {
    replace_extension(bam, ".chromesize")
}

/// `sample.bam` -> `sample.PLUS.bam`
pub fn stranded_bam_path(bam: &Path, strand: Strand) -> PathBuf {
    let ext = bam
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bam".to_string());
    replace_extension(bam, &format!(".{}.{}", strand.marker(), ext))
}

/// Files produced while turning one alignment file into one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPaths {
    pub bam: PathBuf,
    pub bedgraph: PathBuf,
    pub sorted_bedgraph: PathBuf,
    pub bigwig: PathBuf,
}

impl BranchPaths {
    pub fn for_bam(bam: &Path) -> Self {
        Self {
            bam: bam.to_path_buf(),
            bedgraph: replace_extension(bam, ".bg"),
            sorted_bedgraph: replace_extension(bam, "_sorted.bg"),
            bigwig: replace_extension(bam, ".bw"),
        }
    }

    pub fn intermediates(&self) -> [&Path; 2] {
        [&self.bedgraph, &self.sorted_bedgraph]
    }
}
