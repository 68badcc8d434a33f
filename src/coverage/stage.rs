use std::fmt;

/// Steps of the BAM -> bigWig conversion, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Index,
    ChromSizes,
    StrandSplit,
    Coverage,
    Round,
    Sort,
    Pack,
    Cleanup,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Index => "index",
            Stage::ChromSizes => "chrom-sizes",
            Stage::StrandSplit => "strand-split",
            Stage::Coverage => "coverage",
            Stage::Round => "round",
            Stage::Sort => "sort",
            Stage::Pack => "pack",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
