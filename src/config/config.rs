use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upper bound for any single external tool invocation.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    /// BGZF worker threads used when reading and writing BAM files.
    #[serde(default = "default_htslib_threads")]
    pub htslib_threads: usize,
    /// Number of sequences handed to the classifier per progress step.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub tools: ToolPaths,
}

/// Program names (or absolute paths) of the external binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_genome_coverage_bed")]
    pub genome_coverage_bed: String,
    #[serde(default = "default_bed_graph_to_big_wig")]
    pub bed_graph_to_big_wig: String,
    /// Line sort utility; must understand `-s` and `-k`.
    #[serde(default = "default_sort")]
    pub sort: String,
}

fn default_tool_timeout() -> u64 {
    6 * 60 * 60
}

fn default_htslib_threads() -> usize {
    4
}

fn default_batch_size() -> usize {
    256
}

fn default_genome_coverage_bed() -> String {
    "genomeCoverageBed".to_string()
}

fn default_bed_graph_to_big_wig() -> String {
    "bedGraphToBigWig".to_string()
}

fn default_sort() -> String {
    "sort".to_string()
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            genome_coverage_bed: default_genome_coverage_bed(),
            bed_graph_to_big_wig: default_bed_graph_to_big_wig(),
            sort: default_sort(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout(),
            htslib_threads: default_htslib_threads(),
            batch_size: default_batch_size(),
            tools: ToolPaths::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "deeppass", "deeppass-tools")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads the per-user config file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                match Self::load_from(&config_path) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring config {}: {:#}", config_path.display(), e),
                }
            }
        }
        Config::default()
    }

    /// Loads an explicitly requested config file. Unlike [`Config::load`]
    /// a broken file is an error here.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}
