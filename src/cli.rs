use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file to use instead of the per-user config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Label sequences as derived from a poly(A) site (1) or not (0)
    Predict {
        /// DeepPASS model exported to ONNX
        #[arg(short = 'm', visible_short_alias = 'M', long = "model")]
        model: PathBuf,

        /// Tab-separated sequences, last column holds the sequence
        #[arg(short = 'p', visible_short_alias = 'P', long = "predict")]
        predict: PathBuf,

        /// Directory receiving Predict_Result.txt
        #[arg(short = 'o', visible_short_alias = 'O', long = "outputdir")]
        output_dir: PathBuf,

        /// Sequences per inference batch (default from config: 256)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Convert a BAM file into bigWig coverage track(s)
    BamToBw {
        /// Input BAM file
        #[arg(short = 'b')]
        bam_file: PathBuf,

        /// Write separate .PLUS and .MINUS tracks by read strand
        #[arg(short = 'd', default_value_t = false)]
        stranded: bool,

        /// Reserved: consider read lengths (currently no effect)
        #[arg(short = 'l', default_value_t = false)]
        read_length: bool,

        /// Coverage scaling ratio
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Keep chromosome sizes, split BAMs and bedGraph intermediates
        #[arg(long, default_value_t = false)]
        keep_temp: bool,

        /// Per-tool timeout in seconds (default from config: 21600)
        #[arg(long)]
        timeout: Option<u64>,

        /// htslib threads for BAM reading and writing (default from config: 4)
        #[arg(short = 't', long)]
        threads: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_accepts_short_flags() {
        let args = Args::parse_from(["deeppass-tools", "predict", "-m", "m.onnx", "-p", "in.tsv", "-o", "out"]);
        match args.command {
            Commands::Predict { model, predict, output_dir, batch_size } => {
                assert_eq!(model, PathBuf::from("m.onnx"));
                assert_eq!(predict, PathBuf::from("in.tsv"));
                assert_eq!(output_dir, PathBuf::from("out"));
                assert_eq!(batch_size, None);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn bam_to_bw_flags() {
        let args = Args::parse_from(["deeppass-tools", "bam-to-bw", "-b", "s.bam", "-d", "-l"]);
        match args.command {
            Commands::BamToBw { bam_file, stranded, read_length, scale, keep_temp, .. } => {
                assert_eq!(bam_file, PathBuf::from("s.bam"));
                assert!(stranded);
                assert!(read_length);
                assert_eq!(scale, 1.0);
                assert!(!keep_temp);
            }
            _ => panic!("expected bam-to-bw"),
        }
    }

    #[test]
    fn bam_is_required() {
        assert!(Args::try_parse_from(["deeppass-tools", "bam-to-bw", "-d"]).is_err());
    }
}
