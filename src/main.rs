use clap::Parser;
use deeppass_tools::cli::{self, Commands};
use deeppass_tools::commands::{self, bam_to_bw::BamToBwArgs};
use deeppass_tools::config::Config;
use indicatif::HumanDuration;
use log::info;
use std::time::Instant;

fn main() {
    let started = Instant::now();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::Args::parse();

    let config = match &args.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        },
        None => Config::load(),
    };

    let result = match args.command {
        Commands::Predict {
            model,
            predict,
            output_dir,
            batch_size,
        } => commands::predict::run(&model, &predict, &output_dir, batch_size, &config),
        Commands::BamToBw {
            bam_file,
            stranded,
            read_length,
            scale,
            keep_temp,
            timeout,
            threads,
        } => commands::bam_to_bw::run(
            BamToBwArgs {
                bam_file,
                stranded,
                read_length,
                scale,
                keep_temp,
                timeout,
                threads,
            },
            &config,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    info!("Total time: {}", HumanDuration(started.elapsed()));
}
