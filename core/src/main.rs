use clap::Parser;
use log::{error, info};
use rawtags_core::cli::{Cli, OutputFormat};
use rawtags_core::{ProcessingReport, TagProcessor, TextReport};
use std::process;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if !cli.input.is_dir() {
        eprintln!("Error: {} is not a directory", cli.input.display());
        process::exit(1);
    }

    info!("Processing raw-data file: {}", cli.rawfile.display());

    let processor = TagProcessor::new(cli.settings());
    let report = match processor.run() {
        Ok(report) => report,
        Err(e) => {
            error!("Processing failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    output_report(&report, cli.format);

    if !report.is_success() {
        process::exit(1);
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

fn output_report(report: &ProcessingReport, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("{}", TextReport::new(report));
        }
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                match serde_json::to_string_pretty(report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialize to JSON: {}", e);
                        eprintln!("Error: Failed to serialize to JSON: {}", e);
                        process::exit(1);
                    }
                }
            }
            #[cfg(not(feature = "json"))]
            {
                eprintln!("Error: JSON output requires the 'json' feature");
                eprintln!("Rebuild with: cargo build --features json");
                process::exit(1);
            }
        }
    }
}
