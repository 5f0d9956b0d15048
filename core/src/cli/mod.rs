pub mod report;

use crate::processor::ProcessorSettings;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for setdcmtags
#[derive(Parser, Debug)]
#[command(name = "setdcmtags")]
#[command(about = "Transfer raw-data acquisition parameters into DICOM tags")]
#[command(version)]
pub struct Cli {
    /// Folder with the DICOM slices (`<series>_<slice>.dcm`)
    #[arg(value_name = "INPUT_DIR")]
    pub input: PathBuf,

    /// Folder receiving the modified slices
    #[arg(value_name = "OUTPUT_DIR")]
    pub output: PathBuf,

    /// Raw-data file of the acquisition
    #[arg(value_name = "RAW_FILE")]
    pub rawfile: PathBuf,

    /// Accession number written to all slices
    #[arg(short, long)]
    pub accession: Option<String>,

    /// Mode file with tag mapping overrides
    #[arg(short, long, value_name = "FILE")]
    pub mode: Option<PathBuf>,

    /// Dynamic settings file, applied after the mode file
    #[arg(short, long, value_name = "FILE")]
    pub dynamic: Option<PathBuf>,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            input_dir: self.input.clone(),
            output_dir: self.output.clone(),
            raw_file: self.rawfile.clone(),
            accession_number: self.accession.clone().filter(|a| !a.is_empty()),
            mode_file: self.mode.clone(),
            dynamic_file: self.dynamic.clone(),
        }
    }
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}
