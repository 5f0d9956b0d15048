use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use rawtags_core::summary::{self, summary_items};
use rawtags_core::{RawValueStore, TwixReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;

/// CLI tool for showing and exporting sequence parameters of raw-data files
#[derive(Parser, Debug)]
#[command(name = "getseqparams")]
#[command(about = "Show or export acquisition parameters of raw-data files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shows the summary, a single parameter or `all` parameters
    Show {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "PARAMETER")]
        parameter: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Writes the parameter summary into an INI file
    Write {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "INI_FILE")]
        output: PathBuf,
    },
    /// Writes the summary of every .dat file in a directory as CSV
    Csv {
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,

        #[arg(value_name = "CSV_FILE")]
        output: PathBuf,
    },
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

/// Parameter selection of the show command
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    Summary,
    All,
    Single(String),
}

impl From<Option<String>> for Selection {
    fn from(parameter: Option<String>) -> Self {
        match parameter.as_deref() {
            None | Some("summary") => Selection::Summary,
            Some("all") => Selection::All,
            Some(name) => Selection::Single(name.to_string()),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let result = match cli.command {
        Command::Show {
            file,
            parameter,
            format,
        } => read_raw_file(&file).map(|raw| show(&raw, parameter.into(), format)),
        Command::Write { file, output } => {
            read_raw_file(&file).and_then(|raw| summary::write_summary_file(&file, &output, &raw))
        }
        Command::Csv { directory, output } => export_csv(&directory, &output),
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
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
            .filter_level(log::LevelFilter::Warn)
            .init();
    }
}

fn read_raw_file(path: &Path) -> rawtags_core::Result<RawValueStore> {
    if !path.is_file() {
        return Err(rawtags_core::RawTagsError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("raw-data file does not exist {}", path.display()),
        )));
    }
    TwixReader::new().read_file(path)
}

fn export_csv(directory: &Path, output: &Path) -> rawtags_core::Result<()> {
    let batch = summary::summarize_directory(directory)?;
    let file = BufWriter::new(File::create(output)?);
    batch.write_csv(file)?;
    info!("Wrote {} rows to {}", batch.rows.len(), output.display());
    Ok(())
}

fn show(raw: &RawValueStore, selection: Selection, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            // No trailing newline for single values so the output can be captured by scripts
            match &selection {
                Selection::Single(name) => print!("{}", raw.value(name)),
                _ => print!("{}", render_text(raw, &selection)),
            }
        }
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                match render_json(raw, &selection) {
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

fn render_text(raw: &RawValueStore, selection: &Selection) -> String {
    let lines: Vec<String> = match selection {
        Selection::Summary => summary_items(raw)
            .into_iter()
            .map(|(item, value)| format!("{}={}", item, value))
            .collect(),
        Selection::All => raw.iter().map(|(k, v)| format!("{}={}", k, v)).collect(),
        Selection::Single(name) => vec![raw.value(name).to_string()],
    };
    lines.iter().map(|line| format!("{}\n", line)).collect()
}

#[cfg(feature = "json")]
fn render_json(raw: &RawValueStore, selection: &Selection) -> Result<String, serde_json::Error> {
    use std::collections::BTreeMap;

    match selection {
        Selection::Summary => {
            let items: BTreeMap<&str, String> = summary_items(raw).into_iter().collect();
            serde_json::to_string_pretty(&items)
        }
        Selection::All => serde_json::to_string_pretty(raw),
        Selection::Single(name) => serde_json::to_string_pretty(&raw.get(name)),
    }
}
