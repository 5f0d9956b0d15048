//! Scan summaries for the parameter tool
//!
//! A summary is a fixed set of raw values. It is shown on the console,
//! written as an INI section or exported for a whole folder as CSV.

use crate::error::Result;
use crate::twix::{RawValueStore, TwixReader};
use log::{info, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Raw values listed in every summary
pub const SUMMARY_ITEMS: [&str; 5] = [
    "PatientName",
    "PatientID",
    "TotalScanTimeSec",
    "mrprot.sKSpace.lBaseResolution",
    "mrprot.sKSpace.lRadialViews",
];

/// INI section of a written summary
pub const SUMMARY_SECTION: &str = "ScanInformation";

const FILENAME_KEY: &str = "Filename";

/// Summary values of one store, missing values empty
pub fn summary_items(raw: &RawValueStore) -> Vec<(&'static str, String)> {
    SUMMARY_ITEMS
        .iter()
        .map(|item| (*item, raw.value(item).to_string()))
        .collect()
}

/// Writes the `[ScanInformation]` section
pub fn write_summary_ini<W: Write>(
    out: &mut W,
    file_name: &str,
    raw: &RawValueStore,
) -> io::Result<()> {
    writeln!(out, "[{}]", SUMMARY_SECTION)?;
    writeln!(out, "{}={}", FILENAME_KEY, file_name)?;
    for (item, value) in summary_items(raw) {
        writeln!(out, "{}={}", item, value)?;
    }
    Ok(())
}

/// Writes the summary of `source` into the INI file `target`, replacing it
pub fn write_summary_file(source: &Path, target: &Path, raw: &RawValueStore) -> Result<()> {
    let file_name = file_name(source);
    let mut out = BufWriter::new(File::create(target)?);
    write_summary_ini(&mut out, &file_name, raw)?;
    out.flush()?;
    info!("Summary written to {}", target.display());
    Ok(())
}

/// One parsed file of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SummaryRow {
    pub file_name: String,
    /// Values in [`SUMMARY_ITEMS`] order
    pub values: Vec<String>,
}

/// Result of summarizing a folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct BatchSummary {
    pub rows: Vec<SummaryRow>,
    /// Files that could not be parsed, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    /// Exports the rows as CSV with a header line
    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer
            .write_record(std::iter::once(FILENAME_KEY).chain(SUMMARY_ITEMS))
            .map_err(io::Error::from)?;
        for row in &self.rows {
            let record = std::iter::once(&row.file_name).chain(row.values.iter());
            writer.write_record(record).map_err(io::Error::from)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Parses every `.dat` file in `dir`, skipping files that fail
///
/// Files are read one after another, each with a fresh reader.
pub fn summarize_directory(dir: &Path) -> Result<BatchSummary> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("dat"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();

    let mut summary = BatchSummary::default();
    for path in files {
        match TwixReader::new().read_file(&path) {
            Ok(raw) => summary.rows.push(SummaryRow {
                file_name: file_name(&path),
                values: summary_items(&raw).into_iter().map(|(_, v)| v).collect(),
            }),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                summary.failures.push((path, e.to_string()));
            }
        }
    }

    info!(
        "Summarized {} files, {} skipped",
        summary.rows.len(),
        summary.failures.len()
    );
    Ok(summary)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
