//! Series and slice orchestration
//!
//! Reads the raw-data file once, then resolves and writes one tag set per
//! DICOM slice found in the input folder.

use crate::error::Result;
use crate::evaluation::{ExpressionEvaluator, SliceContext, SliceGeometryCalculator};
use crate::mapping::TagMapping;
use crate::twix::{RawValueStore, TwixReader};
use crate::writer::{DicomTagWriter, TagWriter};
use chrono::{Local, NaiveDateTime};
use log::{debug, error, info, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

/// Timestamp layout of the derived frame-of-reference values
const FRAME_OF_REFERENCE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Inputs of one processing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub raw_file: PathBuf,
    pub accession_number: Option<String>,
    pub mode_file: Option<PathBuf>,
    pub dynamic_file: Option<PathBuf>,
}

/// Slices of one series, in slice order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFiles {
    /// Series number from the file names
    pub number: u32,
    pub slices: Vec<PathBuf>,
}

/// Outcome of one series
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SeriesReport {
    /// 1-based position of the series
    pub series: usize,
    pub slice_count: usize,
    pub slices_written: usize,
    pub series_uid: String,
    pub error: Option<String>,
}

impl SeriesReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a processing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ProcessingReport {
    pub raw_file: PathBuf,
    pub output_dir: PathBuf,
    pub study_uid: String,
    pub series: Vec<SeriesReport>,
}

impl ProcessingReport {
    pub fn files_written(&self) -> usize {
        self.series.iter().map(|s| s.slices_written).sum()
    }

    pub fn failed_series(&self) -> impl Iterator<Item = &SeriesReport> {
        self.series.iter().filter(|s| !s.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.failed_series().next().is_none()
    }
}

/// Drives parsing, mapping, evaluation and writing for one raw-data file
#[derive(Debug)]
pub struct TagProcessor<W: TagWriter = DicomTagWriter> {
    settings: ProcessorSettings,
    reader: TwixReader,
    writer: W,
}

impl TagProcessor<DicomTagWriter> {
    pub fn new(settings: ProcessorSettings) -> Self {
        Self::with_writer(settings, DicomTagWriter::new())
    }
}

impl<W: TagWriter> TagProcessor<W> {
    pub fn with_writer(settings: ProcessorSettings, writer: W) -> Self {
        Self {
            settings,
            reader: TwixReader::new(),
            writer,
        }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    /// Runs the whole transfer
    ///
    /// # Errors
    ///
    /// Fails if the raw-data file cannot be parsed or the folders cannot be
    /// accessed. Write failures are recorded per series in the report.
    pub fn run(&self) -> Result<ProcessingReport> {
        let settings = &self.settings;
        let processing_time = Local::now().naive_local();

        debug!("Input folder     = {}", settings.input_dir.display());
        debug!("Output folder    = {}", settings.output_dir.display());
        debug!("Raw-data file    = {}", settings.raw_file.display());
        debug!(
            "Accession number = {}",
            settings.accession_number.as_deref().unwrap_or("")
        );

        let raw = self.reader.read_file(&settings.raw_file)?;

        let mut mapping = TagMapping::new();
        mapping.read_configuration(
            settings.mode_file.as_deref(),
            settings.dynamic_file.as_deref(),
        );
        mapping.setup_global_configuration();

        let series_files = collect_slice_files(&settings.input_dir)?;
        if series_files.is_empty() {
            warn!("No slices found in {}", settings.input_dir.display());
        }
        fs::create_dir_all(&settings.output_dir)?;

        let study_uid = generate_uid();
        let time_series_uid = generate_uid();
        let acquisition_time = frame_of_reference_time(&raw).unwrap_or(processing_time);
        let calculator = SliceGeometryCalculator::new(&raw);
        info!("Acquisition type is {}", calculator.acquisition_class());

        let mut report = ProcessingReport {
            raw_file: settings.raw_file.clone(),
            output_dir: settings.output_dir.clone(),
            study_uid: study_uid.clone(),
            series: Vec::with_capacity(series_files.len()),
        };

        let series_count = series_files.len();
        for (index, files) in series_files.iter().enumerate() {
            let series = index + 1;
            let tier = mapping.setup_series_configuration(series as u32).clone();

            let (series_uid, frame_duration) = if tier.is_time_series() {
                let duration = tier.frame_duration().or_else(|| {
                    raw.get_f64("TotalScanTimeSec")
                        .map(|total| total / series_count as f64)
                });
                (time_series_uid.clone(), duration)
            } else {
                (generate_uid(), None)
            };

            info!(
                "Series {} (file series {}): {} slices",
                series,
                files.number,
                files.slices.len()
            );

            let mut series_report = SeriesReport {
                series,
                slice_count: files.slices.len(),
                slices_written: 0,
                series_uid: series_uid.clone(),
                error: None,
            };

            for (slice_index, path) in files.slices.iter().enumerate() {
                let context = SliceContext {
                    slice: slice_index + 1,
                    slice_count: files.slices.len(),
                    series,
                    series_count,
                    series_offset: tier.series_offset(),
                    series_uid: series_uid.clone(),
                    study_uid: study_uid.clone(),
                    accession_number: settings.accession_number.clone().unwrap_or_default(),
                    processing_time,
                    creation_time: Local::now().naive_local(),
                    acquisition_time,
                    frame_duration,
                    geometry: calculator.calculate(slice_index, files.slices.len()),
                };

                let tags = ExpressionEvaluator::new(&raw, &context).resolve(&tier.tags);
                debug!(
                    "Series {}, slice {}: {} tags for {}",
                    series,
                    context.slice,
                    tags.len(),
                    path.display()
                );

                match self.writer.write(path, &settings.output_dir, &tags) {
                    Ok(_) => series_report.slices_written += 1,
                    Err(e) => {
                        error!("Series {} halted: {}", series, e);
                        series_report.error = Some(e.to_string());
                        break;
                    }
                }
            }

            report.series.push(series_report);
        }

        info!(
            "Wrote {} files to {}",
            report.files_written(),
            settings.output_dir.display()
        );
        Ok(report)
    }
}

/// Finds `<series>_<slice>.dcm` files and groups them by series
///
/// Series and slices are sorted by their numbers. Other files are skipped.
pub fn collect_slice_files(dir: &Path) -> Result<Vec<SeriesFiles>> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"(?i)(\d+)_(\d+)\.dcm$").expect("Failed to compile regex"));

    let mut series: BTreeMap<u32, BTreeMap<u32, PathBuf>> = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let numbers = pattern.captures(&name).and_then(|caps| {
            let series_number = caps.get(1)?.as_str().parse::<u32>().ok()?;
            let slice_number = caps.get(2)?.as_str().parse::<u32>().ok()?;
            Some((series_number, slice_number))
        });

        match numbers {
            Some((series_number, slice_number)) => {
                if let Some(previous) = series
                    .entry(series_number)
                    .or_default()
                    .insert(slice_number, path)
                {
                    warn!("Duplicate slice {} ignored", previous.display());
                }
            }
            None => warn!("Skipping {}", name),
        }
    }

    Ok(series
        .into_iter()
        .map(|(number, slices)| SeriesFiles {
            number,
            slices: slices.into_values().collect(),
        })
        .collect())
}

/// Creates a UID in the `2.25` UUID arc
pub fn generate_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

/// Acquisition time derived from the frame-of-reference identifier
fn frame_of_reference_time(raw: &RawValueStore) -> Option<NaiveDateTime> {
    let date = raw.get("FrameOfReference_Date")?;
    let time = raw.get("FrameOfReference_Time")?;
    NaiveDateTime::parse_from_str(&format!("{} {}", date, time), FRAME_OF_REFERENCE_FORMAT).ok()
}
