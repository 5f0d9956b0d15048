//! Writing resolved tag sets into DICOM files

use crate::error::{RawTagsError, Result};
use crate::evaluation::FinalTagSet;
use crate::mapping::tags::format_tag_path;
use dicom_core::dictionary::DataDictionary;
use dicom_core::value::PrimitiveValue;
use dicom_core::{DataElement, Tag, VR};
use dicom_dictionary_std::StandardDataDictionary;
use dicom_object::{open_file, InMemDicomObject};
use log::debug;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Applies a tag set to a target file
pub trait TagWriter {
    /// Loads `input`, applies every tag as modify-or-insert and saves the
    /// result under the same file name in `output_dir`
    fn write(&self, input: &Path, output_dir: &Path, tags: &FinalTagSet) -> Result<PathBuf>;
}

/// [`TagWriter`] for DICOM part 10 files
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomTagWriter;

impl DicomTagWriter {
    pub fn new() -> Self {
        Self
    }
}

impl TagWriter for DicomTagWriter {
    fn write(&self, input: &Path, output_dir: &Path, tags: &FinalTagSet) -> Result<PathBuf> {
        let file_name = input
            .file_name()
            .ok_or_else(|| RawTagsError::Write(format!("{} is not a file", input.display())))?;
        let output = output_dir.join(file_name);

        let mut dcm = open_file(input).map_err(|e| {
            RawTagsError::Write(format!("unable to load {}: {}", input.display(), e))
        })?;

        for (tag, value) in tags {
            let vr = element_vr(&dcm, *tag);
            let value = encode_value(vr, value).map_err(|e| {
                RawTagsError::Write(format!(
                    "{} in {}: {}",
                    format_tag_path(*tag),
                    input.display(),
                    e
                ))
            })?;
            dcm.put(DataElement::new(*tag, vr, value));
        }

        dcm.write_to_file(&output).map_err(|e| {
            RawTagsError::Write(format!("unable to save {}: {}", output.display(), e))
        })?;
        debug!("Wrote {} tags to {}", tags.len(), output.display());

        Ok(output)
    }
}

/// VR of the existing element, else the dictionary's, else `LO`
fn element_vr(dcm: &InMemDicomObject, tag: Tag) -> VR {
    if let Ok(element) = dcm.element(tag) {
        return element.vr();
    }
    StandardDataDictionary
        .by_tag(tag)
        .map(|entry| entry.vr.relaxed())
        .unwrap_or(VR::LO)
}

/// Converts the text value into a primitive of the given VR
///
/// Binary numeric VRs are parsed from backslash-separated text; all other
/// VRs keep the text as is.
fn encode_value(vr: VR, text: &str) -> std::result::Result<PrimitiveValue, String> {
    if text.trim().is_empty() && is_binary_numeric(vr) {
        return Ok(PrimitiveValue::Empty);
    }

    let value = match vr {
        VR::US => PrimitiveValue::U16(parse_values::<u16>(text)?.into()),
        VR::SS => PrimitiveValue::I16(parse_values::<i16>(text)?.into()),
        VR::UL => PrimitiveValue::U32(parse_values::<u32>(text)?.into()),
        VR::SL => PrimitiveValue::I32(parse_values::<i32>(text)?.into()),
        VR::FL => PrimitiveValue::F32(parse_values::<f32>(text)?.into()),
        VR::FD => PrimitiveValue::F64(parse_values::<f64>(text)?.into()),
        _ => PrimitiveValue::Str(text.to_string()),
    };
    Ok(value)
}

fn is_binary_numeric(vr: VR) -> bool {
    matches!(vr, VR::US | VR::SS | VR::UL | VR::SL | VR::FL | VR::FD)
}

fn parse_values<T: FromStr>(text: &str) -> std::result::Result<Vec<T>, String> {
    text.split('\\')
        .map(|part| {
            part.trim()
                .parse::<T>()
                .map_err(|_| format!("'{}' is not a valid number", part))
        })
        .collect()
}
