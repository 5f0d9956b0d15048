//! Resolution of mapping expressions into final tag values

use super::context::{format_date, format_time, SliceContext};
use super::expression::MappingExpression;
use crate::mapping::TagMap;
use crate::twix::RawValueStore;
use dicom_core::Tag;
use log::warn;
use std::collections::BTreeMap;

/// Target tag → resolved value, the input of the tag writer
pub type FinalTagSet = BTreeMap<Tag, String>;

/// Deepest macro nesting that is still evaluated
pub const MAX_MACRO_DEPTH: usize = 1;

/// Value of a failed numeric macro
const NUMERIC_FALLBACK: &str = "0";

/// Evaluates mapping expressions for one slice
///
/// Evaluation never fails. Missing raw values, malformed numbers and runaway
/// nesting all resolve to a fallback value.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionEvaluator<'a> {
    raw: &'a RawValueStore,
    context: &'a SliceContext,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(raw: &'a RawValueStore, context: &'a SliceContext) -> Self {
        Self { raw, context }
    }

    /// Resolves every entry of a tag map, omitting suppressed tags
    pub fn resolve(&self, tags: &TagMap) -> FinalTagSet {
        tags.iter()
            .filter_map(|(tag, expr)| self.evaluate(expr, 0).map(|value| (*tag, value)))
            .collect()
    }

    /// Evaluates one expression at the given macro depth
    ///
    /// Returns `None` if the tag must not be written at all.
    pub fn evaluate(&self, expr: &MappingExpression, depth: usize) -> Option<String> {
        match expr {
            MappingExpression::Literal(value) => Some(value.clone()),
            MappingExpression::RawRef(field) => Some(self.raw.value(field).to_string()),
            MappingExpression::VarRef(name) => self.variable(name),
            MappingExpression::Macro { .. } if depth > MAX_MACRO_DEPTH => Some(String::new()),
            MappingExpression::Macro { name, args } => Some(self.call(name, args, depth)),
        }
    }

    fn argument(&self, args: &[MappingExpression], index: usize, depth: usize) -> Option<String> {
        args.get(index)
            .map(|arg| self.evaluate(arg, depth + 1).unwrap_or_default())
    }

    fn call(&self, name: &str, args: &[MappingExpression], depth: usize) -> String {
        match name {
            "DIV" => {
                let (Some(value), Some(divisor)) =
                    (self.argument(args, 0, depth), self.argument(args, 1, depth))
                else {
                    return NUMERIC_FALLBACK.to_string();
                };
                let decimals = self.argument(args, 2, depth);
                divide(&value, &divisor, decimals.as_deref())
            }
            "EXT" => (0..args.len())
                .filter_map(|i| self.argument(args, i, depth))
                .collect(),
            other => {
                warn!("Unknown macro {}", other);
                String::new()
            }
        }
    }

    fn variable(&self, name: &str) -> Option<String> {
        let context = self.context;
        let geometry = &context.geometry;

        let value = match name {
            "slice" => context.slice.to_string(),
            "series" => context.series_number().to_string(),
            "slices" => context.slice_count.to_string(),
            "series_count" => context.series_count.to_string(),
            "uid_series" => context.series_uid.clone(),
            "uid_study" => context.study_uid.clone(),
            "acc" if context.accession_number.is_empty() => return None,
            "acc" => context.accession_number.clone(),
            "processing_date" => format_date(&context.processing_time),
            "processing_time" => format_time(&context.processing_time),
            "creation_date" => format_date(&context.creation_time),
            "creation_time" => format_time(&context.creation_time),
            "acquisition_date" => format_date(&context.shifted_acquisition_time()),
            "acquisition_time" => format_time(&context.shifted_acquisition_time()),
            "protname_time" => format!(
                "{} t={:.2}s",
                self.raw.value("ProtocolName"),
                context.time_offset()
            ),
            "frame_duration" => context
                .frame_duration
                .map(|seconds| (seconds * 1000.0).to_string())
                .unwrap_or_default(),
            "image_position" => geometry.image_position.clone(),
            "image_orientation" => geometry.image_orientation.clone(),
            "slice_location" => geometry.slice_location.clone(),
            "slice_thickness" => geometry.slice_thickness.clone(),
            "slice_spacing" => geometry.slice_spacing.clone(),
            "keep" => return None,
            other => {
                warn!("Unknown variable #{}", other);
                String::new()
            }
        };
        Some(value)
    }
}

/// Divides two numeric strings, truncating to `decimals` fractional digits
///
/// Non-numeric operands and a zero divisor yield `"0"`.
pub fn divide(value: &str, divisor: &str, decimals: Option<&str>) -> String {
    let (Ok(value), Ok(divisor)) = (value.trim().parse::<f64>(), divisor.trim().parse::<f64>())
    else {
        return NUMERIC_FALLBACK.to_string();
    };
    if !value.is_finite() || !divisor.is_finite() || divisor == 0.0 {
        return NUMERIC_FALLBACK.to_string();
    }

    let quotient = (value / divisor).to_string();
    match decimals.and_then(|d| d.trim().parse::<usize>().ok()) {
        Some(decimals) => truncate_decimals(&quotient, decimals),
        None => quotient,
    }
}

/// Cuts a decimal string after `decimals` fractional digits
fn truncate_decimals(text: &str, decimals: usize) -> String {
    let truncated = match text.find('.') {
        Some(point) if decimals == 0 => &text[..point],
        Some(point) => &text[..text.len().min(point + 1 + decimals)],
        None => text,
    };

    match truncated.strip_prefix('-') {
        Some(unsigned) if unsigned.parse::<f64>().map(|v| v == 0.0).unwrap_or(false) => {
            unsigned.to_string()
        }
        _ => truncated.to_string(),
    }
}
