pub mod cli;
pub mod error;
pub mod evaluation;
pub mod mapping;
pub mod processor;
pub mod summary;
pub mod twix;
pub mod writer;

pub use cli::report::TextReport;
pub use error::{RawTagsError, Result};
pub use evaluation::{
    ExpressionEvaluator, FinalTagSet, MappingExpression, SliceContext, SliceGeometry,
    SliceGeometryCalculator,
};
pub use mapping::{MappingTier, TagMapping};
pub use processor::{ProcessingReport, ProcessorSettings, TagProcessor};
pub use twix::{RawValueStore, TwixReader};
pub use writer::{DicomTagWriter, TagWriter};
