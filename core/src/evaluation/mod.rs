//! Expression evaluation and slice geometry
//!
//! A [`MappingExpression`] is resolved against the [`RawValueStore`] of the
//! input file and the [`SliceContext`] of the slice being written.
//!
//! [`RawValueStore`]: crate::twix::RawValueStore

pub mod context;
pub mod evaluator;
pub mod expression;
pub mod geometry;

pub use context::SliceContext;
pub use evaluator::{ExpressionEvaluator, FinalTagSet};
pub use expression::MappingExpression;
pub use geometry::{AcquisitionClass, SliceGeometry, SliceGeometryCalculator};
