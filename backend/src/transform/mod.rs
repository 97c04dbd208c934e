//! Transformation module.
//!
//! - Fields: per-column date, balance and transaction-type rules
//! - Mapper: input rows to output records
//! - Pipeline: parse, transform and report

pub mod fields;
pub mod mapper;
pub mod pipeline;

pub use mapper::{transform, transform_row, transform_with_report, FieldFailure, TransformResult};
pub use pipeline::*;
