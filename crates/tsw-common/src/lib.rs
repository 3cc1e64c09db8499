//! Shared types for the Timestream write sink.
//!
//! This crate provides foundational types shared across the sink crates:
//! - Provider data model (records, write requests, rejected records)
//! - Request shape and record size accounting
//! - Attempt identifiers for tracing
//! - Common error types

pub mod error;
pub mod id;
pub mod model;
pub mod size;

pub use error::{Error, Result};
pub use id::AttemptId;
pub use model::{
    Dimension, DimensionValueType, MeasureValue, MeasureValueType, Record, RecordsIngested,
    RejectedRecord, TimeUnit, WriteRecordsRequest, WriteResponse,
};
pub use size::{record_size_in_bytes, RequestShape};
