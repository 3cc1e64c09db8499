//! Request shape and record size accounting.
//!
//! The service limits records, measures, and dimensions per request rather
//! than bytes, so these counts feed pre-write gauges. Record sizes are an
//! estimate of the bytes written for a record, not its serialized length.

use serde::Serialize;
use tracing::error;

use crate::model::{MeasureValueType, Record, WriteRecordsRequest};

const LONG_BYTE_SIZE: u64 = 8;
const DOUBLE_BYTE_SIZE: u64 = 8;
const BOOLEAN_BYTE_SIZE: u64 = 1;

/// Counts describing one write request, recorded before submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestShape {
    pub records: usize,
    pub measures: usize,
    pub common_attribute_dimensions: usize,
}

impl RequestShape {
    pub fn of(request: &WriteRecordsRequest) -> Self {
        Self {
            records: request.records.len(),
            measures: count_measures(request),
            common_attribute_dimensions: request
                .common_attributes
                .as_ref()
                .map_or(0, |c| c.dimensions.len()),
        }
    }
}

/// Measures per request = (common attribute measures) * (measures across records).
///
/// Absent common attributes count as 1 so the product reduces to the record sum.
fn count_measures(request: &WriteRecordsRequest) -> usize {
    let common = request
        .common_attributes
        .as_ref()
        .map_or(1, measures_in_record);
    let records: usize = request.records.iter().map(measures_in_record).sum();
    common * records
}

fn measures_in_record(record: &Record) -> usize {
    if record.is_multi_measure() {
        record.measure_values.len()
    } else {
        1
    }
}

/// Estimated bytes written for a single record.
pub fn record_size_in_bytes(record: &Record) -> u64 {
    let mut bytes = 0u64;

    if let Some(name) = &record.measure_name {
        bytes += name.len() as u64;
    }

    for dimension in &record.dimensions {
        bytes += dimension.name.len() as u64;
        bytes += dimension.value.len() as u64;
    }

    if record.time.is_some() {
        bytes += LONG_BYTE_SIZE;
    }

    match (record.measure_value_type, &record.measure_value) {
        (Some(value_type), Some(value)) if value_type != MeasureValueType::Multi => {
            bytes += scalar_value_size(value_type, value);
        }
        (Some(MeasureValueType::Multi), _) => {
            for measure in &record.measure_values {
                bytes += measure.name.len() as u64;
                bytes += scalar_value_size(measure.value_type, &measure.value);
            }
        }
        _ => {}
    }

    bytes
}

fn scalar_value_size(value_type: MeasureValueType, value: &str) -> u64 {
    match value_type {
        MeasureValueType::Double => DOUBLE_BYTE_SIZE,
        MeasureValueType::Bigint | MeasureValueType::Timestamp => LONG_BYTE_SIZE,
        MeasureValueType::Varchar => value.len() as u64,
        MeasureValueType::Boolean => BOOLEAN_BYTE_SIZE,
        MeasureValueType::Multi => {
            error!(
                value_type = %value_type,
                "nested multi measure value; record size and emitted metrics will be incorrect"
            );
            0
        }
    }
}
