//! Provider data model for Timestream writes.
//!
//! These mirror the shapes the write API accepts: a request carries optional
//! common attributes plus an ordered list of records. Rejections reference
//! records by their zero-based position in that list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value type of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasureValueType {
    Double,
    Bigint,
    Varchar,
    Boolean,
    Timestamp,
    Multi,
}

impl fmt::Display for MeasureValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MeasureValueType::Double => "DOUBLE",
            MeasureValueType::Bigint => "BIGINT",
            MeasureValueType::Varchar => "VARCHAR",
            MeasureValueType::Boolean => "BOOLEAN",
            MeasureValueType::Timestamp => "TIMESTAMP",
            MeasureValueType::Multi => "MULTI",
        };
        write!(f, "{}", s)
    }
}

/// Unit of a record's `time` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    #[default]
    Milliseconds,
    Seconds,
    Microseconds,
    Nanoseconds,
}

/// Dimension value type. The write API only accepts varchar dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DimensionValueType {
    #[default]
    Varchar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub dimension_value_type: DimensionValueType,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            dimension_value_type: DimensionValueType::Varchar,
        }
    }
}

/// One named measure inside a multi-measure record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureValue {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: MeasureValueType,
}

/// A single time-series record.
///
/// Every field is optional because records may inherit any attribute from
/// the request's common attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Dimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_value_type: Option<MeasureValueType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measure_values: Vec<MeasureValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_unit: Option<TimeUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl Record {
    /// Build a single-measure record.
    pub fn scalar(
        measure_name: impl Into<String>,
        value: impl Into<String>,
        value_type: MeasureValueType,
    ) -> Self {
        Self {
            measure_name: Some(measure_name.into()),
            measure_value: Some(value.into()),
            measure_value_type: Some(value_type),
            ..Default::default()
        }
    }

    /// Build a multi-measure record.
    pub fn multi(measure_name: impl Into<String>, values: Vec<MeasureValue>) -> Self {
        Self {
            measure_name: Some(measure_name.into()),
            measure_value_type: Some(MeasureValueType::Multi),
            measure_values: values,
            ..Default::default()
        }
    }

    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.push(Dimension::new(name, value));
        self
    }

    pub fn with_time(mut self, time: impl Into<String>, unit: TimeUnit) -> Self {
        self.time = Some(time.into());
        self.time_unit = Some(unit);
        self
    }

    pub fn is_multi_measure(&self) -> bool {
        self.measure_value_type == Some(MeasureValueType::Multi)
    }
}

/// Aggregate write request built from one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecordsRequest {
    pub database_name: String,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_attributes: Option<Record>,
    pub records: Vec<Record>,
}

impl WriteRecordsRequest {
    pub fn new(database_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            table_name: table_name.into(),
            common_attributes: None,
            records: Vec::new(),
        }
    }
}

/// A record the service refused, referenced by its index in the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub record_index: usize,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_version: Option<i64>,
}

impl RejectedRecord {
    pub fn new(record_index: usize, reason: impl Into<String>) -> Self {
        Self {
            record_index,
            reason: reason.into(),
            existing_version: None,
        }
    }
}

impl fmt::Display for RejectedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}: {}", self.record_index, self.reason)?;
        if let Some(v) = self.existing_version {
            write!(f, " (existing version {})", v)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsIngested {
    pub total: u64,
    pub memory_store: u64,
    pub magnetic_store: u64,
}

/// Successful write response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_ingested: Option<RecordsIngested>,
}
