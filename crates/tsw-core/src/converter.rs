//! Batch converters: turn an ordered batch of entries into one write request.

use thiserror::Error;
use tsw_common::{Record, WriteRecordsRequest};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("batch conversion failed: {0}")]
    Failed(String),

    #[error("converter produced {records} records but {origins} origins")]
    OriginMismatch { records: usize, origins: usize },
}

/// A write request plus, for each request record, the batch index it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedBatch {
    pub request: WriteRecordsRequest,
    /// `origins[i]` is the entry index that produced `request.records[i]`.
    pub origins: Vec<usize>,
}

impl ConvertedBatch {
    /// One record per entry, in batch order.
    pub fn one_to_one(request: WriteRecordsRequest) -> Self {
        let origins = (0..request.records.len()).collect();
        Self { request, origins }
    }

    pub fn with_origins(
        request: WriteRecordsRequest,
        origins: Vec<usize>,
    ) -> Result<Self, ConvertError> {
        if origins.len() != request.records.len() {
            return Err(ConvertError::OriginMismatch {
                records: request.records.len(),
                origins: origins.len(),
            });
        }
        Ok(Self { request, origins })
    }
}

/// Stateless conversion of a batch into a provider request.
pub trait BatchConverter<T>: Send + Sync {
    fn convert(&self, entries: &[T]) -> Result<ConvertedBatch, ConvertError>;
}

/// Entries are already records; writes them 1:1 to a fixed table.
#[derive(Debug, Clone)]
pub struct RecordBatchConverter {
    database_name: String,
    table_name: String,
    common_attributes: Option<Record>,
}

impl RecordBatchConverter {
    pub fn new(database_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            table_name: table_name.into(),
            common_attributes: None,
        }
    }

    pub fn with_common_attributes(mut self, common: Record) -> Self {
        self.common_attributes = Some(common);
        self
    }
}

impl BatchConverter<Record> for RecordBatchConverter {
    fn convert(&self, entries: &[Record]) -> Result<ConvertedBatch, ConvertError> {
        let request = WriteRecordsRequest {
            database_name: self.database_name.clone(),
            table_name: self.table_name.clone(),
            common_attributes: self.common_attributes.clone(),
            records: entries.to_vec(),
        };
        Ok(ConvertedBatch::one_to_one(request))
    }
}

/// Adapts a closure into a [`BatchConverter`].
pub struct FnBatchConverter<F>(pub F);

impl<T, F> BatchConverter<T> for FnBatchConverter<F>
where
    F: Fn(&[T]) -> Result<ConvertedBatch, ConvertError> + Send + Sync,
{
    fn convert(&self, entries: &[T]) -> Result<ConvertedBatch, ConvertError> {
        (self.0)(entries)
    }
}
