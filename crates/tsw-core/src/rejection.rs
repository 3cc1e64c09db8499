//! Rejection mapping: per-record rejection indices back to batch entries.
//!
//! Indices in a rejection report point into the converted request's record
//! list. Converter origins translate them to batch positions. An index the
//! request doesn't have is a contract violation and is reported, never
//! skipped.

use thiserror::Error;
use tsw_common::RejectedRecord;

use crate::converter::ConvertedBatch;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionMapError {
    #[error("rejected record index {index} out of range for request with {records} records")]
    IndexOutOfRange { index: usize, records: usize },

    #[error("request record {record_index} maps to entry {entry} but batch has {entries} entries")]
    OriginOutOfRange {
        record_index: usize,
        entry: usize,
        entries: usize,
    },
}

/// Batch positions of rejected entries, in rejection order.
///
/// An entry that produced several rejected records is listed once, at its
/// first rejection.
pub fn rejected_entry_indices(
    origins: &[usize],
    entries: usize,
    rejected: &[RejectedRecord],
) -> Result<Vec<usize>, RejectionMapError> {
    let mut seen = vec![false; entries];
    let mut indices = Vec::with_capacity(rejected.len());

    for rejection in rejected {
        let entry = *origins
            .get(rejection.record_index)
            .ok_or(RejectionMapError::IndexOutOfRange {
                index: rejection.record_index,
                records: origins.len(),
            })?;
        let slot = seen
            .get_mut(entry)
            .ok_or(RejectionMapError::OriginOutOfRange {
                record_index: rejection.record_index,
                entry,
                entries,
            })?;
        if !*slot {
            *slot = true;
            indices.push(entry);
        }
    }

    Ok(indices)
}

/// Original entries referenced by a rejection report, in rejection order.
pub fn map_rejected<'a, T>(
    entries: &'a [T],
    converted: &ConvertedBatch,
    rejected: &[RejectedRecord],
) -> Result<Vec<&'a T>, RejectionMapError> {
    let indices = rejected_entry_indices(&converted.origins, entries.len(), rejected)?;
    Ok(indices.into_iter().map(|i| &entries[i]).collect())
}

/// Split an owned batch into (rejected, accepted).
///
/// Rejected entries keep the order of `indices`; accepted ones keep batch
/// order. Each entry lands in exactly one side. Out-of-range or repeated
/// indices are ignored here; [`rejected_entry_indices`] never yields them.
pub fn split_rejected<T>(entries: Vec<T>, indices: &[usize]) -> (Vec<T>, Vec<T>) {
    let mut slots: Vec<Option<T>> = entries.into_iter().map(Some).collect();
    let rejected: Vec<T> = indices
        .iter()
        .filter_map(|&i| slots.get_mut(i).and_then(Option::take))
        .collect();
    let accepted = slots.into_iter().flatten().collect();
    (rejected, accepted)
}
