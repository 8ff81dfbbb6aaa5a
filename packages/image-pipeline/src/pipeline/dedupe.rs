//! Duplicate removal over canonical keys.

use std::collections::HashSet;

use tracing::debug;

use super::canonical::canonicalize;
use crate::types::ImageRecord;

/// Result of a dedupe pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduplicated {
    /// First occurrence of every canonical key, renumbered from 1
    pub images: Vec<ImageRecord>,
    pub removed_count: usize,
}

/// Turn raw image URLs into fresh, duplicate-free records.
pub fn dedupe_urls<S: AsRef<str>>(urls: &[S]) -> Deduplicated {
    let records = urls
        .iter()
        .enumerate()
        .map(|(index, src)| ImageRecord::from_src(index + 1, src.as_ref()))
        .collect();
    dedupe_records(records)
}

/// Remove duplicates from an existing record set (merge or refresh).
///
/// Keeps the first record for each canonical key in input order and
/// reassigns `id` densely from 1.
pub fn dedupe_records(records: Vec<ImageRecord>) -> Deduplicated {
    let input_len = records.len();
    let mut seen = HashSet::with_capacity(input_len);

    let mut images: Vec<ImageRecord> = records
        .into_iter()
        .filter(|record| seen.insert(canonicalize(&record.src)))
        .collect();

    for (index, image) in images.iter_mut().enumerate() {
        image.id = index + 1;
    }

    let removed_count = input_len - images.len();
    if removed_count > 0 {
        debug!(kept = images.len(), removed_count, "Removed duplicate images");
    }

    Deduplicated {
        images,
        removed_count,
    }
}
