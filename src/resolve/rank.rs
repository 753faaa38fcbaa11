//! Final deduplication and ranking.

use std::collections::HashSet;

use crate::quality::Quality;
use crate::stream::Stream;

/// Remove URL duplicates (first occurrence kept) and stable-sort best first.
pub fn dedup_and_rank(streams: Vec<Stream>) -> Vec<Stream> {
    let mut seen = HashSet::with_capacity(streams.len());
    let mut unique: Vec<Stream> = streams
        .into_iter()
        .filter(|s| seen.insert(s.url.clone()))
        .collect();

    unique.sort_by(|a, b| Quality::cmp_desc(&a.quality, &b.quality));
    unique
}
