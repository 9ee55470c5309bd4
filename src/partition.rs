//! Contiguous, near-equal chunking of the final sample.

use std::ops::Range;

/// Split `[0, len)` into exactly `parts` contiguous ranges.
///
/// The first `len % parts` ranges get one extra element, so lengths differ
/// by at most one and the larger ranges come first. When `len < parts` the
/// trailing ranges are empty. `parts == 0` is treated as 1.
#[must_use]
pub fn chunk_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let base = len / parts;
    let rem = len % parts;

    let mut out = Vec::with_capacity(parts);
    let mut start = 0usize;
    for idx in 0..parts {
        let extra = usize::from(idx < rem);
        let end = start + base + extra;
        out.push(start..end);
        start = end;
    }
    out
}

/// Borrow `items` as `parts` contiguous chunks (see [`chunk_ranges`]).
#[must_use]
pub fn partition<T>(items: &[T], parts: usize) -> Vec<&[T]> {
    chunk_ranges(items.len(), parts)
        .into_iter()
        .map(|r| &items[r])
        .collect()
}
