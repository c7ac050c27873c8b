//! # Batching
//!
//! Bulk operations (expiration processing, notification fan-out) work in
//! fixed-size batches so that a single call never touches an unbounded
//! number of records.

/// Split `items` into consecutive batches of at most `size` elements.
///
/// A `size` of zero is treated as one; the last batch may be shorter.
pub fn chunks<T>(items: &[T], size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.max(1))
}
