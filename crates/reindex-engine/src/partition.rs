//! Dataset partitioning into bounded batches.
//!
//! Two strategies:
//! - **Cursor**: buffer items from a single-pass iterator until the batch is
//!   full ([`partition_by_size`]).
//! - **Range**: slice a numeric primary key space into fixed-width windows
//!   ([`partition_by_range`]); windows may contain fewer rows than their
//!   width when ids have gaps.
//!
//! Nothing here performs I/O.

/// Lazy batches of at most `batch_size` items from an iterator.
///
/// Every batch except possibly the last is full. The underlying iterator is
/// consumed once.
pub struct BatchIter<I: Iterator> {
    inner: I,
    batch_size: usize,
}

impl<I: Iterator> Iterator for BatchIter<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.batch_size);
        for item in self.inner.by_ref() {
            batch.push(item);
            if batch.len() == self.batch_size {
                break;
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

/// Split `items` into batches of `batch_size` (a size of 0 is treated as 1).
pub fn partition_by_size<I: IntoIterator>(items: I, batch_size: usize) -> BatchIter<I::IntoIter> {
    BatchIter {
        inner: items.into_iter(),
        batch_size: batch_size.max(1),
    }
}

/// One window of a numeric key range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBatch {
    /// Zero-based position of the window
    pub index: u64,
    /// First id covered (inclusive)
    pub lo: i64,
    /// Last id covered (inclusive); may exceed the dataset maximum
    pub hi: i64,
}

impl RangeBatch {
    /// One-based batch id used for pending-set tracking.
    pub fn batch_id(&self) -> u64 {
        self.index + 1
    }
}

/// Fixed-width windows over `[min_id, max_id]`.
#[derive(Debug, Clone)]
pub struct RangeBatches {
    min_id: i64,
    batch_size: i64,
    next: u64,
    count: u64,
}

impl RangeBatches {
    /// Total number of windows.
    pub fn batch_count(&self) -> u64 {
        self.count
    }
}

impl Iterator for RangeBatches {
    type Item = RangeBatch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;

        // index < count keeps lo within [min_id, max_id]
        let lo = (self.min_id as i128 + index as i128 * self.batch_size as i128) as i64;
        Some(RangeBatch {
            index,
            lo,
            hi: lo.saturating_add(self.batch_size - 1),
        })
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.next = self.next.saturating_add(n as u64).min(self.count);
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RangeBatches {}

/// Windows of `batch_size` ids covering `[min_id, max_id]`.
///
/// Yields `ceil((max_id - min_id + 1) / batch_size)` windows; window `i`
/// covers `[min_id + i*batch_size, min_id + (i+1)*batch_size - 1]`, with the
/// upper bound clamped to `i64::MAX`. An inverted range yields nothing.
pub fn partition_by_range(min_id: i64, max_id: i64, batch_size: usize) -> RangeBatches {
    let batch_size = batch_size.max(1) as i64;
    let count = if max_id < min_id {
        0
    } else {
        let span = max_id.abs_diff(min_id) as u128 + 1;
        u64::try_from(span.div_ceil(batch_size as u128)).unwrap_or(u64::MAX)
    };

    RangeBatches {
        min_id,
        batch_size,
        next: 0,
        count,
    }
}

/// Number of cursor batches for `total` items.
pub fn batch_count(total: u64, batch_size: usize) -> u64 {
    total.div_ceil(batch_size.max(1) as u64)
}

/// Lower bound for a resumed range reindex.
///
/// The resume watermark is the number of documents already in the index,
/// used in place of the highest indexed id. This is an approximation: after
/// deletions the count trails the real high-water mark and already indexed
/// rows are indexed again. Returns `None` when nothing is left to do.
pub fn resume_lower_bound(min_id: i64, max_id: i64, indexed_count: u64) -> Option<i64> {
    let watermark = i64::try_from(indexed_count).unwrap_or(i64::MAX);
    let lo = min_id.max(watermark.saturating_add(1));
    if lo > max_id {
        None
    } else {
        Some(lo)
    }
}
