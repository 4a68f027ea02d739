//! The coordinator's k-way merge: per-worker sorted buffers in, key-grouped
//! buckets out.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::debug;

use crate::api::Bucket;
use crate::progress::{ProgressWord, Stage};

/// One heap entry: the next unconsumed pair of a source buffer.
struct Head<K, V> {
    key: K,
    value: V,
    source: usize,
}

impl<K: Ord, V> Head<K, V> {
    fn order(&self, other: &Self) -> Ordering {
        // Keys decide; the source index only keeps the order total.
        self.key.cmp(&other.key).then(self.source.cmp(&other.source))
    }
}

impl<K: Ord, V> PartialEq for Head<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.order(other) == Ordering::Equal
    }
}

impl<K: Ord, V> Eq for Head<K, V> {}

impl<K: Ord, V> PartialOrd for Head<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.order(other))
    }
}

impl<K: Ord, V> Ord for Head<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order(other)
    }
}

/// Merges per-worker buffers, each already sorted by key, into the shuffled
/// bucket queue.
///
/// Enters the shuffle stage on the progress word (total = pair count across
/// all sources) and counts one processed item per merged pair. Every pair
/// lands in exactly one bucket, buckets are key-homogeneous, and bucket keys
/// ascend strictly.
pub(crate) fn merge<K: Ord, V>(
    sources: Vec<Vec<(K, V)>>,
    progress: &ProgressWord,
) -> Vec<Bucket<K, V>> {
    let total_pairs: u64 = sources.iter().map(|s| s.len() as u64).sum();
    progress.enter_stage(Stage::Shuffle, total_pairs);

    let mut cursors: Vec<_> = sources.into_iter().map(Vec::into_iter).collect();
    let mut heap = BinaryHeap::with_capacity(cursors.len());
    for (source, cursor) in cursors.iter_mut().enumerate() {
        if let Some((key, value)) = cursor.next() {
            heap.push(Reverse(Head { key, value, source }));
        }
    }

    let mut buckets: Vec<Bucket<K, V>> = Vec::new();
    while let Some(Reverse(head)) = heap.pop() {
        let source = head.source;
        let mut bucket: Bucket<K, V> = vec![(head.key, head.value)];
        progress.bump();
        if let Some((key, value)) = cursors[source].next() {
            heap.push(Reverse(Head { key, value, source }));
        }

        // Drain every entry key-equivalent to the bucket's key, refilling
        // the heap from each drained entry's source.
        while heap
            .peek()
            .is_some_and(|entry| entry.0.key.cmp(&bucket[0].0) == Ordering::Equal)
        {
            if let Some(Reverse(head)) = heap.pop() {
                let source = head.source;
                bucket.push((head.key, head.value));
                progress.bump();
                if let Some((key, value)) = cursors[source].next() {
                    heap.push(Reverse(Head { key, value, source }));
                }
            }
        }

        buckets.push(bucket);
    }

    debug!(total_pairs, buckets = buckets.len(), "shuffle complete");
    buckets
}
