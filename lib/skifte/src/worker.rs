//! The per-worker pipeline: map, local sort, rendezvous, coordinator
//! shuffle, rendezvous, reduce. All workers run the same code; worker 0
//! additionally performs the shuffle between the two barriers.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::api::{Mapper, Reducer};
use crate::job::JobInner;
use crate::progress::Stage;
use crate::shuffle;
use crate::utils::lock_or_die;

/// Emit surface handed to [`Mapper::map`].
///
/// Appends to the calling worker's private intermediate buffer; no other
/// worker touches it, so emits take no lock.
pub struct MapContext<'a, K, V> {
    buffer: &'a mut Vec<(K, V)>,
}

impl<K, V> MapContext<'_, K, V> {
    pub fn emit(&mut self, key: K, value: V) {
        self.buffer.push((key, value));
    }
}

/// Emit surface handed to [`Reducer::reduce`].
///
/// Appends to the job's output sink under its mutex.
pub struct ReduceContext<'a, K, V> {
    sink: &'a Mutex<Vec<(K, V)>>,
}

impl<K, V> ReduceContext<'_, K, V> {
    pub fn emit(&mut self, key: K, value: V) {
        lock_or_die(self.sink, "output").push((key, value));
    }
}

pub(crate) fn run<M, R>(job: Arc<JobInner<M, R>>, id: usize)
where
    M: Mapper,
    R: Reducer<Key = M::Key, Value = M::Value>,
{
    // Map: claim the next input record by fetch-and-add until the index
    // runs past the input. A worker that never claims a record still meets
    // the others at the barriers.
    let mut buffer: Vec<(M::Key, M::Value)> = Vec::new();
    loop {
        let index = job.work_index.fetch_add(1, Ordering::Relaxed) as usize;
        let Some((key, value)) = job.input.get(index) else {
            break;
        };
        let mut ctx = MapContext {
            buffer: &mut buffer,
        };
        job.mapper.map(key, value, &mut ctx);
        job.progress.bump();
    }

    buffer.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    debug!(worker = id, pairs = buffer.len(), "map phase done");

    // Hand the sorted buffer to the coordinator. One uncontended lock per
    // worker per job; the map hot path above never locked.
    *lock_or_die(&job.slots[id], "intermediate hand-off") = buffer;

    job.barrier.arrive_and_wait();

    if id == 0 {
        let sources: Vec<_> = job
            .slots
            .iter()
            .map(|slot| std::mem::take(&mut *lock_or_die(slot, "intermediate hand-off")))
            .collect();
        let buckets = shuffle::merge(sources, &job.progress);
        job.progress.enter_stage(Stage::Reduce, buckets.len() as u64);
        job.work_index.store(0, Ordering::Release);
        let _ = job.buckets.set(buckets);
    }

    job.barrier.arrive_and_wait();

    // Reduce: same claim scheme over the shuffled queue, which is immutable
    // from here on.
    let buckets = job.buckets.get().map(Vec::as_slice).unwrap_or(&[]);
    loop {
        let index = job.work_index.fetch_add(1, Ordering::Relaxed) as usize;
        let Some(bucket) = buckets.get(index) else {
            break;
        };
        let mut ctx = ReduceContext { sink: &job.output };
        job.reducer.reduce(bucket, &mut ctx);
        job.progress.bump();
    }
    debug!(worker = id, "reduce phase done");
}
