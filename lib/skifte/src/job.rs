use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};

use anyhow::{ensure, Result};
use tracing::{debug, info};

use crate::api::{Bucket, Mapper, Reducer};
use crate::barrier::PhaseBarrier;
use crate::progress::{self, JobState, ProgressWord, Stage};
use crate::utils::fatal;
use crate::worker;

/// Everything a running job owns, shared across its workers.
pub(crate) struct JobInner<M, R>
where
    M: Mapper,
    R: Reducer<Key = M::Key, Value = M::Value>,
{
    pub(crate) mapper: M,
    pub(crate) reducer: R,
    pub(crate) input: Vec<(M::InKey, M::InValue)>,
    pub(crate) output: Mutex<Vec<(R::OutKey, R::OutValue)>>,
    pub(crate) barrier: PhaseBarrier,
    pub(crate) progress: ProgressWord,
    /// Single claim counter, reused for map (record index) and reduce
    /// (bucket index); fetch-and-add is the only claim mechanism.
    pub(crate) work_index: AtomicU64,
    /// Per-worker deposit slots for the sorted intermediate buffers.
    pub(crate) slots: Vec<Mutex<Vec<(M::Key, M::Value)>>>,
    /// Written once by worker 0 between the barriers; read-only afterwards.
    pub(crate) buckets: OnceLock<Vec<Bucket<M::Key, M::Value>>>,
}

/// Handle to an asynchronously running job.
///
/// Dropping the handle without [`close`](JobHandle::close) leaves the job
/// running to completion in the background.
pub struct JobHandle<M, R>
where
    M: Mapper,
    R: Reducer<Key = M::Key, Value = M::Value>,
{
    inner: Arc<JobInner<M, R>>,
    threads: Vec<JoinHandle<()>>,
}

/// Spawns `workers` threads over the input and returns immediately.
///
/// Fails on a worker count of zero or an input too large for the progress
/// word's 31-bit record counter.
pub fn start<M, R>(
    mapper: M,
    reducer: R,
    input: Vec<(M::InKey, M::InValue)>,
    output: Vec<(R::OutKey, R::OutValue)>,
    workers: usize,
) -> Result<JobHandle<M, R>>
where
    M: Mapper,
    R: Reducer<Key = M::Key, Value = M::Value>,
{
    ensure!(workers >= 1, "worker count must be at least 1");
    ensure!(
        input.len() as u64 <= progress::MAX_ITEMS,
        "input size {} exceeds the progress word capacity of {} records",
        input.len(),
        progress::MAX_ITEMS,
    );

    let records = input.len();
    let inner = Arc::new(JobInner {
        mapper,
        reducer,
        input,
        output: Mutex::new(output),
        barrier: PhaseBarrier::new(workers),
        progress: ProgressWord::new(),
        work_index: AtomicU64::new(0),
        slots: (0..workers).map(|_| Mutex::new(Vec::new())).collect(),
        buckets: OnceLock::new(),
    });
    inner.progress.enter_stage(Stage::Map, records as u64);
    info!(workers, records, "starting mapreduce job");

    let mut threads = Vec::with_capacity(workers);
    for id in 0..workers {
        let job = Arc::clone(&inner);
        let spawned = thread::Builder::new()
            .name(format!("skifte-worker-{id}"))
            .spawn(move || worker::run(job, id));
        match spawned {
            Ok(handle) => threads.push(handle),
            Err(e) => fatal(&format!("failed to create thread: {e}")),
        }
    }

    Ok(JobHandle { inner, threads })
}

impl<M, R> JobHandle<M, R>
where
    M: Mapper,
    R: Reducer<Key = M::Key, Value = M::Value>,
{
    /// Blocks until every worker has exited. A second call is a no-op.
    pub fn wait(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                fatal("failed to join worker thread");
            }
        }
        info!("mapreduce job complete");
    }

    /// Coherent (stage, percentage) snapshot; callable at any time.
    pub fn state(&self) -> JobState {
        self.inner.progress.snapshot()
    }

    /// Waits for the job, releases all engine-owned state, and hands the
    /// output sink back to the caller.
    pub fn close(mut self) -> Vec<(R::OutKey, R::OutValue)> {
        self.wait();
        debug!("closing job handle");
        match Arc::try_unwrap(self.inner) {
            Ok(inner) => match inner.output.into_inner() {
                Ok(output) => output,
                Err(_) => fatal("output mutex poisoned at close"),
            },
            // All workers joined above, so no other reference can remain.
            Err(_) => fatal("job state still shared at close"),
        }
    }
}
