//! In-process MapReduce execution engine.
//!
//! [`start`] runs a user-supplied [`Mapper`]/[`Reducer`] pair as a parallel
//! map, per-worker sort, single-coordinator shuffle, and parallel reduce
//! over a fixed pool of worker threads. The returned [`JobHandle`] exposes
//! lock-free progress snapshots while the job runs.

pub mod api;
pub mod progress;

mod barrier;
mod job;
mod shuffle;
mod utils;
mod worker;

pub use api::{Bucket, Mapper, Reducer};
pub use job::{start, JobHandle};
pub use progress::{JobState, Stage, MAX_ITEMS};
pub use worker::{MapContext, ReduceContext};
