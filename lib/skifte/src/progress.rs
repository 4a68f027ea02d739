//! Job progress as a single bit-packed atomic word.
//!
//! Layout, high to low: stage in bits 63..62, processed count in bits
//! 61..31, total count in bits 30..0. One atomic load yields a coherent
//! (stage, processed, total) triple, so [`JobState`] snapshots need no lock.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

const STAGE_SHIFT: u32 = 62;
const COUNT_SHIFT: u32 = 31;
const COUNT_MASK: u64 = (1 << COUNT_SHIFT) - 1;

/// Largest per-phase item count the 31-bit fields can carry.
pub const MAX_ITEMS: u64 = COUNT_MASK;

/// Pipeline stage of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Undefined,
    Map,
    Shuffle,
    Reduce,
}

impl Stage {
    fn from_bits(bits: u64) -> Stage {
        match bits {
            1 => Stage::Map,
            2 => Stage::Shuffle,
            3 => Stage::Reduce,
            _ => Stage::Undefined,
        }
    }
}

/// Point-in-time snapshot of job progress.
///
/// A completed job reads as `stage == Stage::Reduce` with
/// `percentage == 100.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JobState {
    pub stage: Stage,
    pub percentage: f32,
}

pub(crate) struct ProgressWord(AtomicU64);

impl ProgressWord {
    pub(crate) fn new() -> Self {
        ProgressWord(AtomicU64::new(0))
    }

    /// Enters a new stage: processed resets to zero, total is replaced.
    pub(crate) fn enter_stage(&self, stage: Stage, total: u64) {
        let word = ((stage as u64) << STAGE_SHIFT) | (total & COUNT_MASK);
        self.0.store(word, Ordering::Release);
    }

    /// Counts one processed item in the current stage.
    ///
    /// Relaxed is enough: observers tolerate transient over-count and the
    /// phase barrier orders everything that matters.
    pub(crate) fn bump(&self) {
        self.0.fetch_add(1 << COUNT_SHIFT, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> JobState {
        let word = self.0.load(Ordering::Acquire);
        let stage = Stage::from_bits(word >> STAGE_SHIFT);
        let processed = (word >> COUNT_SHIFT) & COUNT_MASK;
        let total = word & COUNT_MASK;
        let percentage = if total == 0 {
            100.0
        } else {
            // Clamp: increments can momentarily run past the total around a
            // stage transition.
            100.0 * processed.min(total) as f32 / total as f32
        };
        JobState { stage, percentage }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_word_is_undefined() {
        let word = ProgressWord::new();
        let state = word.snapshot();
        assert_eq!(state.stage, Stage::Undefined);
        assert_eq!(state.percentage, 100.0);
    }

    #[test]
    fn stage_and_percentage_roundtrip() {
        let word = ProgressWord::new();
        word.enter_stage(Stage::Map, 10);
        assert_eq!(
            word.snapshot(),
            JobState {
                stage: Stage::Map,
                percentage: 0.0
            }
        );

        for _ in 0..3 {
            word.bump();
        }
        let state = word.snapshot();
        assert_eq!(state.stage, Stage::Map);
        assert_eq!(state.percentage, 30.0);
    }

    #[test]
    fn transition_resets_processed() {
        let word = ProgressWord::new();
        word.enter_stage(Stage::Map, 4);
        for _ in 0..4 {
            word.bump();
        }
        word.enter_stage(Stage::Shuffle, 7);
        let state = word.snapshot();
        assert_eq!(state.stage, Stage::Shuffle);
        assert_eq!(state.percentage, 0.0);
    }

    #[test]
    fn overshoot_clamps_to_hundred() {
        let word = ProgressWord::new();
        word.enter_stage(Stage::Reduce, 2);
        for _ in 0..5 {
            word.bump();
        }
        assert_eq!(word.snapshot().percentage, 100.0);
    }

    #[test]
    fn empty_stage_reads_complete() {
        let word = ProgressWord::new();
        word.enter_stage(Stage::Reduce, 0);
        let state = word.snapshot();
        assert_eq!(state.stage, Stage::Reduce);
        assert_eq!(state.percentage, 100.0);
    }

    #[test]
    fn max_items_fits_the_count_fields() {
        let word = ProgressWord::new();
        word.enter_stage(Stage::Map, MAX_ITEMS);
        let state = word.snapshot();
        assert_eq!(state.stage, Stage::Map);
        assert_eq!(state.percentage, 0.0);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Undefined < Stage::Map);
        assert!(Stage::Map < Stage::Shuffle);
        assert!(Stage::Shuffle < Stage::Reduce);
    }
}
