//! Property-based invariants over the public API.

use proptest::prelude::*;
use skifte::{start, Bucket, MapContext, Mapper, ReduceContext, Reducer};

/// Replays the pair list preloaded into each record.
struct ListMapper;

impl Mapper for ListMapper {
    type InKey = usize;
    type InValue = Vec<(u8, u16)>;
    type Key = u8;
    type Value = u16;

    fn map(&self, _id: &usize, pairs: &Vec<(u8, u16)>, ctx: &mut MapContext<'_, u8, u16>) {
        for &(key, value) in pairs {
            ctx.emit(key, value);
        }
    }
}

/// Emits every pair of its bucket unchanged, making the full shuffled
/// multiset observable in the output sink.
struct IdentityReducer;

impl Reducer for IdentityReducer {
    type Key = u8;
    type Value = u16;
    type OutKey = u8;
    type OutValue = u16;

    fn reduce(&self, bucket: &Bucket<u8, u16>, ctx: &mut ReduceContext<'_, u8, u16>) {
        for &(key, value) in bucket {
            ctx.emit(key, value);
        }
    }
}

/// Emits one (key, bucket size) pair per bucket.
struct SizeReducer;

impl Reducer for SizeReducer {
    type Key = u8;
    type Value = u16;
    type OutKey = u8;
    type OutValue = usize;

    fn reduce(&self, bucket: &Bucket<u8, u16>, ctx: &mut ReduceContext<'_, u8, usize>) {
        ctx.emit(bucket[0].0, bucket.len());
    }
}

fn record_strategy() -> impl Strategy<Value = Vec<Vec<(u8, u16)>>> {
    prop::collection::vec(
        prop::collection::vec((0u8..32, any::<u16>()), 0..16),
        0..32,
    )
}

proptest! {
    /// No emitted pair is dropped or duplicated anywhere in the pipeline:
    /// the output of an identity reduce is the emitted multiset.
    #[test]
    fn every_emitted_pair_survives_the_pipeline(
        records in record_strategy(),
        workers in 1usize..6,
    ) {
        let mut expected: Vec<(u8, u16)> = records.iter().flatten().copied().collect();
        expected.sort_unstable();

        let input: Vec<(usize, Vec<(u8, u16)>)> = records.into_iter().enumerate().collect();
        let job = start(ListMapper, IdentityReducer, input, Vec::new(), workers).unwrap();
        let mut output = job.close();
        output.sort_unstable();

        prop_assert_eq!(output, expected);
    }

    /// Buckets partition the key space: one reducer invocation per distinct
    /// key, each seeing that key's full multiplicity.
    #[test]
    fn buckets_partition_the_key_space(
        records in record_strategy(),
        workers in 1usize..6,
    ) {
        let pairs: Vec<(u8, u16)> = records.iter().flatten().copied().collect();
        let mut expected_keys: Vec<u8> = pairs.iter().map(|(key, _)| *key).collect();
        expected_keys.sort_unstable();
        expected_keys.dedup();

        let input: Vec<(usize, Vec<(u8, u16)>)> = records.into_iter().enumerate().collect();
        let job = start(ListMapper, SizeReducer, input, Vec::new(), workers).unwrap();
        let mut output = job.close();
        output.sort_unstable();

        // One bucket per distinct key.
        let output_keys: Vec<u8> = output.iter().map(|(key, _)| *key).collect();
        prop_assert_eq!(&output_keys, &expected_keys);

        // Each bucket carries the key's full multiplicity.
        for (key, size) in &output {
            let multiplicity = pairs.iter().filter(|(k, _)| k == key).count();
            prop_assert_eq!(*size, multiplicity);
        }
    }

    /// The job terminates in the reduce stage at 100% for any input shape,
    /// including inputs smaller than the worker pool.
    #[test]
    fn jobs_always_terminate_complete(
        records in record_strategy(),
        workers in 1usize..9,
    ) {
        let input: Vec<(usize, Vec<(u8, u16)>)> = records.into_iter().enumerate().collect();
        let mut job = start(ListMapper, IdentityReducer, input, Vec::new(), workers).unwrap();
        job.wait();

        let state = job.state();
        prop_assert_eq!(state.stage, skifte::Stage::Reduce);
        prop_assert_eq!(state.percentage, 100.0);
        job.close();
    }
}
