use crate::worker::{MapContext, ReduceContext};

/// All intermediate pairs sharing one key-equivalence class, as handed to a
/// single [`Reducer::reduce`] call. Never empty; intra-bucket order is
/// unspecified.
pub type Bucket<K, V> = Vec<(K, V)>;

/// User-supplied map side of a job.
///
/// `map` is called once per claimed input record and emits zero or more
/// intermediate pairs through the context. Keys and values move into the
/// engine on emit. The intermediate key must be `Ord`; its total order is
/// the ordering buckets are grouped and sorted by.
pub trait Mapper: Send + Sync + 'static {
    type InKey: Send + Sync + 'static;
    type InValue: Send + Sync + 'static;
    type Key: Ord + Send + Sync + 'static;
    type Value: Send + Sync + 'static;

    fn map(
        &self,
        key: &Self::InKey,
        value: &Self::InValue,
        ctx: &mut MapContext<'_, Self::Key, Self::Value>,
    );
}

/// User-supplied reduce side of a job.
///
/// `reduce` is called once per shuffled bucket and emits zero or more output
/// pairs through the context; emitted pairs land in the caller's output sink.
pub trait Reducer: Send + Sync + 'static {
    // Buckets are read concurrently by every worker during reduce.
    type Key: Ord + Send + Sync + 'static;
    type Value: Send + Sync + 'static;
    type OutKey: Send + 'static;
    type OutValue: Send + 'static;

    fn reduce(
        &self,
        bucket: &Bucket<Self::Key, Self::Value>,
        ctx: &mut ReduceContext<'_, Self::OutKey, Self::OutValue>,
    );
}
