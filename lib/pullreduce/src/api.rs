use crate::cursor::Values;
use crate::store::Emitter;

// ========== Core MapReduce traits ==========

/// User map logic, invoked once per input on a map worker thread.
///
/// Implementations must not share mutable state with other map invocations
/// except through the emitter.
pub trait Mapper<I: ?Sized>: Send + Sync {
    fn map(&self, input: &I, emit: &mut Emitter<'_>);
}

impl<I: ?Sized, F> Mapper<I> for F
where
    F: Fn(&I, &mut Emitter<'_>) + Send + Sync,
{
    fn map(&self, input: &I, emit: &mut Emitter<'_>) {
        self(input, emit)
    }
}

/// User reduce logic, invoked once per distinct key of a partition.
///
/// The framework only guarantees ordering and grouping. The reducer decides
/// how many values to pull from `values`; values it leaves behind are
/// skipped before the next key is handed out. Producing output is entirely
/// up to the reducer.
pub trait Reducer: Send + Sync {
    fn reduce(&self, key: &[u8], values: &mut Values<'_>, partition: usize);
}

impl<F> Reducer for F
where
    F: Fn(&[u8], &mut Values<'_>, usize) + Send + Sync,
{
    fn reduce(&self, key: &[u8], values: &mut Values<'_>, partition: usize) {
        self(key, values, partition)
    }
}
