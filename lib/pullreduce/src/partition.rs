/// Routes a key to one of `num_partitions` buckets.
///
/// Implementations must be pure: the same key and partition count always
/// give the same id, from any thread, for the whole run. The returned id
/// must lie in `[0, num_partitions)`.
pub trait Partitioner: Send + Sync {
    fn partition(&self, key: &[u8], num_partitions: usize) -> usize;
}

impl<F> Partitioner for F
where
    F: Fn(&[u8], usize) -> usize + Send + Sync,
{
    fn partition(&self, key: &[u8], num_partitions: usize) -> usize {
        self(key, num_partitions)
    }
}

/// djb2-style hash partitioner used when the caller does not supply one.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHashPartitioner;

impl Partitioner for DefaultHashPartitioner {
    fn partition(&self, key: &[u8], num_partitions: usize) -> usize {
        default_hash_partition(key, num_partitions)
    }
}

const HASH_SEED: u64 = 5381;

pub fn default_hash_partition(key: &[u8], num_partitions: usize) -> usize {
    let hash = key
        .iter()
        .fold(HASH_SEED, |hash, &b| hash.wrapping_mul(33).wrapping_add(u64::from(b)));
    (hash % num_partitions as u64) as usize
}
