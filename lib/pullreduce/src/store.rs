use crate::partition::Partitioner;
use std::sync::{Mutex, PoisonError};

/// One intermediate key/value pair. Owns copies of both byte strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    key: Box<[u8]>,
    value: Box<[u8]>,
}

impl Entry {
    pub fn new(key: &[u8], value: &[u8]) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    pub fn key(&self) -> &[u8] { &self.key }

    pub fn value(&self) -> &[u8] { &self.value }
}

/// Intermediate storage written concurrently during the map phase.
///
/// One lock-protected vector per partition. Nothing reads it while it is
/// shared; readers take the contents by value with
/// [`PartitionStore::into_partitions`] once every writer has been joined.
pub struct PartitionStore {
    partitions: Box<[Mutex<Vec<Entry>>]>,
}

impl PartitionStore {
    pub fn new(num_partitions: usize) -> Self {
        Self { partitions: (0..num_partitions).map(|_| Mutex::new(Vec::new())).collect() }
    }

    pub fn num_partitions(&self) -> usize { self.partitions.len() }

    pub fn insert(&self, partition: usize, entry: Entry) {
        self.lock(partition).push(entry);
    }

    /// Moves every entry of `batch` into `partition` under one lock, leaving `batch` empty.
    pub fn append(&self, partition: usize, batch: &mut Vec<Entry>) {
        if batch.is_empty() { return; }
        self.lock(partition).append(batch);
    }

    pub fn into_partitions(self) -> Vec<Vec<Entry>> {
        self.partitions
            .into_vec()
            .into_iter()
            .map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
            .collect()
    }

    // A panicking map task aborts the run, so a poisoned partition is never
    // consumed as a result; keep accepting writes from the other tasks.
    fn lock(&self, partition: usize) -> std::sync::MutexGuard<'_, Vec<Entry>> {
        self.partitions[partition].lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle given to a Map callback for emitting intermediate pairs.
///
/// Entries are staged per partition and pushed to the shared store in
/// batches of `batch` entries; whatever is left is pushed when the map task
/// finishes.
pub struct Emitter<'s> {
    store: &'s PartitionStore,
    partitioner: &'s dyn Partitioner,
    local_buffers: Vec<Vec<Entry>>,
    batch: usize,
    emitted: u64,
}

impl<'s> Emitter<'s> {
    pub fn new(store: &'s PartitionStore, partitioner: &'s dyn Partitioner, batch: usize) -> Self {
        let batch = batch.max(1);
        let local_buffers = (0..store.num_partitions()).map(|_| Vec::new()).collect();
        Self { store, partitioner, local_buffers, batch, emitted: 0 }
    }

    /// Routes `(key, value)` to its partition. Both byte strings are copied.
    ///
    /// # Panics
    ///
    /// If the partitioner returns an id outside `[0, num_partitions)`.
    pub fn emit(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) {
        let key = key.as_ref();
        let num_partitions = self.store.num_partitions();
        let part = self.partitioner.partition(key, num_partitions);
        assert!(
            part < num_partitions,
            "partitioner returned {part} for {num_partitions} partitions"
        );
        self.emitted += 1;
        let entry = Entry::new(key, value.as_ref());
        if self.batch == 1 {
            self.store.insert(part, entry);
            return;
        }
        let buf = &mut self.local_buffers[part];
        buf.push(entry);
        if buf.len() >= self.batch {
            self.store.append(part, buf);
        }
    }

    /// Pushes all staged entries to the store and returns the emit count.
    pub fn finish(mut self) -> u64 {
        for (part, buf) in self.local_buffers.iter_mut().enumerate() {
            self.store.append(part, buf);
        }
        self.emitted
    }
}
