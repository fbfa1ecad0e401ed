use crate::cursor::Values;
use crate::store::Entry;

/// A partition after the sort stage: entries ordered by key bytes, equal keys adjacent.
#[derive(Debug)]
pub struct SortedPartition {
    id: usize,
    entries: Vec<Entry>,
}

impl SortedPartition {
    /// Sorts `entries` in place by byte-wise key order. Order among equal keys is unspecified.
    pub fn sort(id: usize, mut entries: Vec<Entry>) -> Self {
        entries.sort_unstable_by(|a, b| a.key().cmp(b.key()));
        Self { id, entries }
    }

    pub fn id(&self) -> usize { self.id }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn entries(&self) -> &[Entry] { &self.entries }

    /// Number of distinct keys.
    pub fn distinct_keys(&self) -> usize {
        if self.entries.is_empty() {
            return 0;
        }
        1 + self.entries.windows(2).filter(|w| w[0].key() != w[1].key()).count()
    }

    /// A fresh pull cursor positioned at the first entry.
    pub fn values(&self) -> Values<'_> {
        Values::new(&self.entries)
    }
}
