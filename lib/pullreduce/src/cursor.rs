use crate::store::Entry;
use tracing::trace;

/// Pull iterator over one sorted partition.
///
/// Built fresh for each partition's reduce task and handed to the Reduce
/// callback once per distinct key. The position is private; the only way to
/// move it is to pull the value at the cursor with the matching key.
#[derive(Debug)]
pub struct Values<'a> {
    entries: &'a [Entry],
    pos: usize,
    group_key: Option<&'a [u8]>,
    pulled: u64,
}

impl<'a> Values<'a> {
    pub(crate) fn new(entries: &'a [Entry]) -> Self {
        Self { entries, pos: 0, group_key: None, pulled: 0 }
    }

    /// Returns the next unconsumed value for `key` and advances by one.
    ///
    /// Returns `None` without moving when the group under the cursor is
    /// exhausted or belongs to a different key.
    pub fn next_value(&mut self, key: &[u8]) -> Option<&'a [u8]> {
        if self.group_key.is_some_and(|g| g != key) {
            trace!(pos = self.pos, "pull with a key other than the current group");
            return None;
        }
        let entry = self.entries.get(self.pos)?;
        if entry.key() != key {
            return None;
        }
        self.pos += 1;
        self.pulled += 1;
        Some(entry.value())
    }

    /// `next_value(key)` as a standard iterator.
    pub fn group<'v>(&'v mut self, key: &'v [u8]) -> Group<'v, 'a> {
        Group { values: self, key }
    }

    /// Key of the group the Reduce callback is currently handling.
    pub fn current_key(&self) -> Option<&'a [u8]> { self.group_key }

    pub(crate) fn peek_key(&self) -> Option<&'a [u8]> {
        self.entries.get(self.pos).map(Entry::key)
    }

    pub(crate) fn begin_group(&mut self, key: &'a [u8]) {
        self.group_key = Some(key);
    }

    /// Moves past whatever the callback left of `key`'s run; returns how many were skipped.
    pub(crate) fn end_group(&mut self, key: &[u8]) -> u64 {
        let rest = self.entries[self.pos..].iter().take_while(|e| e.key() == key).count();
        self.pos += rest;
        self.group_key = None;
        rest as u64
    }

    pub(crate) fn pulled(&self) -> u64 { self.pulled }
}

pub struct Group<'v, 'a> {
    values: &'v mut Values<'a>,
    key: &'v [u8],
}

impl<'v, 'a> Iterator for Group<'v, 'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.values.next_value(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortedPartition;
    use claims::{assert_none, assert_some_eq};
    use proptest::prelude::*;

    fn partition(pairs: &[(&str, &str)]) -> SortedPartition {
        SortedPartition::sort(0, pairs.iter().map(|(k, v)| Entry::new(k.as_bytes(), v.as_bytes())).collect())
    }

    #[test]
    fn stops_at_group_boundary() {
        let part = partition(&[("a", "1"), ("a", "2"), ("b", "3")]);
        let mut values = part.values();
        let mut got = vec![values.next_value(b"a").unwrap(), values.next_value(b"a").unwrap()];
        got.sort_unstable();
        assert_eq!(got, vec![&b"1"[..], &b"2"[..]]);
        assert_none!(values.next_value(b"a"));
        // still positioned on b's first entry
        assert_none!(values.next_value(b"a"));
        assert_some_eq!(values.next_value(b"b"), &b"3"[..]);
        assert_none!(values.next_value(b"b"));
    }

    #[test]
    fn wrong_key_does_not_advance() {
        let part = partition(&[("a", "1"), ("b", "2")]);
        let mut values = part.values();
        values.begin_group(b"a");
        assert_none!(values.next_value(b"b"));
        assert_none!(values.next_value(b"zzz"));
        assert_some_eq!(values.next_value(b"a"), &b"1"[..]);
    }

    #[test]
    fn next_key_is_out_of_reach_while_a_group_is_open() {
        let part = partition(&[("a", "1"), ("b", "2")]);
        let mut values = part.values();
        values.begin_group(b"a");
        assert_some_eq!(values.next_value(b"a"), &b"1"[..]);
        assert_none!(values.next_value(b"b"));
        assert_eq!(values.end_group(b"a"), 0);
        values.begin_group(b"b");
        assert_some_eq!(values.next_value(b"b"), &b"2"[..]);
    }

    #[test]
    fn end_group_skips_unpulled_values() {
        let part = partition(&[("a", "1"), ("a", "2"), ("a", "3"), ("b", "4")]);
        let mut values = part.values();
        values.begin_group(b"a");
        values.next_value(b"a");
        assert_eq!(values.end_group(b"a"), 2);
        assert_eq!(values.current_key(), None);
        assert_eq!(values.peek_key(), Some(&b"b"[..]));
        assert_eq!(values.pulled(), 1);
    }

    #[test]
    fn group_iterates_one_key() {
        let part = partition(&[("x", "1"), ("x", "1"), ("y", "1")]);
        let mut values = part.values();
        assert_eq!(values.group(b"x").count(), 2);
        assert_eq!(values.group(b"x").count(), 0);
        assert_eq!(values.group(b"y").count(), 1);
    }

    #[test]
    fn empty_partition_yields_nothing() {
        let part = partition(&[]);
        let mut values = part.values();
        assert_none!(values.peek_key());
        assert_none!(values.next_value(b""));
    }

    proptest! {
        #[test]
        fn pulled_multiset_matches_emitted(pairs in prop::collection::vec(("[a-c]{1,2}", "[0-9]{1,3}"), 0..150)) {
            let entries: Vec<Entry> = pairs.iter().map(|(k, v)| Entry::new(k.as_bytes(), v.as_bytes())).collect();
            let part = SortedPartition::sort(0, entries);
            let mut values = part.values();
            let mut seen = Vec::new();
            while let Some(key) = values.peek_key() {
                values.begin_group(key);
                let mut pulled: Vec<Vec<u8>> = values.group(key).map(<[u8]>::to_vec).collect();
                prop_assert!(!pulled.is_empty());
                let mut expected: Vec<Vec<u8>> = pairs
                    .iter()
                    .filter(|(k, _)| k.as_bytes() == key)
                    .map(|(_, v)| v.as_bytes().to_vec())
                    .collect();
                pulled.sort();
                expected.sort();
                prop_assert_eq!(pulled, expected);
                prop_assert_eq!(values.end_group(key), 0);
                seen.push(key);
            }
            prop_assert_eq!(values.pulled() as usize, pairs.len());
            prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
