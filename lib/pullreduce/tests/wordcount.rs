mod common;

use common::{init_tracing, reference_counts, tokenize, utf8};
use pullreduce::{default_hash_partition, run, Emitter, Values};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

const TEXTS: [&str; 3] = [
    "The quick brown fox jumps over the lazy dog. The dog sleeps.",
    "A fox, a dog and a cat walk into a bar; the bar is quiet.",
    "Quiet dogs and quick cats: the end of the story, the END.",
];

fn write_inputs(dir: &tempfile::TempDir) -> Vec<PathBuf> {
    TEXTS
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let path = dir.path().join(format!("input_{i}.txt"));
            fs::write(&path, text).unwrap();
            path
        })
        .collect()
}

fn word_count(inputs: &[PathBuf], num_mappers: usize) -> (BTreeMap<String, u64>, Vec<(String, usize)>) {
    let counts = Mutex::new(BTreeMap::new());
    let placements = Mutex::new(Vec::new());
    let stats = run(
        inputs,
        |path: &PathBuf, emit: &mut Emitter<'_>| {
            let text = fs::read_to_string(path).unwrap();
            for word in tokenize(&text) {
                emit.emit(&word, "1");
            }
        },
        num_mappers,
        |key: &[u8], values: &mut Values<'_>, partition: usize| {
            let mut sum = 0u64;
            while let Some(v) = values.next_value(key) {
                sum += std::str::from_utf8(v).unwrap().parse::<u64>().unwrap();
            }
            let word = utf8(key);
            placements.lock().unwrap().push((word.clone(), partition));
            let previous = counts.lock().unwrap().insert(word, sum);
            assert!(previous.is_none(), "key reduced twice");
        },
        2,
    )
    .unwrap();
    assert_eq!(stats.map.tasks, inputs.len());
    assert_eq!(stats.reduce.values_skipped, 0);
    (counts.into_inner().unwrap(), placements.into_inner().unwrap())
}

#[test]
fn matches_sequential_word_count_for_any_mapper_count() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(&dir);
    let expected = reference_counts(TEXTS);

    for num_mappers in 1..=8 {
        let (counts, placements) = word_count(&inputs, num_mappers);
        assert_eq!(counts, expected, "num_mappers = {num_mappers}");
        for (word, partition) in placements {
            assert_eq!(partition, default_hash_partition(word.as_bytes(), 2), "{word} misrouted");
        }
    }
}

#[test]
fn keys_within_a_partition_arrive_in_ascending_order() {
    init_tracing();
    let inputs: Vec<&str> = TEXTS.to_vec();
    let seen: Vec<Mutex<Vec<Vec<u8>>>> = (0..3).map(|_| Mutex::new(Vec::new())).collect();
    run(
        &inputs,
        |text: &&str, emit: &mut Emitter<'_>| {
            for word in tokenize(text) {
                emit.emit(word, "1");
            }
        },
        3,
        |key: &[u8], _values: &mut Values<'_>, partition: usize| {
            seen[partition].lock().unwrap().push(key.to_vec());
        },
        3,
    )
    .unwrap();
    let mut total = 0;
    for keys in seen {
        let keys = keys.into_inner().unwrap();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        total += keys.len();
    }
    assert_eq!(total, reference_counts(TEXTS).len());
}
