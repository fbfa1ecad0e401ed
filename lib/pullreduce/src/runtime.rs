use crate::api::{Mapper, Reducer};
use crate::config::JobConfig;
use crate::constants::REDUCE_THREAD_PREFIX;
use crate::cursor::Values;
use crate::error::{panic_message, Error, Result};
use crate::partition::{DefaultHashPartitioner, Partitioner};
use crate::pool::MapPool;
use crate::sort::SortedPartition;
use crate::stats::{PartitionTaskStats, RunStats};
use crate::store::{Emitter, PartitionStore};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, info};

/// A configured job: map and reduce logic, partitioner and run settings.
///
/// Every call to [`MapReduce::run`] builds its own store, worker pool and
/// reduce pool, so a job can be run repeatedly (or concurrently from
/// different threads) without runs observing each other.
pub struct MapReduce<M, R, P = DefaultHashPartitioner> {
    mapper: M,
    reducer: R,
    partitioner: P,
    config: JobConfig,
}

impl<M, R> MapReduce<M, R> {
    pub fn new(mapper: M, reducer: R) -> Self {
        Self { mapper, reducer, partitioner: DefaultHashPartitioner, config: JobConfig::default() }
    }
}

impl<M, R, P> MapReduce<M, R, P> {
    pub fn num_mappers(mut self, n: usize) -> Self {
        self.config.num_mappers = n;
        self
    }

    pub fn num_reducers(mut self, n: usize) -> Self {
        self.config.num_reducers = n;
        self
    }

    pub fn local_batch(mut self, n: usize) -> Self {
        self.config.local_batch = n;
        self
    }

    pub fn config(mut self, config: JobConfig) -> Self {
        self.config = config;
        self
    }

    pub fn partitioner<Q: Partitioner>(self, partitioner: Q) -> MapReduce<M, R, Q> {
        MapReduce { mapper: self.mapper, reducer: self.reducer, partitioner, config: self.config }
    }

    /// Runs map → sort → reduce over `inputs`, each phase fully joined before the next starts.
    pub fn run<I>(&self, inputs: &[I]) -> Result<RunStats>
    where
        I: Sync,
        M: Mapper<I>,
        R: Reducer,
        P: Partitioner,
    {
        self.config.validate()?;
        let JobConfig { num_mappers, num_reducers, local_batch } = self.config;
        info!(inputs = inputs.len(), num_mappers, num_reducers, local_batch, "starting map phase");
        let mut stats = RunStats::default();
        let reduce_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_reducers)
            .thread_name(|i| format!("{REDUCE_THREAD_PREFIX}-{i}"))
            .build()?;

        // Map phase
        let store = PartitionStore::new(num_reducers);
        let map_phase_start = Instant::now();
        let pool = MapPool::new(&store, &self.partitioner, num_mappers, local_batch);
        let workers = pool.workers_for(inputs.len());
        let map_stats = pool.run(inputs, &self.mapper)?;
        stats.record_map(&map_stats, workers, map_phase_start.elapsed().as_millis() as u64);
        info!(phase = "map",
              tasks = stats.map.tasks, workers, total_emits = stats.map.total_emits,
              min_task_ms = stats.map.min_task_ms, max_task_ms = stats.map.max_task_ms,
              wall_ms = stats.map.wall_ms,
              "Map phase complete");

        // Every map worker has been joined; the store changes hands here.
        let partitions = store.into_partitions();

        // Sort
        let sort_phase_start = Instant::now();
        let (sorted, sort_stats): (Vec<SortedPartition>, Vec<PartitionTaskStats>) = reduce_pool.install(|| {
            partitions
                .into_par_iter()
                .enumerate()
                .map(|(id, entries)| {
                    let start = Instant::now();
                    let sorted = SortedPartition::sort(id, entries);
                    let wall_ms = start.elapsed().as_millis() as u64;
                    debug!(partition = id, entries = sorted.len(), wall_ms, "partition sorted");
                    let task = PartitionTaskStats {
                        partition: id,
                        entries: sorted.len() as u64,
                        groups: sorted.distinct_keys() as u64,
                        pulled: 0,
                        skipped: 0,
                        wall_ms,
                    };
                    (sorted, task)
                })
                .unzip()
        });
        stats.record_sort(&sort_stats, sort_phase_start.elapsed().as_millis() as u64);
        info!(phase = "sort",
              partitions = stats.sort.partitions, total_entries = stats.sort.total_entries,
              largest_partition = stats.sort.largest_partition,
              min_partition_ms = stats.sort.min_partition_ms, max_partition_ms = stats.sort.max_partition_ms,
              wall_ms = stats.sort.wall_ms,
              "Sort phase complete");

        // Reduce
        let reduce_phase_start = Instant::now();
        let outcomes: Vec<std::thread::Result<PartitionTaskStats>> = reduce_pool.install(|| {
            sorted
                .par_iter()
                .map(|part| panic::catch_unwind(AssertUnwindSafe(|| reduce_partition(part, &self.reducer))))
                .collect()
        });
        let mut reduce_stats = Vec::with_capacity(outcomes.len());
        let mut failure = None;
        for (partition, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(task) => reduce_stats.push(task),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(partition, %message, "reduce task panicked");
                    failure.get_or_insert(Error::ReduceTaskPanicked { partition, message });
                }
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }
        stats.record_reduce(&reduce_stats, reduce_phase_start.elapsed().as_millis() as u64);
        info!(phase = "reduce",
              partitions = stats.reduce.partitions, total_groups = stats.reduce.total_groups,
              values_pulled = stats.reduce.values_pulled, values_skipped = stats.reduce.values_skipped,
              min_partition_ms = stats.reduce.min_partition_ms, max_partition_ms = stats.reduce.max_partition_ms,
              wall_ms = stats.reduce.wall_ms,
              "Reduce phase complete");

        drop(sorted);
        drop(reduce_pool);
        debug!("run resources released");
        Ok(stats)
    }
}

fn reduce_partition<R: Reducer + ?Sized>(part: &SortedPartition, reducer: &R) -> PartitionTaskStats {
    let start = Instant::now();
    let mut values = part.values();
    let mut groups = 0u64;
    let mut skipped = 0u64;
    while let Some(key) = values.peek_key() {
        values.begin_group(key);
        reducer.reduce(key, &mut values, part.id());
        let left = values.end_group(key);
        if left > 0 {
            debug!(partition = part.id(), left, "reducer stopped before the end of its group");
        }
        skipped += left;
        groups += 1;
    }
    let wall_ms = start.elapsed().as_millis() as u64;
    debug!(partition = part.id(), groups, wall_ms, "partition reduced");
    PartitionTaskStats {
        partition: part.id(),
        entries: part.len() as u64,
        groups,
        pulled: values.pulled(),
        skipped,
        wall_ms,
    }
}

/// Runs a job with the default hash partitioner.
pub fn run<I, MF, RF>(inputs: &[I], map_fn: MF, num_mappers: usize, reduce_fn: RF, num_reducers: usize) -> Result<RunStats>
where
    I: Sync,
    MF: Fn(&I, &mut Emitter<'_>) + Send + Sync,
    RF: Fn(&[u8], &mut Values<'_>, usize) + Send + Sync,
{
    MapReduce::new(map_fn, reduce_fn)
        .num_mappers(num_mappers)
        .num_reducers(num_reducers)
        .run(inputs)
}

pub fn run_with_partitioner<I, MF, RF, PF>(
    inputs: &[I],
    map_fn: MF,
    num_mappers: usize,
    reduce_fn: RF,
    num_reducers: usize,
    partition_fn: PF,
) -> Result<RunStats>
where
    I: Sync,
    MF: Fn(&I, &mut Emitter<'_>) + Send + Sync,
    RF: Fn(&[u8], &mut Values<'_>, usize) + Send + Sync,
    PF: Fn(&[u8], usize) -> usize + Send + Sync,
{
    MapReduce::new(map_fn, reduce_fn)
        .num_mappers(num_mappers)
        .num_reducers(num_reducers)
        .partitioner(partition_fn)
        .run(inputs)
}

pub fn default_pipeline<M, R>(mapper: M, reducer: R) -> MapReduce<M, R> { MapReduce::new(mapper, reducer) }
