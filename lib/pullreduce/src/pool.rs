use crate::api::Mapper;
use crate::constants::MAP_THREAD_PREFIX;
use crate::error::{panic_message, Error, Result};
use crate::partition::Partitioner;
use crate::stats::MapTaskStats;
use crate::store::{Emitter, PartitionStore};
use crossbeam_channel as channel;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{debug, error};

/// Fixed pool of map workers fed through a bounded queue.
///
/// At most `workers` map callbacks run at any instant: each worker thread
/// runs one callback at a time and the queue holds at most `workers`
/// admitted-but-unstarted inputs. `run` joins every worker before returning.
pub(crate) struct MapPool<'r> {
    store: &'r PartitionStore,
    partitioner: &'r dyn Partitioner,
    num_mappers: usize,
    local_batch: usize,
}

struct TaskFailure {
    input: usize,
    message: String,
}

impl<'r> MapPool<'r> {
    pub(crate) fn new(
        store: &'r PartitionStore,
        partitioner: &'r dyn Partitioner,
        num_mappers: usize,
        local_batch: usize,
    ) -> Self {
        Self { store, partitioner, num_mappers, local_batch }
    }

    pub(crate) fn workers_for(&self, inputs: usize) -> usize { self.num_mappers.min(inputs) }

    pub(crate) fn run<I, M>(&self, inputs: &[I], mapper: &M) -> Result<Vec<MapTaskStats>>
    where
        I: Sync,
        M: Mapper<I> + ?Sized,
    {
        let workers = self.workers_for(inputs.len());
        if workers == 0 {
            return Ok(Vec::new());
        }
        let abort = AtomicBool::new(false);

        thread::scope(|s| {
            let (tx, rx) = channel::bounded::<(usize, &I)>(workers);
            let mut handles = Vec::with_capacity(workers);
            for w in 0..workers {
                let rx = rx.clone();
                let abort = &abort;
                let handle = thread::Builder::new()
                    .name(format!("{MAP_THREAD_PREFIX}-{w}"))
                    .spawn_scoped(s, move || self.worker_loop(rx, mapper, abort))?;
                handles.push(handle);
            }
            drop(rx);

            for task in inputs.iter().enumerate() {
                if abort.load(Ordering::Acquire) || tx.send(task).is_err() {
                    break;
                }
            }
            // closing the queue lets idle workers exit
            drop(tx);

            let mut stats = Vec::with_capacity(inputs.len());
            let mut failure: Option<Error> = None;
            for (worker, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(mut done)) => stats.append(&mut done),
                    Ok(Err(TaskFailure { input, message })) => {
                        failure.get_or_insert(Error::MapTaskPanicked { input, message });
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!(worker, %message, "map worker panicked");
                        failure.get_or_insert(Error::MapWorkerPanicked { worker, message });
                    }
                }
            }
            if let Some(err) = failure {
                return Err(err);
            }
            stats.sort_unstable_by_key(|t| t.input);
            Ok(stats)
        })
    }

    fn worker_loop<I, M>(
        &self,
        rx: channel::Receiver<(usize, &I)>,
        mapper: &M,
        abort: &AtomicBool,
    ) -> std::result::Result<Vec<MapTaskStats>, TaskFailure>
    where
        I: Sync,
        M: Mapper<I> + ?Sized,
    {
        let mut done = Vec::new();
        for (input, item) in rx.iter() {
            if abort.load(Ordering::Acquire) {
                break;
            }
            let task_start = Instant::now();
            let mut emitter = Emitter::new(self.store, self.partitioner, self.local_batch);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| mapper.map(item, &mut emitter)));
            if let Err(payload) = outcome {
                abort.store(true, Ordering::Release);
                let message = panic_message(payload.as_ref());
                error!(input, %message, "map task panicked");
                return Err(TaskFailure { input, message });
            }
            let emits = emitter.finish();
            let wall_ms = task_start.elapsed().as_millis() as u64;
            debug!(input, emits, wall_ms, "map task done");
            done.push(MapTaskStats { input, emits, wall_ms });
        }
        Ok(done)
    }
}
