use serde::Serialize;

/// Per map task: (input index, emits, wall ms).
#[derive(Clone, Debug)]
pub(crate) struct MapTaskStats {
    pub input: usize,
    pub emits: u64,
    pub wall_ms: u64,
}

/// Per partition sort or reduce task.
#[derive(Clone, Debug)]
pub(crate) struct PartitionTaskStats {
    pub partition: usize,
    pub entries: u64,
    pub groups: u64,
    pub pulled: u64,
    pub skipped: u64,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct MapStats {
    pub tasks: usize,
    pub workers: usize,
    pub total_emits: u64,
    pub min_task_ms: u64,
    pub max_task_ms: u64,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct SortStats {
    pub partitions: usize,
    pub total_entries: u64,
    pub largest_partition: u64,
    pub min_partition_ms: u64,
    pub max_partition_ms: u64,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct ReduceStats {
    pub partitions: usize,
    pub total_groups: u64,
    pub values_pulled: u64,
    pub values_skipped: u64,
    pub min_partition_ms: u64,
    pub max_partition_ms: u64,
    pub wall_ms: u64,
}

/// Summary of a completed run, returned by `run`.
#[derive(Default, Clone, Debug, Serialize)]
pub struct RunStats {
    pub map: MapStats,
    pub sort: SortStats,
    pub reduce: ReduceStats,
    /// Entry count of every partition after the map barrier, indexed by partition id.
    pub partition_sizes: Vec<usize>,
}

impl RunStats {
    pub fn total_entries(&self) -> usize { self.partition_sizes.iter().sum() }

    pub(crate) fn record_map(&mut self, per_task: &[MapTaskStats], workers: usize, wall_ms: u64) {
        self.map = MapStats {
            tasks: per_task.len(),
            workers,
            total_emits: per_task.iter().map(|t| t.emits).sum(),
            min_task_ms: per_task.iter().map(|t| t.wall_ms).min().unwrap_or(0),
            max_task_ms: per_task.iter().map(|t| t.wall_ms).max().unwrap_or(0),
            wall_ms,
        };
    }

    pub(crate) fn record_sort(&mut self, per_part: &[PartitionTaskStats], wall_ms: u64) {
        self.partition_sizes = vec![0; per_part.len()];
        for p in per_part {
            self.partition_sizes[p.partition] = p.entries as usize;
        }
        self.sort = SortStats {
            partitions: per_part.len(),
            total_entries: per_part.iter().map(|p| p.entries).sum(),
            largest_partition: per_part.iter().map(|p| p.entries).max().unwrap_or(0),
            min_partition_ms: per_part.iter().map(|p| p.wall_ms).min().unwrap_or(0),
            max_partition_ms: per_part.iter().map(|p| p.wall_ms).max().unwrap_or(0),
            wall_ms,
        };
    }

    pub(crate) fn record_reduce(&mut self, per_part: &[PartitionTaskStats], wall_ms: u64) {
        self.reduce = ReduceStats {
            partitions: per_part.len(),
            total_groups: per_part.iter().map(|p| p.groups).sum(),
            values_pulled: per_part.iter().map(|p| p.pulled).sum(),
            values_skipped: per_part.iter().map(|p| p.skipped).sum(),
            min_partition_ms: per_part.iter().map(|p| p.wall_ms).min().unwrap_or(0),
            max_partition_ms: per_part.iter().map(|p| p.wall_ms).max().unwrap_or(0),
            wall_ms,
        };
    }
}
