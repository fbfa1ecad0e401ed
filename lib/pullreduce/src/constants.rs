//! Centralized environment variable names and default values for run tuning.

// Environment variable names
pub const ENV_NUM_MAPPERS: &str = "MR_NUM_MAPPERS";
pub const ENV_NUM_REDUCERS: &str = "MR_NUM_REDUCERS";
pub const ENV_LOCAL_BATCH: &str = "MR_LOCAL_BATCH";

// Entries staged per partition in a map task before taking the partition lock.
pub const DEFAULT_LOCAL_BATCH: usize = 1024;

pub const MAP_THREAD_PREFIX: &str = "mr-map";
pub const REDUCE_THREAD_PREFIX: &str = "mr-reduce";
