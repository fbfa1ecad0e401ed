//! Single-machine concurrent MapReduce.
//!
//! A run maps every input on a bounded pool of worker threads, routes each
//! emitted pair to a partition, sorts every partition by key and then walks
//! each partition once, handing the Reduce callback a pull iterator over the
//! values of one key at a time. Phases are separated by full barriers.
//!
//! ```no_run
//! use pullreduce::{run, Emitter, Values};
//!
//! let inputs = vec!["a b a".to_string(), "b c".to_string()];
//! run(
//!     &inputs,
//!     |text: &String, emit: &mut Emitter<'_>| {
//!         for word in text.split_whitespace() {
//!             emit.emit(word, "1");
//!         }
//!     },
//!     4,
//!     |key: &[u8], values: &mut Values<'_>, _partition: usize| {
//!         let count = values.group(key).count();
//!         println!("{}\t{count}", String::from_utf8_lossy(key));
//!     },
//!     2,
//! )
//! .unwrap();
//! ```
pub mod api;
pub mod config;
pub mod constants;
pub mod cursor;
pub mod error;
pub mod partition;
mod pool;
pub mod runtime;
pub mod sort;
pub mod stats;
pub mod store;

pub use api::{Mapper, Reducer};
pub use config::JobConfig;
pub use cursor::{Group, Values};
pub use error::{ConfigError, Error, Result};
pub use partition::{default_hash_partition, DefaultHashPartitioner, Partitioner};
pub use runtime::{default_pipeline, run, run_with_partitioner, MapReduce};
pub use sort::SortedPartition;
pub use stats::RunStats;
pub use store::{Emitter, Entry, PartitionStore};
