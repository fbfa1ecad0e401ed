use thiserror::Error;

/// Rejected run configuration. Raised before any worker thread exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("num_mappers must be greater than zero")]
    ZeroMappers,
    #[error("num_reducers must be greater than zero")]
    ZeroReducers,
    #[error("local_batch must be greater than zero")]
    ZeroLocalBatch,
    #[error("{var}={value:?} is not a positive integer")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to spawn map worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("failed to build reduce pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("map task for input #{input} panicked: {message}")]
    MapTaskPanicked { input: usize, message: String },
    #[error("map worker {worker} panicked outside a map task: {message}")]
    MapWorkerPanicked { worker: usize, message: String },
    #[error("reduce task for partition {partition} panicked: {message}")]
    ReduceTaskPanicked { partition: usize, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// Panic payloads are almost always &str or String.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
