use crate::constants::{DEFAULT_LOCAL_BATCH, ENV_LOCAL_BATCH, ENV_NUM_MAPPERS, ENV_NUM_REDUCERS};
use crate::error::ConfigError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobConfig {
    /// Upper bound on map callbacks running at once.
    pub num_mappers: usize,
    /// Partition count; also the size of the sort/reduce pool.
    pub num_reducers: usize,
    /// Entries a map task stages per partition before appending to the store.
    pub local_batch: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        let cpus = num_cpus::get().max(1);
        Self { num_mappers: cpus, num_reducers: cpus, local_batch: DEFAULT_LOCAL_BATCH }
    }
}

impl JobConfig {
    pub fn new(num_mappers: usize, num_reducers: usize) -> Self {
        Self { num_mappers, num_reducers, local_batch: DEFAULT_LOCAL_BATCH }
    }

    /// Defaults overridden by `MR_NUM_MAPPERS`, `MR_NUM_REDUCERS` and `MR_LOCAL_BATCH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(n) = parse_var(&lookup, ENV_NUM_MAPPERS)? { cfg.num_mappers = n; }
        if let Some(n) = parse_var(&lookup, ENV_NUM_REDUCERS)? { cfg.num_reducers = n; }
        if let Some(n) = parse_var(&lookup, ENV_LOCAL_BATCH)? { cfg.local_batch = n; }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_mappers == 0 {
            return Err(ConfigError::ZeroMappers);
        }
        if self.num_reducers == 0 {
            return Err(ConfigError::ZeroReducers);
        }
        if self.local_batch == 0 {
            return Err(ConfigError::ZeroLocalBatch);
        }
        Ok(())
    }
}

fn parse_var<F>(lookup: &F, var: &'static str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(ConfigError::InvalidEnv { var, value }),
        },
    }
}
