use std::cell::RefCell;

use serde::Deserialize;

/// Runtime knobs. Every field has a default so partial config files work.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// The pending-state queue is compacted every this many drained entries.
    pub queue_compaction: usize,
    /// Maximum diagnostics retained in the thread-local buffer.
    pub diagnostic_capacity: usize,
    /// Hard cap on iterations of a single `v-for` evaluation.
    pub loop_iteration_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_compaction: 1024,
            diagnostic_capacity: 256,
            loop_iteration_limit: 100_000,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_compaction == 0 {
            return Err(ConfigError::Zero("queue_compaction"));
        }
        if self.diagnostic_capacity == 0 {
            return Err(ConfigError::Zero("diagnostic_capacity"));
        }
        if self.loop_iteration_limit == 0 {
            return Err(ConfigError::Zero("loop_iteration_limit"));
        }
        Ok(())
    }
}

thread_local! {
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Install `cfg` for the current thread after validating it.
pub fn install(cfg: RuntimeConfig) -> Result<(), ConfigError> {
    cfg.validate()?;
    tracing::debug!(?cfg, "runtime config installed");
    CONFIG.with(|c| *c.borrow_mut() = cfg);
    Ok(())
}

pub fn current() -> RuntimeConfig {
    CONFIG.with(|c| c.borrow().clone())
}
