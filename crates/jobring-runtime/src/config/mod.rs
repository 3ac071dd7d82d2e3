//! Pool configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env()` only)
//! 3. Library defaults (`config::defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use jobring_runtime::config::PoolConfig;
//!
//! let config = PoolConfig::from_env()
//!     .num_workers(8)
//!     .queue_capacity(4096);
//! ```

pub mod defaults;

use jobring_core::constants::{MAX_CAPACITY, MAX_WORKERS, MIN_CAPACITY};
use jobring_core::env::env_get;
use jobring_core::{kinfo, PoolError};

/// Worker pool configuration with builder pattern.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads
    pub num_workers: usize,
    /// Queue capacity hint, rounded up to a power of two
    pub queue_capacity: usize,
    /// Backoff exponent cap for blocking enqueue and `wait()`
    pub spin_limit: u32,
    /// Worker thread name prefix
    pub thread_name: String,
    /// Worker stack size in bytes (0 = std default)
    pub stack_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `JR_NUM_WORKERS` - Number of worker threads
    /// - `JR_QUEUE_CAPACITY` - Queue capacity hint
    /// - `JR_SPIN_LIMIT` - Backoff exponent cap
    /// - `JR_THREAD_NAME` - Worker thread name prefix
    /// - `JR_STACK_SIZE` - Worker stack size in bytes
    pub fn from_env() -> Self {
        Self {
            num_workers: env_get("JR_NUM_WORKERS", Self::auto_workers()),
            queue_capacity: env_get("JR_QUEUE_CAPACITY", defaults::QUEUE_CAPACITY),
            spin_limit: env_get("JR_SPIN_LIMIT", defaults::SPIN_LIMIT),
            thread_name: env_get("JR_THREAD_NAME", defaults::THREAD_NAME.to_string()),
            stack_size: env_get("JR_STACK_SIZE", defaults::STACK_SIZE),
        }
    }

    /// Create config with library defaults only (no env override).
    pub fn new() -> Self {
        Self {
            num_workers: Self::auto_workers(),
            queue_capacity: defaults::QUEUE_CAPACITY,
            spin_limit: defaults::SPIN_LIMIT,
            thread_name: defaults::THREAD_NAME.to_string(),
            stack_size: defaults::STACK_SIZE,
        }
    }

    /// One worker per available CPU, capped at `MAX_AUTO_WORKERS`
    pub fn auto_workers() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(defaults::NUM_WORKERS)
            .min(defaults::MAX_AUTO_WORKERS)
    }

    // Builder methods

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn queue_capacity(mut self, cap: usize) -> Self {
        self.queue_capacity = cap;
        self
    }

    pub fn spin_limit(mut self, limit: u32) -> Self {
        self.spin_limit = limit;
        self
    }

    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::InvalidValue("num_workers must be > 0"));
        }
        if self.num_workers > MAX_WORKERS {
            return Err(ConfigError::InvalidValue("num_workers must be <= 256"));
        }
        if self.queue_capacity < MIN_CAPACITY {
            return Err(ConfigError::InvalidValue("queue_capacity must be >= 2"));
        }
        if self.queue_capacity > MAX_CAPACITY {
            return Err(ConfigError::InvalidValue("queue_capacity must be <= 2^30"));
        }
        if self.thread_name.contains('\0') {
            return Err(ConfigError::InvalidValue("thread_name must not contain NUL"));
        }
        Ok(())
    }

    /// Dump configuration at info level
    pub fn log(&self) {
        kinfo!("jobring pool configuration:");
        kinfo!("  num_workers:     {}", self.num_workers);
        kinfo!("  queue_capacity:  {}", self.queue_capacity);
        kinfo!("  spin_limit:      {}", self.spin_limit);
        kinfo!("  thread_name:     {}", self.thread_name);
        kinfo!("  stack_size:      {}", self.stack_size);
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for PoolError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => PoolError::InvalidConfig(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = PoolConfig::new();
        assert!(config.num_workers >= 1);
        assert_eq!(config.queue_capacity, defaults::QUEUE_CAPACITY);
        assert_eq!(config.thread_name, "jobring-worker");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PoolConfig::new()
            .num_workers(8)
            .queue_capacity(64)
            .spin_limit(2)
            .thread_name("io")
            .stack_size(256 * 1024);

        assert_eq!(config.num_workers, 8);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.spin_limit, 2);
        assert_eq!(config.thread_name, "io");
        assert_eq!(config.stack_size, 256 * 1024);
    }

    #[test]
    fn test_validation() {
        assert!(PoolConfig::new().num_workers(0).validate().is_err());
        assert!(PoolConfig::new().num_workers(1000).validate().is_err());
        assert!(PoolConfig::new().queue_capacity(1).validate().is_err());
        assert!(PoolConfig::new().queue_capacity(2).validate().is_ok());
        assert!(PoolConfig::new().thread_name("a\0b").validate().is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("JR_QUEUE_CAPACITY", "77");
        std::env::set_var("JR_THREAD_NAME", "env-worker");
        let config = PoolConfig::from_env();
        std::env::remove_var("JR_QUEUE_CAPACITY");
        std::env::remove_var("JR_THREAD_NAME");

        assert_eq!(config.queue_capacity, 77);
        assert_eq!(config.thread_name, "env-worker");
    }

    #[test]
    fn test_error_into_pool_error() {
        let err = PoolConfig::new().num_workers(0).validate().unwrap_err();
        assert_eq!(PoolError::from(err), PoolError::InvalidConfig("num_workers must be > 0"));
    }
}
