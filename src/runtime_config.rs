//! # Runtime Configuration
//!
//! Coroutine runtime knobs read from the environment, separate from
//! [`crate::config::AppConfig`] because they must be applied before the server starts.
//!
//! ## `FORMSHEET_STACK_SIZE`
//!
//! Stack size for request coroutines, in decimal (`32768`) or hex (`0x8000`).
//! Default: `0x8000` (32 KB). Each request holds a blocking HTTP client call plus
//! TLS state on its stack, so the default is double may's minimum.
//!
//! ```rust
//! use formsheet::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.stack_size > 0);
//! ```

use std::env;

pub const DEFAULT_STACK_SIZE: usize = 0x8000;

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_value(env::var("FORMSHEET_STACK_SIZE").ok().as_deref())
    }

    /// Parse a raw stack-size value; unparsable or zero values fall back to the default
    pub fn from_value(raw: Option<&str>) -> Self {
        let stack_size = raw
            .map(str::trim)
            .and_then(|val| match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
                Some(hex) => usize::from_str_radix(hex, 16).ok(),
                None => val.parse().ok(),
            })
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }

    /// Apply to the global `may` scheduler; call before starting the server
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}
