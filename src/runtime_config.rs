//! Environment-based runtime configuration.
//!
//! `ROTO_STACK_SIZE` sets the coroutine stack size in bytes, accepting decimal
//! (`16384`) or hex (`0x4000`) values. Larger stacks support deeper handler
//! call chains; smaller stacks reduce memory for high connection counts.

use std::env;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes (default: 16 KB / 0x4000)
    pub stack_size: usize,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = match env::var("ROTO_STACK_SIZE") {
            Ok(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(0x4000)
                } else {
                    val.parse().unwrap_or(0x4000)
                }
            }
            Err(_) => 0x4000,
        };
        RuntimeConfig { stack_size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test so the env var mutations cannot race each other.
    #[test]
    fn parses_decimal_hex_and_falls_back() {
        env::set_var("ROTO_STACK_SIZE", "32768");
        assert_eq!(RuntimeConfig::from_env().stack_size, 32768);
        env::set_var("ROTO_STACK_SIZE", "0x8000");
        assert_eq!(RuntimeConfig::from_env().stack_size, 0x8000);
        env::set_var("ROTO_STACK_SIZE", "garbage");
        assert_eq!(RuntimeConfig::from_env().stack_size, 0x4000);
        env::remove_var("ROTO_STACK_SIZE");
        assert_eq!(RuntimeConfig::from_env().stack_size, 0x4000);
    }
}
