// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge configuration.
//!
//! Protocol constants plus the runtime knobs for a bridge endpoint.
//! Environment overrides use the `PLUGBUS_` prefix.

use std::time::Duration;

/// Bridge protocol version, negotiated during Setup.
pub const PROTOCOL_VERSION: u32 = 1;

/// Default cap on a single frame (anti-OOM protection).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default accept-loop poll interval for service threads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Default bind address for transient fetch endpoints.
pub const DEFAULT_FETCH_BIND_ADDR: &str = "127.0.0.1:0";

/// Runtime knobs for one bridge endpoint.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Maximum accepted frame size in bytes.
    pub max_frame_size: usize,

    /// Sleep between accept polls on service threads.
    pub poll_interval: Duration,

    /// Read timeout on bridge sockets; `None` blocks indefinitely.
    pub io_timeout: Option<Duration>,

    /// Bind address for nested fetch listeners.
    pub fetch_bind_addr: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            io_timeout: None,
            fetch_bind_addr: DEFAULT_FETCH_BIND_ADDR.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Defaults with `PLUGBUS_MAX_FRAME_SIZE`, `PLUGBUS_IO_TIMEOUT_MS`,
    /// and `PLUGBUS_FETCH_BIND_ADDR` applied when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(size) = env_parse::<usize>("PLUGBUS_MAX_FRAME_SIZE") {
            config.max_frame_size = size;
        }
        if let Some(ms) = env_parse::<u64>("PLUGBUS_IO_TIMEOUT_MS") {
            config.io_timeout = Some(Duration::from_millis(ms));
        }
        if let Ok(addr) = std::env::var("PLUGBUS_FETCH_BIND_ADDR") {
            config.fetch_bind_addr = addr;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring invalid {}: {:?}", key, raw);
            None
        }
    }
}
