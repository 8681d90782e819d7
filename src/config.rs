//! Session configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_REPLY_DELAY_MS: u64 = 1000;
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Delay before the counterpart's automatic reply is delivered.
    pub reply_delay: Duration,
    /// Bounded capacity of the session command queue.
    pub command_queue_capacity: usize,
    /// Buffered events per subscriber before slow subscribers start lagging.
    pub event_capacity: usize,
    /// Uploads larger than this are rejected as unsupported.
    pub max_upload_bytes: usize,
}

impl SessionConfig {
    /// Build typed session config from environment variables.
    ///
    /// Optional:
    /// - `SWIPECHAT_REPLY_DELAY_MS`: default 1000
    /// - `SWIPECHAT_COMMAND_QUEUE_CAPACITY`: default 256
    /// - `SWIPECHAT_EVENT_CAPACITY`: default 256
    /// - `SWIPECHAT_MAX_UPLOAD_BYTES`: default 10 MiB
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            reply_delay: Duration::from_millis(env_parse("SWIPECHAT_REPLY_DELAY_MS", DEFAULT_REPLY_DELAY_MS)),
            command_queue_capacity: env_parse("SWIPECHAT_COMMAND_QUEUE_CAPACITY", DEFAULT_COMMAND_QUEUE_CAPACITY)
                .max(1),
            event_capacity: env_parse("SWIPECHAT_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY).max(1),
            max_upload_bytes: env_parse("SWIPECHAT_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
        }
    }

    #[must_use]
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(DEFAULT_REPLY_DELAY_MS),
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
