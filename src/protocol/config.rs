//! Settings shared by every protocol, read from the option map.

use std::time::Duration;

use crate::level::Level;
use crate::options::OptionMap;
use crate::scheduler::{DEFAULT_THRESHOLD, SchedulerConfig};

use super::ProtocolBuildError;

/// Default byte limit of the backlog queue.
pub const DEFAULT_BACKLOG_QUEUE: usize = 2048 * 1024;

/// Option names understood by every protocol.
pub const COMMON_OPTIONS: &[&str] = &[
    "level",
    "caption",
    "reconnect",
    "reconnect.interval",
    "reconnect.attempts",
    "backlog.enabled",
    "backlog.queue",
    "backlog.flushon",
    "backlog.keepopen",
    "async.enabled",
    "async.queue",
    "async.throttle",
    "async.clearondisconnect",
];

/// Automatic reconnection after a failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    /// Minimum time between two attempts; zero retries on every operation.
    pub interval: Duration,
    /// Consecutive failed attempts before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

/// Hold low-priority packets until an urgent one arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BacklogConfig {
    pub enabled: bool,
    pub queue: usize,
    pub flush_on: Level,
    /// Keep the transport open between flushes.
    pub keep_open: bool,
}

impl Default for BacklogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue: DEFAULT_BACKLOG_QUEUE,
            flush_on: Level::Error,
            keep_open: false,
        }
    }
}

/// Asynchronous delivery through a scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AsyncConfig {
    pub enabled: bool,
    pub scheduler: SchedulerConfig,
    pub clear_on_disconnect: bool,
}

impl Default for AsyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scheduler: SchedulerConfig::default(),
            clear_on_disconnect: false,
        }
    }
}

/// Complete protocol-independent configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub caption: String,
    pub level: Level,
    pub reconnect: ReconnectPolicy,
    pub backlog: BacklogConfig,
    pub asynchronous: AsyncConfig,
    /// Application name sent in the connection's log header.
    pub app_name: String,
    /// Host name sent in the connection's log header.
    pub host_name: String,
    /// Rendered options, attached to error notifications.
    pub options: String,
}

impl ProtocolConfig {
    /// Defaults for a protocol named `protocol`.
    pub fn new(protocol: &str) -> Self {
        Self {
            caption: protocol.to_owned(),
            level: Level::Debug,
            reconnect: ReconnectPolicy::default(),
            backlog: BacklogConfig::default(),
            asynchronous: AsyncConfig::default(),
            app_name: String::new(),
            host_name: String::new(),
            options: String::new(),
        }
    }

    /// Read the common options for `protocol` from `options`.
    pub fn from_options(protocol: &str, options: &OptionMap) -> Result<Self, ProtocolBuildError> {
        let attempts = options.get_integer("reconnect.attempts", 0)?;
        let attempts = u32::try_from(attempts).map_err(|_| ProtocolBuildError::InvalidValue {
            option: "reconnect.attempts".to_owned(),
            value: attempts.to_string(),
            expected: "a non-negative integer",
        })?;
        let defaults = Self::new(protocol);
        Ok(Self {
            caption: options.get_string("caption", protocol),
            level: options.get_level("level", defaults.level)?,
            reconnect: ReconnectPolicy {
                enabled: options.get_bool("reconnect", false)?,
                interval: options.get_timespan("reconnect.interval", Duration::ZERO)?,
                max_attempts: (attempts > 0).then_some(attempts),
            },
            backlog: BacklogConfig {
                enabled: options.get_bool("backlog.enabled", false)?,
                queue: options.get_size("backlog.queue", DEFAULT_BACKLOG_QUEUE)?,
                flush_on: options.get_level("backlog.flushon", Level::Error)?,
                keep_open: options.get_bool("backlog.keepopen", false)?,
            },
            asynchronous: AsyncConfig {
                enabled: options.get_bool("async.enabled", false)?,
                scheduler: SchedulerConfig {
                    threshold: options.get_size("async.queue", DEFAULT_THRESHOLD)?,
                    throttle: options.get_bool("async.throttle", true)?,
                },
                clear_on_disconnect: options.get_bool("async.clearondisconnect", false)?,
            },
            options: options.to_string(),
            ..defaults
        })
    }

    /// Whether the transport stays connected between writes. Only a backlog
    /// without `keepopen` connects per flush.
    pub fn keep_open(&self) -> bool {
        !self.backlog.enabled || self.backlog.keep_open
    }
}
