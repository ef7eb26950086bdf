//! Transport lifecycle.
//!
//! A [`Protocol`] wraps one [`Transport`] and owns its delivery mode. In
//! synchronous mode every operation runs on the calling thread under a lock.
//! In asynchronous mode operations become [`SchedulerCommand`]s executed by a
//! private [`Scheduler`]. The mode is fixed when the protocol is built.
//!
//! Transport failures never reach the caller. They set a sticky failed flag,
//! are logged, and are handed to the registered error listeners.

mod config;
mod error;
mod lifecycle;
mod reconnect;
mod registry;

#[cfg(test)]
mod tests;

use parking_lot::Mutex;

pub use config::{
    AsyncConfig, BacklogConfig, COMMON_OPTIONS, DEFAULT_BACKLOG_QUEUE, ProtocolConfig,
    ReconnectPolicy,
};
pub use error::{
    ErrorListener, ErrorListeners, ProtocolBuildError, ProtocolError, TransportFailure,
};
pub use registry::{ProtocolRegistry, TransportFactory};

use crate::level::Level;
use crate::packet::Packet;
use crate::scheduler::{DispatchCommand, FailureFlag, Scheduler, SchedulerCommand, SchedulerState};
use lifecycle::ProtocolCore;

/// Transport-specific half of a protocol.
///
/// Implementations perform blocking I/O and return failures; the owning
/// [`Protocol`] decides how to report them.
pub trait Transport: Send {
    /// Registry name, e.g. `"tcp"`.
    fn name(&self) -> &'static str;

    fn connect(&mut self) -> Result<(), TransportFailure>;

    fn write_packet(&mut self, packet: Packet) -> Result<(), TransportFailure>;

    /// Release resources. Must be safe to call on a closed transport.
    fn disconnect(&mut self) -> Result<(), TransportFailure>;

    /// Run a side command. Transports without extension behaviour ignore it.
    fn dispatch(&mut self, command: DispatchCommand) -> Result<(), TransportFailure> {
        let _ = command;
        Ok(())
    }

    /// Whether a [`LogHeader`](crate::packet::LogHeader) is written after
    /// each successful connect.
    fn writes_log_header(&self) -> bool {
        false
    }
}

enum Mode {
    Sync(Mutex<ProtocolCore>),
    Async(Scheduler),
}

/// A transport plus its delivery mode, level filter and error reporting.
pub struct Protocol {
    name: &'static str,
    caption: String,
    level: Level,
    clear_on_disconnect: bool,
    failed: FailureFlag,
    listeners: ErrorListeners,
    mode: Mode,
}

impl Protocol {
    fn new(
        transport: Box<dyn Transport>,
        config: ProtocolConfig,
        listeners: ErrorListeners,
    ) -> Self {
        let name = transport.name();
        let failed = FailureFlag::new();
        let caption = config.caption.clone();
        let level = config.level;
        let asynchronous = config.asynchronous;
        let core = ProtocolCore::new(transport, config, failed.clone(), listeners.clone());
        let mode = if asynchronous.enabled {
            Mode::Async(Scheduler::new(
                asynchronous.scheduler,
                Box::new(core),
                failed.clone(),
            ))
        } else {
            Mode::Sync(Mutex::new(core))
        };
        Self {
            name,
            caption,
            level,
            clear_on_disconnect: asynchronous.clear_on_disconnect,
            failed,
            listeners,
            mode,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Display name used in diagnostics; defaults to [`Protocol::name`].
    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Minimum level a packet needs to be written.
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn is_asynchronous(&self) -> bool {
        matches!(self.mode, Mode::Async(_))
    }

    /// Whether the last transport operation failed. Cleared by the next
    /// successful connect.
    pub fn is_failed(&self) -> bool {
        self.failed.is_set()
    }

    /// Commands waiting for the scheduler worker; always zero in
    /// synchronous mode.
    pub fn pending(&self) -> usize {
        match &self.mode {
            Mode::Sync(_) => 0,
            Mode::Async(scheduler) => scheduler.len(),
        }
    }

    pub fn add_error_listener(&self, listener: ErrorListener) {
        self.listeners.add(listener);
    }

    /// Open the transport. In asynchronous mode this also starts the
    /// scheduler.
    pub fn connect(&self) {
        match &self.mode {
            Mode::Sync(core) => core.lock().connect(),
            Mode::Async(scheduler) => {
                scheduler.start();
                scheduler.schedule(SchedulerCommand::Connect);
            }
        }
    }

    /// Write `packet` unless its level is below [`Protocol::level`].
    pub fn write_packet(&self, packet: Packet) {
        if packet.level() < self.level {
            return;
        }
        match &self.mode {
            Mode::Sync(core) => core.lock().write_packet(packet),
            Mode::Async(scheduler) => {
                scheduler.schedule(SchedulerCommand::WritePacket(packet));
            }
        }
    }

    pub fn dispatch(&self, command: DispatchCommand) {
        match &self.mode {
            Mode::Sync(core) => core.lock().dispatch(command),
            Mode::Async(scheduler) => {
                scheduler.schedule(SchedulerCommand::Dispatch(command));
            }
        }
    }

    /// Close the transport. In asynchronous mode the scheduler drains its
    /// queue (or discards it with `async.clearondisconnect`) and stops.
    pub fn disconnect(&self) {
        match &self.mode {
            Mode::Sync(core) => core.lock().disconnect(),
            Mode::Async(scheduler) => {
                if self.clear_on_disconnect {
                    scheduler.clear();
                }
                if scheduler.state() == SchedulerState::Started {
                    scheduler.schedule(SchedulerCommand::Disconnect);
                }
                scheduler.stop();
            }
        }
    }
}

impl Drop for Protocol {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Protocol")
            .field("name", &self.name)
            .field("caption", &self.caption)
            .field("level", &self.level)
            .field("asynchronous", &self.is_asynchronous())
            .field("failed", &self.is_failed())
            .finish()
    }
}

/// Assembles a [`Protocol`] from a transport and its configuration.
pub struct ProtocolBuilder {
    transport: Box<dyn Transport>,
    config: ProtocolConfig,
    listeners: ErrorListeners,
}

impl ProtocolBuilder {
    pub fn new(transport: Box<dyn Transport>, config: ProtocolConfig) -> Self {
        Self {
            transport,
            config,
            listeners: ErrorListeners::default(),
        }
    }

    /// Application name announced in the log header.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.config.app_name = app_name.into();
        self
    }

    /// Host name announced in the log header.
    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.config.host_name = host_name.into();
        self
    }

    pub fn with_error_listener(self, listener: ErrorListener) -> Self {
        self.listeners.add(listener);
        self
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn build(self) -> Protocol {
        Protocol::new(self.transport, self.config, self.listeners)
    }
}
