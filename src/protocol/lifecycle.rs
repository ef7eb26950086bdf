//! Connection state machine shared by the synchronous and asynchronous modes.
//!
//! [`ProtocolCore`] runs on the producer thread in synchronous mode and on
//! the scheduler worker in asynchronous mode. Every transport failure is
//! caught here, flagged and reported to the error listeners; nothing
//! propagates to the caller.

use std::time::Instant;

use log::{debug, warn};

use crate::level::Level;
use crate::packet::{LogHeader, Packet};
use crate::queue::PacketQueue;
use crate::rate_limited_warner::RateLimitedWarner;
use crate::scheduler::{CommandExecutor, DispatchCommand, FailureFlag, SchedulerCommand};

use super::config::ProtocolConfig;
use super::error::{ErrorListeners, ProtocolError, TransportFailure};
use super::reconnect::ReconnectState;
use super::Transport;

pub(crate) struct ProtocolCore {
    transport: Box<dyn Transport>,
    config: ProtocolConfig,
    connected: bool,
    failed: FailureFlag,
    reconnect: ReconnectState,
    backlog: PacketQueue,
    evicted: RateLimitedWarner,
    listeners: ErrorListeners,
}

impl ProtocolCore {
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        config: ProtocolConfig,
        failed: FailureFlag,
        listeners: ErrorListeners,
    ) -> Self {
        Self {
            reconnect: ReconnectState::new(config.reconnect),
            backlog: PacketQueue::new(config.backlog.queue),
            evicted: RateLimitedWarner::new(format!(
                "{}: packets evicted from the backlog",
                config.caption
            )),
            transport,
            config,
            connected: false,
            failed,
            listeners,
        }
    }

    /// Open the transport. Without `keepopen` a backlog connects per flush,
    /// so this is a no-op.
    pub(crate) fn connect(&mut self) {
        if self.connected || !self.config.keep_open() {
            return;
        }
        if let Err(failure) = self.open() {
            self.handle_failure(failure);
        }
    }

    pub(crate) fn write_packet(&mut self, packet: Packet) {
        let keep_open = self.config.keep_open();
        if !self.connected && keep_open && !self.config.reconnect.enabled {
            return;
        }

        if !self.config.backlog.enabled {
            self.send(packet);
            return;
        }

        let level = packet.level();
        if level >= self.config.backlog.flush_on && level != Level::Control {
            self.flush_backlog(packet);
            if !keep_open {
                self.close();
            }
        } else {
            let evicted = self.backlog.push(packet);
            self.evicted.record(evicted as u64);
        }
    }

    /// Release the transport and discard held packets.
    pub(crate) fn disconnect(&mut self) {
        self.backlog.clear();
        self.close();
    }

    pub(crate) fn dispatch(&mut self, command: DispatchCommand) {
        if !self.connected {
            return;
        }
        if let Err(failure) = self.transport.dispatch(command) {
            self.report(failure);
        }
    }

    fn flush_backlog(&mut self, trigger: Packet) {
        let mut pending = Vec::with_capacity(self.backlog.len() + 1);
        while let Some(packet) = self.backlog.pop() {
            pending.push(packet);
        }
        pending.push(trigger);
        for packet in pending {
            if !self.send(packet) {
                break;
            }
        }
    }

    /// Write one packet, opening or reconnecting first when needed.
    fn send(&mut self, packet: Packet) -> bool {
        if !self.ensure_connected() {
            return false;
        }
        match self.transport.write_packet(packet) {
            Ok(()) => true,
            Err(failure) => {
                self.handle_failure(failure);
                false
            }
        }
    }

    fn ensure_connected(&mut self) -> bool {
        if self.connected {
            return true;
        }
        if !self.config.keep_open() {
            return match self.open() {
                Ok(()) => true,
                Err(failure) => {
                    self.handle_failure(failure);
                    false
                }
            };
        }
        self.try_reconnect()
    }

    /// Silent reconnect gated by the reconnect policy.
    fn try_reconnect(&mut self) -> bool {
        let now = Instant::now();
        if !self.reconnect.attempt_due(now) {
            return false;
        }
        match self.open() {
            Ok(()) => {
                debug!("{}: reconnected", self.config.caption);
                true
            }
            Err(failure) => {
                self.reconnect.record_failure(now);
                debug!(
                    "{}: reconnect attempt {} failed: {failure}",
                    self.config.caption,
                    self.reconnect.attempts()
                );
                false
            }
        }
    }

    fn open(&mut self) -> Result<(), TransportFailure> {
        self.transport.connect()?;
        if self.transport.writes_log_header() {
            let header = LogHeader::new(&self.config.app_name, &self.config.host_name);
            if let Err(failure) = self.transport.write_packet(Packet::from(header)) {
                let _ = self.transport.disconnect();
                return Err(failure);
            }
        }
        self.connected = true;
        self.failed.set(false);
        self.reconnect.record_success();
        Ok(())
    }

    fn close(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        if let Err(failure) = self.transport.disconnect() {
            self.report(failure);
        }
    }

    fn handle_failure(&mut self, failure: TransportFailure) {
        self.failed.set(true);
        self.reconnect.note_failure(Instant::now());
        if self.connected {
            self.connected = false;
            let _ = self.transport.disconnect();
        }
        self.report(failure);
    }

    fn report(&self, failure: TransportFailure) {
        let error = ProtocolError::new(&self.config.caption, &self.config.options, failure);
        warn!("{error}");
        self.listeners.notify(&error);
    }
}

impl CommandExecutor for ProtocolCore {
    fn execute(&mut self, command: SchedulerCommand) {
        match command {
            SchedulerCommand::Connect => self.connect(),
            SchedulerCommand::WritePacket(packet) => self.write_packet(packet),
            SchedulerCommand::Disconnect => self.disconnect(),
            SchedulerCommand::Dispatch(command) => self.dispatch(command),
        }
    }
}

impl Drop for ProtocolCore {
    fn drop(&mut self) {
        self.evicted.flush();
    }
}
