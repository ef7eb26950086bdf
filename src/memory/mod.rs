//! In-memory transport holding the most recent packets.
//!
//! Packets accumulate in a byte-bounded [`PacketQueue`]. A dispatch command
//! drains the queue either into a byte stream, formatted and prefixed with
//! the stream preamble, or into another [`Protocol`].


use std::io::Write;
use std::sync::Arc;

use crate::formatter::{self, PacketFormatter};
use crate::options::OptionMap;
use crate::packet::Packet;
use crate::protocol::{Protocol, ProtocolBuildError, Transport, TransportFailure};
use crate::queue::PacketQueue;
use crate::rate_limited_warner::RateLimitedWarner;
use crate::scheduler::DispatchCommand;

/// Default byte limit of the buffered packets.
pub const DEFAULT_MAX_SIZE: usize = 2048 * 1024;

/// Options accepted by the `mem` protocol besides the common ones.
pub const MEMORY_OPTIONS: &[&str] = &["maxsize", "astext", "pattern", "indent"];

/// Dispatch action draining the buffer into a stream or protocol.
pub const FLUSH_ACTION: i32 = 0;

/// Byte sink accepted as a dispatch payload.
pub struct StreamTarget(pub Box<dyn Write + Send>);

impl StreamTarget {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self(Box::new(writer))
    }
}

/// Command draining the buffer into `writer`.
pub fn flush_to_stream(writer: impl Write + Send + 'static) -> DispatchCommand {
    DispatchCommand::with_payload(FLUSH_ACTION, StreamTarget::new(writer))
}

/// Command replaying the buffer into `protocol`.
pub fn flush_to_protocol(protocol: Arc<Protocol>) -> DispatchCommand {
    DispatchCommand::with_payload(FLUSH_ACTION, protocol)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryConfig {
    pub max_size: usize,
    pub as_text: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            as_text: false,
        }
    }
}

impl MemoryConfig {
    pub fn from_options(options: &OptionMap) -> Result<Self, ProtocolBuildError> {
        Ok(Self {
            max_size: options.get_size("maxsize", DEFAULT_MAX_SIZE)?,
            as_text: options.get_bool("astext", false)?,
        })
    }
}

pub struct MemoryTransport {
    queue: PacketQueue,
    formatter: Box<dyn PacketFormatter>,
    evicted: RateLimitedWarner,
}

impl MemoryTransport {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            queue: PacketQueue::new(config.max_size),
            formatter: formatter::for_mode(config.as_text),
            evicted: RateLimitedWarner::new("mem: packets evicted to stay within maxsize"),
        }
    }

    pub fn from_options(options: &OptionMap) -> Result<Self, ProtocolBuildError> {
        Ok(Self::new(MemoryConfig::from_options(options)?))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Bytes currently charged against `maxsize`.
    pub fn size(&self) -> usize {
        self.queue.size()
    }

    fn drain_into_stream(&mut self, target: &mut dyn Write) -> Result<(), TransportFailure> {
        target.write_all(self.formatter.preamble())?;
        while let Some(packet) = self.queue.pop() {
            self.formatter.format(&packet, target)?;
        }
        target.flush()?;
        Ok(())
    }

    fn drain_into_protocol(&mut self, protocol: &Protocol) {
        while let Some(packet) = self.queue.pop() {
            protocol.write_packet(packet);
        }
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "mem"
    }

    fn connect(&mut self) -> Result<(), TransportFailure> {
        self.queue.clear();
        Ok(())
    }

    fn write_packet(&mut self, packet: Packet) -> Result<(), TransportFailure> {
        let evicted = self.queue.push(packet);
        self.evicted.record(evicted as u64);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportFailure> {
        self.queue.clear();
        Ok(())
    }

    /// Drain into the payload's target: a [`StreamTarget`] or an
    /// `Arc<Protocol>`. Other payloads are ignored.
    fn dispatch(&mut self, command: DispatchCommand) -> Result<(), TransportFailure> {
        let Some(payload) = command.into_payload() else {
            return Ok(());
        };
        let payload = match payload.downcast::<StreamTarget>() {
            Ok(mut target) => return self.drain_into_stream(target.0.as_mut()),
            Err(other) => other,
        };
        if let Ok(protocol) = payload.downcast::<Arc<Protocol>>() {
            self.drain_into_protocol(&protocol);
        }
        Ok(())
    }
}
