//! Packet model shared by formatters, queues and transports.
//!
//! A [`Packet`] wraps one of five concrete record kinds together with its
//! [`Level`] and an opaque byte counter used by callers for their own
//! bookkeeping. Packets are plain owned values: once handed to a transport
//! they are moved into its queue, so no per-packet locking is required.

mod control_command;
mod log_entry;
mod log_header;
mod process_flow;
mod watch;


use std::cell::Cell;
use std::sync::atomic::{AtomicI32, Ordering};

use chrono::{Local, NaiveDateTime};

pub use control_command::{ControlCommand, ControlCommandType};
pub use log_entry::{Color, LogEntry, LogEntryType, ViewerId};
pub use log_header::LogHeader;
pub use process_flow::{ProcessFlow, ProcessFlowType};
pub use watch::{Watch, WatchType};

use crate::level::Level;

/// Wire type codes. These values are part of the protocol and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PacketType {
    ControlCommand = 1,
    LogEntry = 4,
    Watch = 5,
    ProcessFlow = 6,
    LogHeader = 7,
}

impl PacketType {
    /// Numeric code written in front of every frame.
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// The concrete record carried by a [`Packet`].
#[derive(Clone, Debug, PartialEq)]
pub enum PacketKind {
    LogEntry(LogEntry),
    Watch(Watch),
    ProcessFlow(ProcessFlow),
    ControlCommand(ControlCommand),
    LogHeader(LogHeader),
}

/// A single unit of telemetry travelling through a protocol.
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    level: Level,
    bytes: usize,
    kind: PacketKind,
}

impl Packet {
    /// Wrap `kind`, choosing the customary level for it.
    ///
    /// Control commands and log headers are administrative and use
    /// [`Level::Control`]; everything else starts at [`Level::Message`].
    pub fn new(kind: PacketKind) -> Self {
        let level = match kind {
            PacketKind::ControlCommand(_) | PacketKind::LogHeader(_) => Level::Control,
            _ => Level::Message,
        };
        Self {
            level,
            bytes: 0,
            kind,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    /// Opaque counter reserved for external bookkeeping. The core never reads it.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn set_bytes(&mut self, bytes: usize) {
        self.bytes = bytes;
    }

    pub fn kind(&self) -> &PacketKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut PacketKind {
        &mut self.kind
    }

    pub fn into_kind(self) -> PacketKind {
        self.kind
    }

    pub fn packet_type(&self) -> PacketType {
        match self.kind {
            PacketKind::LogEntry(_) => PacketType::LogEntry,
            PacketKind::Watch(_) => PacketType::Watch,
            PacketKind::ProcessFlow(_) => PacketType::ProcessFlow,
            PacketKind::ControlCommand(_) => PacketType::ControlCommand,
            PacketKind::LogHeader(_) => PacketType::LogHeader,
        }
    }

    /// Accounting size: fixed header bytes plus two bytes per UTF-16 code
    /// unit of every string, plus any attached binary data.
    pub fn size(&self) -> usize {
        match &self.kind {
            PacketKind::LogEntry(entry) => entry.size(),
            PacketKind::Watch(watch) => watch.size(),
            PacketKind::ProcessFlow(flow) => flow.size(),
            PacketKind::ControlCommand(command) => command.size(),
            PacketKind::LogHeader(header) => header.size(),
        }
    }
}

macro_rules! packet_from {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for Packet {
                fn from(value: $ty) -> Self {
                    Packet::new(PacketKind::$ty(value))
                }
            }
        )*
    };
}

packet_from!(LogEntry, Watch, ProcessFlow, ControlCommand, LogHeader);

/// Byte length of `value` when stored as UTF-16.
pub(crate) fn utf16_size(value: Option<&str>) -> usize {
    value.map_or(0, |s| s.encode_utf16().count() * 2)
}

/// Current local wall-clock time, as recorded on new packets.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Identifier of the running process, as recorded on new packets.
pub fn current_process_id() -> i32 {
    i32::try_from(std::process::id()).unwrap_or(i32::MAX)
}

static NEXT_THREAD_ID: AtomicI32 = AtomicI32::new(1);

thread_local! {
    static THREAD_ID: Cell<i32> = const { Cell::new(0) };
}

/// Small, stable per-thread number recorded on new packets.
pub fn current_thread_id() -> i32 {
    THREAD_ID.with(|id| {
        if id.get() == 0 {
            id.set(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed));
        }
        id.get()
    })
}
