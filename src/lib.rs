//! Client-side delivery core for a structured logging console.
//!
//! Packets (log entries, watches, process-flow markers, control commands and
//! log headers) are serialised by a [`formatter`] and delivered by a
//! [`Protocol`] over a pluggable [`Transport`]: TCP to a live console, a
//! bounded in-memory ring, or a file. Each protocol runs synchronously on
//! the calling thread or asynchronously through a [`Scheduler`] with a
//! byte-bounded queue and a choice between blocking and evicting when full.
//!
//! Delivery is best effort. Transport failures are reported to error
//! listeners and the log, never returned to the producer.

pub mod file;
pub mod formatter;
pub mod level;
pub mod memory;
pub mod options;
pub mod packet;
pub mod protocol;
pub mod queue;
pub mod rate_limited_warner;
pub mod scheduler;
pub mod tcp;

#[cfg(test)]
mod test_utils;

pub use file::{FileConfig, FileTransport};
pub use formatter::{BinaryFormatter, PacketFormatter, TextFormatter};
pub use level::{Level, ParseLevelError};
pub use memory::{MemoryConfig, MemoryTransport, StreamTarget};
pub use options::OptionMap;
pub use packet::{
    Color, ControlCommand, ControlCommandType, LogEntry, LogEntryType, LogHeader, Packet,
    PacketKind, PacketType, ProcessFlow, ProcessFlowType, ViewerId, Watch, WatchType,
};
pub use protocol::{
    ErrorListener, Protocol, ProtocolBuildError, ProtocolBuilder, ProtocolConfig, ProtocolError,
    ProtocolRegistry, Transport, TransportFailure,
};
pub use queue::{PacketQueue, SchedulerQueue};
pub use scheduler::{
    CommandExecutor, DispatchCommand, Scheduler, SchedulerCommand, SchedulerConfig,
    SchedulerState,
};
pub use tcp::{TcpConfig, TcpTransport};
