use std::any::Any;
use std::fmt;

use crate::packet::Packet;

/// Work item executed by the scheduler's worker thread.
#[derive(Debug)]
pub enum SchedulerCommand {
    Connect,
    WritePacket(Packet),
    Disconnect,
    Dispatch(DispatchCommand),
}

/// Tag of a [`SchedulerCommand`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchedulerAction {
    Connect,
    WritePacket,
    Disconnect,
    Dispatch,
}

impl SchedulerCommand {
    pub fn action(&self) -> SchedulerAction {
        match self {
            SchedulerCommand::Connect => SchedulerAction::Connect,
            SchedulerCommand::WritePacket(_) => SchedulerAction::WritePacket,
            SchedulerCommand::Disconnect => SchedulerAction::Disconnect,
            SchedulerCommand::Dispatch(_) => SchedulerAction::Dispatch,
        }
    }

    /// Bytes charged against the queue threshold: the packet size for
    /// writes, zero for administrative commands.
    pub fn size(&self) -> usize {
        match self {
            SchedulerCommand::WritePacket(packet) => packet.size(),
            _ => 0,
        }
    }

    /// Only write commands may be evicted under overload.
    pub fn is_write(&self) -> bool {
        matches!(self, SchedulerCommand::WritePacket(_))
    }
}

/// Transport-specific side command with an opaque payload.
///
/// Transports inspect the payload's runtime type to decide what to do, which
/// lets them offer extra behaviour (such as flushing a buffer into a stream)
/// without new protocol verbs.
pub struct DispatchCommand {
    action: i32,
    payload: Option<Box<dyn Any + Send>>,
}

impl DispatchCommand {
    pub fn new(action: i32) -> Self {
        Self {
            action,
            payload: None,
        }
    }

    pub fn with_payload<T: Any + Send>(action: i32, payload: T) -> Self {
        Self {
            action,
            payload: Some(Box::new(payload)),
        }
    }

    pub fn action(&self) -> i32 {
        self.action
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    pub fn into_payload(self) -> Option<Box<dyn Any + Send>> {
        self.payload
    }
}

impl fmt::Debug for DispatchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchCommand")
            .field("action", &self.action)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}
