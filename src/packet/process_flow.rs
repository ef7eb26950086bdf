use chrono::NaiveDateTime;

use super::{current_process_id, current_thread_id, now, utf16_size};

pub const PROCESS_FLOW_HEADER_SIZE: usize = 28;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ProcessFlowType {
    EnterMethod = 0,
    LeaveMethod = 1,
    EnterThread = 2,
    LeaveThread = 3,
    EnterProcess = 4,
    LeaveProcess = 5,
}

/// Marks entry into or exit from a method, thread or process.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessFlow {
    pub flow_type: ProcessFlowType,
    pub title: Option<String>,
    pub host_name: Option<String>,
    pub process_id: i32,
    pub thread_id: i32,
    pub timestamp: NaiveDateTime,
}

impl ProcessFlow {
    pub fn new(flow_type: ProcessFlowType, title: impl Into<String>) -> Self {
        Self {
            flow_type,
            title: Some(title.into()),
            host_name: None,
            process_id: current_process_id(),
            thread_id: current_thread_id(),
            timestamp: now(),
        }
    }

    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub(crate) fn size(&self) -> usize {
        PROCESS_FLOW_HEADER_SIZE
            + utf16_size(self.title.as_deref())
            + utf16_size(self.host_name.as_deref())
    }
}
