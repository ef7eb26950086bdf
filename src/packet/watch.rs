use chrono::NaiveDateTime;

use super::{now, utf16_size};

pub const WATCH_HEADER_SIZE: usize = 20;

/// Type hint the viewer uses to render a watched value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum WatchType {
    Char = 0,
    #[default]
    String = 1,
    Integer = 2,
    Float = 3,
    Boolean = 4,
    Address = 5,
    Timestamp = 6,
    Object = 7,
}

/// A named variable value displayed in the viewer's watch table.
#[derive(Clone, Debug, PartialEq)]
pub struct Watch {
    pub name: Option<String>,
    pub value: Option<String>,
    pub watch_type: WatchType,
    pub timestamp: NaiveDateTime,
}

impl Watch {
    pub fn new(name: impl Into<String>, value: impl Into<String>, watch_type: WatchType) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
            watch_type,
            timestamp: now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub(crate) fn size(&self) -> usize {
        WATCH_HEADER_SIZE + utf16_size(self.name.as_deref()) + utf16_size(self.value.as_deref())
    }
}
