use chrono::NaiveDateTime;

use super::{current_process_id, current_thread_id, now, utf16_size};

/// Fixed bytes of a log entry payload ahead of its variable parts.
pub const LOG_ENTRY_HEADER_SIZE: usize = 48;

/// Kind of log entry, interpreted by the viewer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LogEntryType {
    Separator = 0,
    EnterMethod = 1,
    LeaveMethod = 2,
    ResetCallstack = 3,
    #[default]
    Message = 100,
    Warning = 101,
    Error = 102,
    InternalError = 103,
    Comment = 104,
    VariableValue = 105,
    Checkpoint = 106,
    Debug = 107,
    Verbose = 108,
    Fatal = 109,
    Conditional = 110,
    Assert = 111,
    Text = 200,
    Binary = 201,
    Graphic = 202,
    Source = 203,
    Object = 204,
    WebContent = 205,
    System = 206,
    MemoryStatistic = 207,
    DatabaseResult = 208,
    DatabaseStructure = 209,
}

/// Viewer used to display an entry's data block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ViewerId {
    None = -1,
    #[default]
    Title = 0,
    Data = 1,
    List = 2,
    ValueList = 3,
    Inspector = 4,
    Table = 5,
    Web = 100,
    Binary = 200,
    HtmlSource = 300,
    JavaScriptSource = 301,
    VbScriptSource = 302,
    PerlSource = 303,
    SqlSource = 304,
    IniSource = 305,
    PythonSource = 306,
    XmlSource = 307,
    Bitmap = 400,
    Jpeg = 401,
    Icon = 402,
    Metafile = 403,
}

/// Background colour of an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Sentinel the viewer reads as "no colour set".
    pub const DEFAULT: Color = Color {
        r: 0x05,
        g: 0x00,
        b: 0x00,
        a: 0x00,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    /// Packed form written to the wire: red in the low byte, alpha in the high byte.
    pub fn packed(self) -> u32 {
        u32::from(self.r)
            | (u32::from(self.g) << 8)
            | (u32::from(self.b) << 16)
            | (u32::from(self.a) << 24)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The most common packet: one message in the viewer's log.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub entry_type: LogEntryType,
    pub viewer_id: ViewerId,
    pub app_name: Option<String>,
    pub session_name: Option<String>,
    pub title: Option<String>,
    pub host_name: Option<String>,
    pub data: Option<Vec<u8>>,
    pub process_id: i32,
    pub thread_id: i32,
    pub timestamp: NaiveDateTime,
    pub color: Color,
}

impl LogEntry {
    /// Create an entry stamped with the current time, process and thread.
    pub fn new(entry_type: LogEntryType, viewer_id: ViewerId) -> Self {
        Self {
            entry_type,
            viewer_id,
            app_name: None,
            session_name: None,
            title: None,
            host_name: None,
            data: None,
            process_id: current_process_id(),
            thread_id: current_thread_id(),
            timestamp: now(),
            color: Color::DEFAULT,
        }
    }

    /// Convenience constructor for a plain titled message.
    pub fn message(title: impl Into<String>) -> Self {
        Self::new(LogEntryType::Message, ViewerId::Title).with_title(title)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub(crate) fn size(&self) -> usize {
        LOG_ENTRY_HEADER_SIZE
            + utf16_size(self.app_name.as_deref())
            + utf16_size(self.session_name.as_deref())
            + utf16_size(self.title.as_deref())
            + utf16_size(self.host_name.as_deref())
            + self.data.as_ref().map_or(0, Vec::len)
    }
}
