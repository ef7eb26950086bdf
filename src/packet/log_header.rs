use super::utf16_size;

pub const LOG_HEADER_SIZE: usize = 4;

/// Session metadata sent once at the start of each connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogHeader {
    pub app_name: String,
    pub host_name: String,
}

impl LogHeader {
    pub fn new(app_name: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            host_name: host_name.into(),
        }
    }

    /// Key/value block the remote end parses, one `\r\n`-terminated line per field.
    pub fn content(&self) -> String {
        format!(
            "hostname={}\r\nappname={}\r\n",
            self.host_name, self.app_name
        )
    }

    pub(crate) fn size(&self) -> usize {
        LOG_HEADER_SIZE + utf16_size(Some(&self.content()))
    }
}
