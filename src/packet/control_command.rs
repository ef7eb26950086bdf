pub const CONTROL_COMMAND_HEADER_SIZE: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ControlCommandType {
    ClearLog = 0,
    ClearWatches = 1,
    ClearAutoViews = 2,
    ClearAll = 3,
    ClearProcessFlow = 4,
}

/// Administrative instruction for the viewer.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlCommand {
    pub command_type: ControlCommandType,
    pub data: Option<Vec<u8>>,
}

impl ControlCommand {
    pub fn new(command_type: ControlCommandType) -> Self {
        Self {
            command_type,
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub(crate) fn size(&self) -> usize {
        CONTROL_COMMAND_HEADER_SIZE + self.data.as_ref().map_or(0, Vec::len)
    }
}
