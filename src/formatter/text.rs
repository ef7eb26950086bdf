//! Plain-text formatter for `astext` transports.
//!
//! Only log entries have a textual form; every other packet compiles to an
//! empty payload and is skipped. Pattern-driven layouts belong to the text
//! rendering layer, so this formatter uses a single fixed layout.

use std::io::{self, Write};

use crate::packet::{Packet, PacketKind};

use super::{PacketFormatter, TEXT_BOM};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Renders log entries as `timestamp [LEVEL] title` lines.
#[derive(Debug, Default)]
pub struct TextFormatter {
    line: String,
}

impl PacketFormatter for TextFormatter {
    fn compile(&mut self, packet: &Packet) -> usize {
        self.line.clear();
        if let PacketKind::LogEntry(entry) = packet.kind() {
            self.line = format!(
                "{} [{}] {}\r\n",
                entry.timestamp.format(TIMESTAMP_FORMAT),
                packet.level(),
                entry.title.as_deref().unwrap_or_default()
            );
        }
        self.line.len()
    }

    fn write(&mut self, writer: &mut dyn Write) -> io::Result<()> {
        if self.line.is_empty() {
            return Ok(());
        }
        writer.write_all(self.line.as_bytes())
    }

    fn preamble(&self) -> &'static [u8] {
        &TEXT_BOM
    }
}
