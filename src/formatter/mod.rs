//! Packet formatters.
//!
//! A formatter turns a [`Packet`](crate::packet::Packet) into bytes in two
//! steps: [`PacketFormatter::compile`] renders the payload into an internal
//! buffer and reports its size, and [`PacketFormatter::write`] emits it to a
//! stream. Transports that write the same packet to several places compile
//! once and write repeatedly.

mod binary;
mod text;
pub mod timestamp;


use std::io::{self, Write};

pub use binary::{BinaryFormatter, FRAME_HEADER_SIZE, MAX_RETAINED_CAPACITY};
pub use text::TextFormatter;

use crate::packet::Packet;

/// Marker written at the start of binary log streams.
pub const BINARY_MAGIC: [u8; 4] = *b"SILF";
/// UTF-8 byte order mark written at the start of text log streams.
pub const TEXT_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// Two-step packet serialiser.
pub trait PacketFormatter: Send {
    /// Render `packet` into the internal buffer and return the payload size.
    ///
    /// A size of zero means the formatter has nothing to emit for this packet.
    fn compile(&mut self, packet: &Packet) -> usize;

    /// Emit the most recently compiled packet. Writes nothing when the last
    /// compile returned zero.
    fn write(&mut self, writer: &mut dyn Write) -> io::Result<()>;

    /// Compile then write.
    fn format(&mut self, packet: &Packet, writer: &mut dyn Write) -> io::Result<()> {
        self.compile(packet);
        self.write(writer)
    }

    /// Stream preamble identifying the format.
    fn preamble(&self) -> &'static [u8];
}

/// Build the formatter selected by an `astext` option.
pub fn for_mode(as_text: bool) -> Box<dyn PacketFormatter> {
    if as_text {
        Box::new(TextFormatter::default())
    } else {
        Box::new(BinaryFormatter::new())
    }
}
