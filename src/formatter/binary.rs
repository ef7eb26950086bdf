//! Binary wire formatter.
//!
//! Frames are `[type: u16 LE][payload length: u32 LE][payload]`. Every
//! integer inside a payload is a little-endian 32-bit value, timestamps are
//! little-endian `f64` OLE dates and strings are UTF-8 with their byte length
//! written in the fixed header part ahead of the blobs.

use std::io::{self, Write};

use crate::packet::{
    ControlCommand, LogEntry, LogHeader, Packet, PacketKind, PacketType, ProcessFlow, Watch,
};

use super::{BINARY_MAGIC, PacketFormatter, timestamp};

/// Bytes preceding every payload on the wire.
pub const FRAME_HEADER_SIZE: usize = 6;
/// Payloads above this size cause the compile buffer to be reallocated on
/// the next compile instead of being reused.
pub const MAX_RETAINED_CAPACITY: usize = 1024 * 1024;

const INITIAL_CAPACITY: usize = 1024;

/// Serialises packets into the binary frame format.
#[derive(Debug)]
pub struct BinaryFormatter {
    buffer: Vec<u8>,
    size: usize,
    packet_type: PacketType,
}

impl Default for BinaryFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryFormatter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(INITIAL_CAPACITY),
            size: 0,
            packet_type: PacketType::LogEntry,
        }
    }

    /// Current capacity of the compile buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    fn reset_buffer(&mut self) {
        if self.size > MAX_RETAINED_CAPACITY {
            self.buffer = Vec::with_capacity(INITIAL_CAPACITY);
        } else {
            self.buffer.clear();
        }
    }

    fn put_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn put_len(&mut self, bytes: Option<&[u8]>) {
        let len = bytes.map_or(0, <[u8]>::len);
        self.put_i32(i32::try_from(len).unwrap_or(i32::MAX));
    }

    fn put_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn put_bytes(&mut self, bytes: Option<&[u8]>) {
        if let Some(bytes) = bytes {
            self.buffer.extend_from_slice(bytes);
        }
    }

    fn compile_log_entry(&mut self, entry: &LogEntry) {
        let app = entry.app_name.as_deref().map(str::as_bytes);
        let session = entry.session_name.as_deref().map(str::as_bytes);
        let title = entry.title.as_deref().map(str::as_bytes);
        let host = entry.host_name.as_deref().map(str::as_bytes);
        let data = entry.data.as_deref();

        self.put_i32(entry.entry_type as i32);
        self.put_i32(entry.viewer_id as i32);
        self.put_len(app);
        self.put_len(session);
        self.put_len(title);
        self.put_len(host);
        self.put_len(data);
        self.put_i32(entry.process_id);
        self.put_i32(entry.thread_id);
        self.put_f64(timestamp::encode(entry.timestamp));
        self.put_u32(entry.color.packed());

        self.put_bytes(app);
        self.put_bytes(session);
        self.put_bytes(title);
        self.put_bytes(host);
        self.put_bytes(data);
    }

    fn compile_watch(&mut self, watch: &Watch) {
        let name = watch.name.as_deref().map(str::as_bytes);
        let value = watch.value.as_deref().map(str::as_bytes);

        self.put_len(name);
        self.put_len(value);
        self.put_i32(watch.watch_type as i32);
        self.put_f64(timestamp::encode(watch.timestamp));

        self.put_bytes(name);
        self.put_bytes(value);
    }

    fn compile_process_flow(&mut self, flow: &ProcessFlow) {
        let title = flow.title.as_deref().map(str::as_bytes);
        let host = flow.host_name.as_deref().map(str::as_bytes);

        self.put_i32(flow.flow_type as i32);
        self.put_len(title);
        self.put_len(host);
        self.put_i32(flow.process_id);
        self.put_i32(flow.thread_id);
        self.put_f64(timestamp::encode(flow.timestamp));

        self.put_bytes(title);
        self.put_bytes(host);
    }

    fn compile_control_command(&mut self, command: &ControlCommand) {
        let data = command.data.as_deref();
        self.put_i32(command.command_type as i32);
        self.put_len(data);
        self.put_bytes(data);
    }

    fn compile_log_header(&mut self, header: &LogHeader) {
        let content = header.content();
        self.put_len(Some(content.as_bytes()));
        self.put_bytes(Some(content.as_bytes()));
    }
}

impl PacketFormatter for BinaryFormatter {
    fn compile(&mut self, packet: &Packet) -> usize {
        self.reset_buffer();
        match packet.kind() {
            PacketKind::LogEntry(entry) => self.compile_log_entry(entry),
            PacketKind::Watch(watch) => self.compile_watch(watch),
            PacketKind::ProcessFlow(flow) => self.compile_process_flow(flow),
            PacketKind::ControlCommand(command) => self.compile_control_command(command),
            PacketKind::LogHeader(header) => self.compile_log_header(header),
        }
        self.packet_type = packet.packet_type();
        self.size = self.buffer.len();
        self.size
    }

    fn write(&mut self, writer: &mut dyn Write) -> io::Result<()> {
        if self.size == 0 {
            return Ok(());
        }
        let len = u32::try_from(self.size).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "payload exceeds frame limit")
        })?;
        let mut header = [0u8; FRAME_HEADER_SIZE];
        header[..2].copy_from_slice(&self.packet_type.code().to_le_bytes());
        header[2..].copy_from_slice(&len.to_le_bytes());
        writer.write_all(&header)?;
        writer.write_all(&self.buffer)
    }

    fn preamble(&self) -> &'static [u8] {
        &BINARY_MAGIC
    }
}
