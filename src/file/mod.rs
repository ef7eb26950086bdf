//! File transport writing formatted packets to a log file.


use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use log::debug;

use crate::formatter::{self, PacketFormatter};
use crate::options::OptionMap;
use crate::packet::Packet;
use crate::protocol::{ProtocolBuildError, Transport, TransportFailure};

pub const DEFAULT_FILENAME: &str = "log.sil";

/// Options accepted by the `file` protocol besides the common ones.
pub const FILE_OPTIONS: &[&str] = &["filename", "append", "buffer", "astext", "pattern", "indent"];

const UNBUFFERED_CAPACITY: usize = 8192;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileConfig {
    pub filename: PathBuf,
    /// Append to an existing file instead of truncating it.
    pub append: bool,
    /// Write buffer in bytes. Zero flushes after every packet.
    pub buffer: usize,
    pub as_text: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            filename: PathBuf::from(DEFAULT_FILENAME),
            append: false,
            buffer: 0,
            as_text: false,
        }
    }
}

impl FileConfig {
    pub fn from_options(options: &OptionMap) -> Result<Self, ProtocolBuildError> {
        Ok(Self {
            filename: PathBuf::from(options.get_string("filename", DEFAULT_FILENAME)),
            append: options.get_bool("append", false)?,
            buffer: options.get_size("buffer", 0)?,
            as_text: options.get_bool("astext", false)?,
        })
    }
}

pub struct FileTransport {
    config: FileConfig,
    formatter: Box<dyn PacketFormatter>,
    writer: Option<BufWriter<File>>,
}

impl FileTransport {
    pub fn new(config: FileConfig) -> Self {
        Self {
            formatter: formatter::for_mode(config.as_text),
            config,
            writer: None,
        }
    }

    pub fn from_options(options: &OptionMap) -> Result<Self, ProtocolBuildError> {
        Ok(Self::new(FileConfig::from_options(options)?))
    }

    pub fn config(&self) -> &FileConfig {
        &self.config
    }
}

impl Transport for FileTransport {
    fn name(&self) -> &'static str {
        "file"
    }

    /// Open the file and write the format preamble when it is empty.
    fn connect(&mut self) -> Result<(), TransportFailure> {
        self.writer = None;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.config.append)
            .truncate(!self.config.append)
            .open(&self.config.filename)?;
        let is_empty = file.metadata()?.len() == 0;
        let capacity = match self.config.buffer {
            0 => UNBUFFERED_CAPACITY,
            bytes => bytes,
        };
        let mut writer = BufWriter::with_capacity(capacity, file);
        if is_empty {
            writer.write_all(self.formatter.preamble())?;
            writer.flush()?;
        }
        debug!("file: opened {}", self.config.filename.display());
        self.writer = Some(writer);
        Ok(())
    }

    fn write_packet(&mut self, packet: Packet) -> Result<(), TransportFailure> {
        let writer = self.writer.as_mut().ok_or(TransportFailure::NotConnected)?;
        self.formatter.format(&packet, writer)?;
        if self.config.buffer == 0 {
            writer.flush()?;
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportFailure> {
        match self.writer.take() {
            Some(mut writer) => Ok(writer.flush()?),
            None => Ok(()),
        }
    }
}
