//! TCP transport speaking the console wire protocol.
//!
//! A connection starts with a banner exchange: the console sends a
//! newline-terminated banner, the client answers with its own. Every packet
//! after that is a half-duplex exchange of one binary frame followed by a
//! two-byte acknowledgement.


use std::io::{self, BufWriter, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;

use crate::formatter::{BinaryFormatter, PacketFormatter};
use crate::options::OptionMap;
use crate::packet::Packet;
use crate::protocol::{ProtocolBuildError, Transport, TransportFailure};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4228;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options accepted by the `tcp` protocol besides the common ones.
pub const TCP_OPTIONS: &[&str] = &["host", "port", "timeout"];

const WRITE_BUFFER_SIZE: usize = 8192;
const ACK_SIZE: usize = 2;

/// Banner sent to the console after its own banner arrives.
pub fn client_banner() -> String {
    format!("tracewire Rust Library v{}\n", env!("CARGO_PKG_VERSION"))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpConfig {
    pub host: String,
    pub port: u16,
    /// Connect timeout, also applied to socket reads and writes. Zero
    /// disables it.
    pub timeout: Duration,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TcpConfig {
    pub fn from_options(options: &OptionMap) -> Result<Self, ProtocolBuildError> {
        let port = options.get_integer("port", i64::from(DEFAULT_PORT))?;
        let port = u16::try_from(port).map_err(|_| ProtocolBuildError::InvalidValue {
            option: "port".to_owned(),
            value: port.to_string(),
            expected: "a port number between 0 and 65535",
        })?;
        Ok(Self {
            host: options.get_string("host", DEFAULT_HOST),
            port,
            timeout: options.get_timespan("timeout", DEFAULT_TIMEOUT)?,
        })
    }

    fn socket_timeout(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }
}

struct Connection {
    writer: BufWriter<TcpStream>,
    reader: TcpStream,
}

pub struct TcpTransport {
    config: TcpConfig,
    formatter: BinaryFormatter,
    connection: Option<Connection>,
}

impl TcpTransport {
    pub fn new(config: TcpConfig) -> Self {
        Self {
            config,
            formatter: BinaryFormatter::new(),
            connection: None,
        }
    }

    pub fn from_options(options: &OptionMap) -> Result<Self, ProtocolBuildError> {
        Ok(Self::new(TcpConfig::from_options(options)?))
    }

    pub fn config(&self) -> &TcpConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

impl Transport for TcpTransport {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn connect(&mut self) -> Result<(), TransportFailure> {
        self.connection = None;
        let stream = connect_tcp(&self.config)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.config.socket_timeout())?;
        stream.set_write_timeout(self.config.socket_timeout())?;

        let mut reader = stream.try_clone()?;
        let banner = read_banner(&mut reader)?;
        debug!(
            "tcp: connected to {}:{} ({banner})",
            self.config.host, self.config.port
        );

        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, stream);
        writer.write_all(client_banner().as_bytes())?;
        writer.flush()?;
        self.connection = Some(Connection { writer, reader });
        Ok(())
    }

    fn write_packet(&mut self, packet: Packet) -> Result<(), TransportFailure> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(TransportFailure::NotConnected)?;
        self.formatter.format(&packet, &mut connection.writer)?;
        connection.writer.flush()?;
        read_ack(&mut connection.reader)
    }

    fn disconnect(&mut self) -> Result<(), TransportFailure> {
        if let Some(mut connection) = self.connection.take() {
            let _ = connection.writer.flush();
            let _ = connection.reader.shutdown(Shutdown::Both);
        }
        Ok(())
    }

    fn writes_log_header(&self) -> bool {
        true
    }
}

/// Try every resolved address in turn. A timeout is reported separately
/// from socket errors.
fn connect_tcp(config: &TcpConfig) -> Result<TcpStream, TransportFailure> {
    let addrs: Vec<SocketAddr> = (config.host.as_str(), config.port)
        .to_socket_addrs()?
        .collect();
    let mut last_failure = None;
    for addr in addrs {
        let attempt = match config.socket_timeout() {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_failure = Some(connect_failure(err, addr, config.timeout)),
        }
    }
    Err(last_failure.unwrap_or_else(|| TransportFailure::Unresolved {
        host: config.host.clone(),
        port: config.port,
    }))
}

fn connect_failure(err: io::Error, addr: SocketAddr, timeout: Duration) -> TransportFailure {
    if err.kind() == io::ErrorKind::TimedOut {
        TransportFailure::ConnectTimeout { addr, timeout }
    } else {
        TransportFailure::Io(err)
    }
}

/// Read the console banner one byte at a time up to the newline.
fn read_banner(reader: &mut impl Read) -> Result<String, TransportFailure> {
    let mut banner = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Err(TransportFailure::HandshakeClosed),
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => banner.push(byte[0]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(String::from_utf8_lossy(&banner)
        .trim_end_matches('\r')
        .to_owned())
}

/// Wait for the two acknowledgement bytes. Their value is not checked.
fn read_ack(reader: &mut impl Read) -> Result<(), TransportFailure> {
    let mut ack = [0u8; ACK_SIZE];
    let mut received = 0;
    while received < ACK_SIZE {
        match reader.read(&mut ack[received..]) {
            Ok(0) => return Err(TransportFailure::ShortAck(received)),
            Ok(n) => received += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
