//! Helpers shared by the integration tests.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, unbounded};
use parking_lot::Mutex;

/// Cloneable `Write` sink for capturing flushed output.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().clone()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One decoded wire frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub packet_type: u16,
    pub payload: Vec<u8>,
}

/// Split a byte stream into frames.
pub fn parse_frames(mut bytes: &[u8]) -> Vec<Frame> {
    let mut frames = Vec::new();
    while bytes.len() >= 6 {
        let packet_type = u16::from_le_bytes([bytes[0], bytes[1]]);
        let len = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) as usize;
        frames.push(Frame {
            packet_type,
            payload: bytes[6..6 + len].to_vec(),
        });
        bytes = &bytes[6 + len..];
    }
    frames
}

/// Console stand-in accepting a single connection. Every received frame is
/// acknowledged and forwarded on the returned channel, which closes when
/// the client disconnects.
pub fn spawn_console() -> (SocketAddr, Receiver<Frame>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("listener has address");
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let _ = serve(stream, |frame| {
            let _ = tx.send(frame);
        });
    });
    (addr, rx)
}

fn serve(mut stream: TcpStream, mut on_frame: impl FnMut(Frame)) -> io::Result<()> {
    stream.write_all(b"console v1.0\n")?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut banner = String::new();
    reader.read_line(&mut banner)?;
    loop {
        let mut header = [0u8; 6];
        reader.read_exact(&mut header)?;
        let len = u32::from_le_bytes([header[2], header[3], header[4], header[5]]) as usize;
        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload)?;
        on_frame(Frame {
            packet_type: u16::from_le_bytes([header[0], header[1]]),
            payload,
        });
        stream.write_all(&[0, 0])?;
    }
}
