//! Minimal console stand-in for TCP tests.
//!
//! Accepts a fixed number of connections one after another. For each it
//! sends [`CONSOLE_BANNER`], reads the client banner, then acknowledges
//! every frame with two zero bytes until the client disconnects.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};

pub const CONSOLE_BANNER: &str = "console v1.0\n";

const WAIT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub packet_type: u16,
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleEvent {
    Banner(String),
    Frame(Frame),
    Closed,
}

pub struct FakeConsole {
    pub addr: SocketAddr,
    events: Receiver<ConsoleEvent>,
}

impl FakeConsole {
    pub fn spawn(connections: usize) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
        let addr = listener.local_addr().expect("listener has address");
        let (tx, events) = unbounded();
        thread::spawn(move || {
            for _ in 0..connections {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                serve(stream, &tx);
            }
        });
        Self { addr, events }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn next_event(&self) -> ConsoleEvent {
        self.events.recv_timeout(WAIT).expect("console event")
    }

    pub fn expect_banner(&self) -> String {
        match self.next_event() {
            ConsoleEvent::Banner(banner) => banner,
            other => panic!("expected client banner, got {other:?}"),
        }
    }

    pub fn expect_frame(&self) -> Frame {
        match self.next_event() {
            ConsoleEvent::Frame(frame) => frame,
            other => panic!("expected frame, got {other:?}"),
        }
    }

    pub fn expect_closed(&self) {
        assert_eq!(self.next_event(), ConsoleEvent::Closed);
    }

    /// Whether nothing arrives within `wait`.
    pub fn is_quiet(&self, wait: Duration) -> bool {
        self.events.recv_timeout(wait).is_err()
    }
}

fn serve(mut stream: std::net::TcpStream, tx: &Sender<ConsoleEvent>) {
    if stream.write_all(CONSOLE_BANNER.as_bytes()).is_err() {
        return;
    }
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut banner = String::new();
    if reader.read_line(&mut banner).is_err() {
        return;
    }
    let _ = tx.send(ConsoleEvent::Banner(banner));

    loop {
        let mut header = [0u8; 6];
        if reader.read_exact(&mut header).is_err() {
            break;
        }
        let packet_type = u16::from_le_bytes([header[0], header[1]]);
        let len = u32::from_le_bytes([header[2], header[3], header[4], header[5]]) as usize;
        let mut payload = vec![0u8; len];
        if reader.read_exact(&mut payload).is_err() {
            break;
        }
        let _ = tx.send(ConsoleEvent::Frame(Frame {
            packet_type,
            payload,
        }));
        if stream.write_all(&[0, 0]).is_err() {
            break;
        }
    }
    let _ = tx.send(ConsoleEvent::Closed);
}
