//! Tests for the protocol lifecycle, delivery modes and registry.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use rstest::rstest;
use serial_test::serial;

use super::*;
use crate::options::OptionMap;
use crate::packet::{ControlCommand, ControlCommandType, LogEntry, PacketKind};

type Events = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct Script {
    fail_connect: bool,
    fail_writes: bool,
    fail_dispatch: bool,
}

/// Transport recording every call, with scripted failures and an optional
/// gate that holds each write until released.
struct Mock {
    events: Events,
    script: Arc<Mutex<Script>>,
    header: bool,
    gate: Option<(Sender<()>, Receiver<()>)>,
}

impl Transport for Mock {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn connect(&mut self) -> Result<(), TransportFailure> {
        self.events.lock().push("connect".to_owned());
        if self.script.lock().fail_connect {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into());
        }
        Ok(())
    }

    fn write_packet(&mut self, packet: Packet) -> Result<(), TransportFailure> {
        let label = match packet.kind() {
            PacketKind::LogEntry(entry) => {
                format!("write:{}", entry.title.as_deref().unwrap_or_default())
            }
            PacketKind::LogHeader(header) => format!("header:{}", header.app_name),
            _ => "write:control".to_owned(),
        };
        if let Some((started, gate)) = &self.gate
            && label.starts_with("write:")
        {
            let _ = started.send(());
            let _ = gate.recv_timeout(Duration::from_secs(5));
        }
        self.events.lock().push(label);
        if self.script.lock().fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe").into());
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportFailure> {
        self.events.lock().push("disconnect".to_owned());
        Ok(())
    }

    fn dispatch(&mut self, command: DispatchCommand) -> Result<(), TransportFailure> {
        self.events.lock().push(format!("dispatch:{}", command.action()));
        if self.script.lock().fail_dispatch {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "bad dispatch").into());
        }
        Ok(())
    }

    fn writes_log_header(&self) -> bool {
        self.header
    }
}

struct Fixture {
    events: Events,
    script: Arc<Mutex<Script>>,
    errors: Receiver<ProtocolError>,
    started: Receiver<()>,
    gate: Sender<()>,
}

impl Fixture {
    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn error_count(&self) -> usize {
        self.errors.try_iter().count()
    }
}

fn build(options: OptionMap, header: bool, gated: bool) -> (Protocol, Fixture) {
    let events: Events = Arc::default();
    let script: Arc<Mutex<Script>> = Arc::default();
    let (started_tx, started_rx) = unbounded();
    let (gate_tx, gate_rx) = unbounded();
    let (error_tx, error_rx) = unbounded();
    let mock = Mock {
        events: Arc::clone(&events),
        script: Arc::clone(&script),
        header,
        gate: gated.then_some((started_tx, gate_rx)),
    };
    let config = ProtocolConfig::from_options("mock", &options).expect("valid options");
    let protocol = ProtocolBuilder::new(Box::new(mock), config)
        .with_app_name("app")
        .with_host_name("host")
        .with_error_listener(Arc::new(move |error: &ProtocolError| {
            let copy = ProtocolError::new(
                error.protocol.clone(),
                error.options.clone(),
                TransportFailure::Io(io::Error::other(error.source.to_string())),
            );
            let _ = error_tx.send(copy);
        }))
        .build();
    let fixture = Fixture {
        events,
        script,
        errors: error_rx,
        started: started_rx,
        gate: gate_tx,
    };
    (protocol, fixture)
}

fn entry(title: &str, level: Level) -> Packet {
    Packet::from(LogEntry::message(title)).with_level(level)
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[rstest]
fn synchronous_operations_run_in_place() {
    let (protocol, fixture) = build(OptionMap::new(), false, false);
    assert!(!protocol.is_asynchronous());
    protocol.connect();
    protocol.write_packet(entry("a", Level::Message));
    protocol.dispatch(DispatchCommand::new(7));
    protocol.disconnect();
    assert_eq!(
        fixture.events(),
        strings(&["connect", "write:a", "dispatch:7", "disconnect"])
    );
    assert!(!protocol.is_failed());
}

#[rstest]
fn log_header_follows_connect() {
    let (protocol, fixture) = build(OptionMap::new(), true, false);
    protocol.connect();
    protocol.write_packet(entry("a", Level::Message));
    assert_eq!(
        fixture.events(),
        strings(&["connect", "header:app", "write:a"])
    );
}

#[rstest]
fn packets_below_level_are_filtered() {
    let options = OptionMap::new().with("level", "warning");
    let (protocol, fixture) = build(options, false, false);
    protocol.connect();
    protocol.write_packet(entry("quiet", Level::Message));
    protocol.write_packet(entry("loud", Level::Error));
    protocol.write_packet(Packet::from(ControlCommand::new(ControlCommandType::ClearAll)));
    assert_eq!(
        fixture.events(),
        strings(&["connect", "write:loud", "write:control"])
    );
}

#[rstest]
fn dispatch_needs_a_connection() {
    let (protocol, fixture) = build(OptionMap::new(), false, false);
    protocol.dispatch(DispatchCommand::new(1));
    assert!(fixture.events().is_empty());
}

#[rstest]
fn connect_failure_is_reported_and_flagged() {
    let options = OptionMap::new().with("caption", "viewer");
    let (protocol, fixture) = build(options, false, false);
    fixture.script.lock().fail_connect = true;

    protocol.connect();
    assert!(protocol.is_failed());
    let error = fixture.errors.try_recv().expect("error notification");
    assert_eq!(error.protocol, "viewer");
    assert_eq!(error.options, "caption=\"viewer\"");
    assert!(error.to_string().contains("refused"));

    protocol.write_packet(entry("dropped", Level::Error));
    assert_eq!(fixture.events(), strings(&["connect"]));
}

#[rstest]
fn write_failure_closes_the_connection() {
    let (protocol, fixture) = build(OptionMap::new(), false, false);
    protocol.connect();
    fixture.script.lock().fail_writes = true;

    protocol.write_packet(entry("a", Level::Message));
    assert!(protocol.is_failed());
    assert_eq!(fixture.error_count(), 1);

    protocol.write_packet(entry("b", Level::Message));
    assert_eq!(
        fixture.events(),
        strings(&["connect", "write:a", "disconnect"])
    );
}

#[rstest]
fn reconnect_recovers_silently() {
    let options = OptionMap::new().with("reconnect", "true");
    let (protocol, fixture) = build(options, false, false);
    fixture.script.lock().fail_connect = true;
    protocol.connect();
    assert_eq!(fixture.error_count(), 1);

    protocol.write_packet(entry("missed", Level::Message));
    assert_eq!(fixture.error_count(), 0, "failed reconnects are silent");

    fixture.script.lock().fail_connect = false;
    protocol.write_packet(entry("delivered", Level::Message));
    assert!(!protocol.is_failed());
    assert_eq!(
        fixture.events(),
        strings(&["connect", "connect", "connect", "write:delivered"])
    );
}

#[rstest]
fn reconnect_interval_limits_attempts() {
    let options = OptionMap::new()
        .with("reconnect", "true")
        .with("reconnect.interval", "1h");
    let (protocol, fixture) = build(options, false, false);
    fixture.script.lock().fail_connect = true;
    protocol.connect();
    fixture.script.lock().fail_connect = false;

    protocol.write_packet(entry("too soon", Level::Message));
    assert_eq!(fixture.events(), strings(&["connect"]));
}

#[rstest]
fn reconnect_attempts_are_bounded() {
    let options = OptionMap::new()
        .with("reconnect", "true")
        .with("reconnect.attempts", "2");
    let (protocol, fixture) = build(options, false, false);
    fixture.script.lock().fail_connect = true;
    protocol.connect();
    for _ in 0..3 {
        protocol.write_packet(entry("x", Level::Message));
    }
    assert_eq!(
        fixture.events(),
        strings(&["connect", "connect", "connect"])
    );
}

#[rstest]
fn broken_write_does_not_use_a_reconnect_attempt() {
    let options = OptionMap::new()
        .with("reconnect", "true")
        .with("reconnect.attempts", "1");
    let (protocol, fixture) = build(options, false, false);
    protocol.connect();
    fixture.script.lock().fail_writes = true;
    protocol.write_packet(entry("broken", Level::Message));
    fixture.script.lock().fail_writes = false;

    protocol.write_packet(entry("after", Level::Message));
    assert!(!protocol.is_failed());
    assert_eq!(
        fixture.events(),
        strings(&["connect", "write:broken", "disconnect", "connect", "write:after"])
    );
}

#[rstest]
fn dispatch_failure_is_reported_but_keeps_the_connection() {
    let (protocol, fixture) = build(OptionMap::new(), false, false);
    protocol.connect();
    fixture.script.lock().fail_dispatch = true;

    protocol.dispatch(DispatchCommand::new(3));
    assert_eq!(fixture.error_count(), 1);
    assert!(!protocol.is_failed());

    protocol.write_packet(entry("still open", Level::Message));
    assert_eq!(
        fixture.events(),
        strings(&["connect", "dispatch:3", "write:still open"])
    );
}

#[rstest]
fn listeners_may_register_listeners_while_notified() {
    let (protocol, fixture) = build(OptionMap::new(), false, false);
    fixture.script.lock().fail_connect = true;
    let protocol = Arc::new(protocol);
    let weak = Arc::downgrade(&protocol);
    protocol.add_error_listener(Arc::new(move |_: &ProtocolError| {
        if let Some(protocol) = weak.upgrade() {
            protocol.add_error_listener(Arc::new(|_: &ProtocolError| {}));
        }
    }));

    let (done_tx, done_rx) = unbounded();
    let worker = {
        let protocol = Arc::clone(&protocol);
        thread::spawn(move || {
            protocol.connect();
            let _ = done_tx.send(());
        })
    };
    assert!(
        done_rx.recv_timeout(Duration::from_secs(3)).is_ok(),
        "connect blocked inside the error listener"
    );
    worker.join().expect("connect thread");
    assert_eq!(fixture.error_count(), 1);
}

#[rstest]
fn backlog_flushes_on_urgent_packet() {
    let options = OptionMap::new().with("backlog.enabled", "true");
    let (protocol, fixture) = build(options, false, false);
    protocol.connect();
    protocol.write_packet(entry("a", Level::Debug));
    protocol.write_packet(entry("b", Level::Warning));
    assert!(fixture.events().is_empty(), "held until an error arrives");

    protocol.write_packet(entry("c", Level::Error));
    assert_eq!(
        fixture.events(),
        strings(&["connect", "write:a", "write:b", "write:c", "disconnect"])
    );
}

#[rstest]
fn backlog_keep_open_stays_connected() {
    let options = OptionMap::new()
        .with("backlog.enabled", "true")
        .with("backlog.keepopen", "true")
        .with("backlog.flushon", "fatal");
    let (protocol, fixture) = build(options, false, false);
    protocol.connect();
    protocol.write_packet(entry("a", Level::Error));
    protocol.write_packet(entry("b", Level::Fatal));
    protocol.write_packet(entry("c", Level::Fatal));
    assert_eq!(
        fixture.events(),
        strings(&["connect", "write:a", "write:b", "write:c"])
    );
}

#[rstest]
fn disconnect_discards_the_backlog() {
    let options = OptionMap::new()
        .with("backlog.enabled", "true")
        .with("backlog.keepopen", "true");
    let (protocol, fixture) = build(options, false, false);
    protocol.connect();
    protocol.write_packet(entry("stale", Level::Message));
    protocol.disconnect();
    protocol.connect();
    protocol.write_packet(entry("urgent", Level::Error));
    assert_eq!(
        fixture.events(),
        strings(&["connect", "disconnect", "connect", "write:urgent"])
    );
}

#[rstest]
fn asynchronous_mode_preserves_order() {
    let options = OptionMap::new().with("async.enabled", "true");
    let (protocol, fixture) = build(options, false, false);
    assert!(protocol.is_asynchronous());
    protocol.connect();
    for title in ["a", "b", "c"] {
        protocol.write_packet(entry(title, Level::Message));
    }
    protocol.dispatch(DispatchCommand::new(3));
    protocol.disconnect();
    assert_eq!(
        fixture.events(),
        strings(&["connect", "write:a", "write:b", "write:c", "dispatch:3", "disconnect"])
    );
    assert_eq!(protocol.pending(), 0);
}

#[rstest]
fn asynchronous_protocol_reconnects_after_disconnect() {
    let options = OptionMap::new().with("async.enabled", "true");
    let (protocol, fixture) = build(options, false, false);
    protocol.connect();
    protocol.disconnect();
    protocol.connect();
    protocol.write_packet(entry("again", Level::Message));
    protocol.disconnect();
    assert_eq!(
        fixture.events(),
        strings(&["connect", "disconnect", "connect", "write:again", "disconnect"])
    );
}

#[rstest]
fn clear_on_disconnect_discards_queued_writes() {
    let options = OptionMap::new()
        .with("async.enabled", "true")
        .with("async.clearondisconnect", "true");
    let (protocol, fixture) = build(options, false, true);
    let protocol = Arc::new(protocol);
    protocol.connect();
    protocol.write_packet(entry("a", Level::Message));
    fixture
        .started
        .recv_timeout(Duration::from_secs(2))
        .expect("worker is writing");
    protocol.write_packet(entry("b", Level::Message));
    protocol.write_packet(entry("c", Level::Message));
    assert_eq!(protocol.pending(), 2);

    let closer = {
        let protocol = Arc::clone(&protocol);
        thread::spawn(move || protocol.disconnect())
    };
    while protocol.pending() != 1 {
        thread::yield_now();
    }
    fixture.gate.send(()).expect("release write");
    closer.join().expect("closer thread");

    assert_eq!(
        fixture.events(),
        strings(&["connect", "write:a", "disconnect"])
    );
}

#[rstest]
fn drop_disconnects() {
    let (protocol, fixture) = build(OptionMap::new(), false, false);
    protocol.connect();
    drop(protocol);
    assert_eq!(fixture.events(), strings(&["connect", "disconnect"]));
}

#[rstest]
#[serial]
fn failures_are_logged_with_caption() {
    let mut logger = crate::test_utils::logging::start_logger();
    let options = OptionMap::new().with("caption", "logged-mock");
    let (protocol, fixture) = build(options, false, false);
    fixture.script.lock().fail_connect = true;
    protocol.connect();

    let mut found = false;
    while let Some(record) = logger.pop() {
        if record.level() == log::Level::Warn && record.args().contains("logged-mock protocol failed")
        {
            found = true;
        }
    }
    assert!(found, "expected a warning naming the protocol");
}

#[rstest]
fn default_registry_knows_builtin_protocols() {
    let registry = ProtocolRegistry::with_defaults();
    for name in ["tcp", "mem", "file", "TCP"] {
        assert!(registry.contains(name), "{name} should be registered");
    }
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["file", "mem", "tcp"]);
}

#[rstest]
fn registry_rejects_unknown_protocols_and_options() {
    let registry = ProtocolRegistry::with_defaults();
    assert_eq!(
        registry.build("pipe", &OptionMap::new()).map(|_| ()),
        Err(ProtocolBuildError::UnknownProtocol("pipe".to_owned()))
    );
    let options = OptionMap::new().with("maxsize", "64");
    let err = registry
        .build("tcp", &options)
        .map(|_| ())
        .expect_err("maxsize belongs to mem");
    assert_eq!(
        err.to_string(),
        "option \"maxsize\" is not available for protocol \"tcp\""
    );
}

#[rstest]
fn registry_applies_common_options() {
    let registry = ProtocolRegistry::with_defaults();
    let options = OptionMap::new()
        .with("caption", "ring")
        .with("level", "error")
        .with("async.enabled", "true");
    let protocol = registry.build("mem", &options).expect("valid options");
    assert_eq!(protocol.name(), "mem");
    assert_eq!(protocol.caption(), "ring");
    assert_eq!(protocol.level(), Level::Error);
    assert!(protocol.is_asynchronous());
}

#[rstest]
fn custom_transports_can_be_registered() {
    fn factory(_: &OptionMap) -> Result<Box<dyn Transport>, ProtocolBuildError> {
        Ok(Box::new(Mock {
            events: Arc::default(),
            script: Arc::default(),
            header: false,
            gate: None,
        }))
    }
    let mut registry = ProtocolRegistry::new();
    registry.register("mock", &["target"], factory);
    let options = OptionMap::new().with("target", "anywhere");
    let protocol = registry.build("mock", &options).expect("custom option accepted");
    assert_eq!(protocol.name(), "mock");
}
