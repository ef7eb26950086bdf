//! Error types and the error notification channel.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;

/// Invalid protocol configuration, raised while building a protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolBuildError {
    #[error("protocol \"{0}\" is not registered")]
    UnknownProtocol(String),
    #[error("option \"{option}\" is not available for protocol \"{protocol}\"")]
    UnknownOption { protocol: String, option: String },
    #[error("option \"{option}\" has invalid value \"{value}\": expected {expected}")]
    InvalidValue {
        option: String,
        value: String,
        expected: &'static str,
    },
}

/// Low-level reason a transport operation failed.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: SocketAddr, timeout: Duration },
    #[error("no address found for {host}:{port}")]
    Unresolved { host: String, port: u16 },
    #[error("remote end closed the connection during the handshake")]
    HandshakeClosed,
    #[error("acknowledgement truncated: expected 2 bytes, received {0}")]
    ShortAck(usize),
    #[error("transport is not connected")]
    NotConnected,
}

/// Error notification raised when a protocol operation fails.
///
/// Carries the protocol caption and its options so a listener can tell
/// several configured protocols apart.
#[derive(Debug, Error)]
#[error("{protocol} protocol failed ({options}): {source}")]
pub struct ProtocolError {
    pub protocol: String,
    pub options: String,
    #[source]
    pub source: TransportFailure,
}

impl ProtocolError {
    pub fn new(
        protocol: impl Into<String>,
        options: impl Into<String>,
        source: TransportFailure,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            options: options.into(),
            source,
        }
    }
}

/// Callback receiving error notifications. Listeners run on whichever thread
/// executed the failing operation, which is the scheduler worker for
/// asynchronous protocols.
pub type ErrorListener = Arc<dyn Fn(&ProtocolError) + Send + Sync>;

/// Shared, growable set of error listeners.
#[derive(Clone, Default)]
pub struct ErrorListeners {
    inner: Arc<RwLock<Vec<ErrorListener>>>,
}

impl ErrorListeners {
    pub fn add(&self, listener: ErrorListener) {
        self.inner.write().push(listener);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn notify(&self, error: &ProtocolError) {
        // Listeners may register further listeners.
        let listeners = self.inner.read().clone();
        for listener in &listeners {
            listener(error);
        }
    }
}

impl std::fmt::Debug for ErrorListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorListeners")
            .field("len", &self.len())
            .finish()
    }
}
