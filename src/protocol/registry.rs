//! Name-to-transport registry owned by the hosting application.

use std::collections::BTreeMap;

use crate::file::{FILE_OPTIONS, FileTransport};
use crate::memory::{MEMORY_OPTIONS, MemoryTransport};
use crate::options::OptionMap;
use crate::tcp::{TCP_OPTIONS, TcpTransport};

use super::config::{COMMON_OPTIONS, ProtocolConfig};
use super::{Protocol, ProtocolBuildError, ProtocolBuilder, Transport};

/// Builds a transport from its already-validated options.
pub type TransportFactory = fn(&OptionMap) -> Result<Box<dyn Transport>, ProtocolBuildError>;

struct Registration {
    options: &'static [&'static str],
    factory: TransportFactory,
}

/// Maps protocol names to transport factories.
///
/// ```
/// use tracewire::{OptionMap, ProtocolRegistry};
///
/// let registry = ProtocolRegistry::with_defaults();
/// let options = OptionMap::new().with("maxsize", "64");
/// let protocol = registry.build("mem", &options).expect("valid options");
/// assert_eq!(protocol.name(), "mem");
/// ```
#[derive(Default)]
pub struct ProtocolRegistry {
    entries: BTreeMap<String, Registration>,
}

impl ProtocolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `tcp`, `mem` and `file` transports.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("tcp", TCP_OPTIONS, |options| {
            Ok(Box::new(TcpTransport::from_options(options)?))
        });
        registry.register("mem", MEMORY_OPTIONS, |options| {
            Ok(Box::new(MemoryTransport::from_options(options)?))
        });
        registry.register("file", FILE_OPTIONS, |options| {
            Ok(Box::new(FileTransport::from_options(options)?))
        });
        registry
    }

    /// Register `name`, accepting `options` in addition to the common ones.
    /// Replaces any earlier registration under the same name.
    pub fn register(
        &mut self,
        name: &str,
        options: &'static [&'static str],
        factory: TransportFactory,
    ) {
        self.entries
            .insert(name.to_ascii_lowercase(), Registration { options, factory });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Validate `options` for `name` and prepare a builder.
    pub fn builder(
        &self,
        name: &str,
        options: &OptionMap,
    ) -> Result<ProtocolBuilder, ProtocolBuildError> {
        let name = name.to_ascii_lowercase();
        let registration = self
            .entries
            .get(&name)
            .ok_or_else(|| ProtocolBuildError::UnknownProtocol(name.clone()))?;
        options.ensure_known(&name, |key| {
            COMMON_OPTIONS.contains(&key) || registration.options.contains(&key)
        })?;
        let config = ProtocolConfig::from_options(&name, options)?;
        let transport = (registration.factory)(options)?;
        Ok(ProtocolBuilder::new(transport, config))
    }

    /// Shorthand for [`ProtocolRegistry::builder`] followed by `build`.
    pub fn build(&self, name: &str, options: &OptionMap) -> Result<Protocol, ProtocolBuildError> {
        Ok(self.builder(name, options)?.build())
    }
}

impl std::fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
