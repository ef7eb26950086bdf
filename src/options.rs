//! Typed access to protocol option maps.
//!
//! Option maps arrive already parsed from a connection string: a flat set of
//! lower-cased keys with string values. This module converts the values a
//! protocol cares about into typed settings, falling back to defaults for
//! keys that are absent.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::level::Level;
use crate::protocol::ProtocolBuildError;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Case-insensitive string-keyed option map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionMap {
    values: BTreeMap<String, String>,
}

impl OptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(key.as_ref().trim().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reject any key not accepted by `is_known`.
    pub fn ensure_known(
        &self,
        protocol: &str,
        is_known: impl Fn(&str) -> bool,
    ) -> Result<(), ProtocolBuildError> {
        match self.keys().find(|key| !is_known(key)) {
            Some(option) => Err(ProtocolBuildError::UnknownOption {
                protocol: protocol.to_owned(),
                option: option.to_owned(),
            }),
            None => Ok(()),
        }
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_owned()
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, ProtocolBuildError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(invalid(key, raw, "a boolean")),
        }
    }

    pub fn get_integer(&self, key: &str, default: i64) -> Result<i64, ProtocolBuildError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        raw.trim()
            .parse()
            .map_err(|_| invalid(key, raw, "an integer"))
    }

    /// Byte size. Bare numbers are kilobytes; `KB`, `MB` and `GB` suffixes
    /// are accepted in any case.
    pub fn get_size(&self, key: &str, default: usize) -> Result<usize, ProtocolBuildError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        let (number, unit) = split_unit(raw);
        let factor = match unit.as_str() {
            "" | "kb" => KB,
            "mb" => MB,
            "gb" => GB,
            _ => return Err(invalid(key, raw, "a size such as 512, 4 MB or 1 GB")),
        };
        number
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(factor))
            .and_then(|bytes| usize::try_from(bytes).ok())
            .ok_or_else(|| invalid(key, raw, "a size such as 512, 4 MB or 1 GB"))
    }

    /// Duration. Bare numbers are milliseconds; `ms`, `s`, `m`, `h` and `d`
    /// suffixes are accepted.
    pub fn get_timespan(
        &self,
        key: &str,
        default: Duration,
    ) -> Result<Duration, ProtocolBuildError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        let (number, unit) = split_unit(raw);
        let millis_per_unit: u64 = match unit.as_str() {
            "" | "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(invalid(key, raw, "a timespan such as 500, 10s or 5m")),
        };
        number
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(millis_per_unit))
            .map(Duration::from_millis)
            .ok_or_else(|| invalid(key, raw, "a timespan such as 500, 10s or 5m"))
    }

    pub fn get_level(&self, key: &str, default: Level) -> Result<Level, ProtocolBuildError> {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|_| invalid(key, raw, "a level name")),
            None => Ok(default),
        }
    }
}

fn split_unit(raw: &str) -> (&str, String) {
    let trimmed = raw.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    (number, unit.trim().to_ascii_lowercase())
}

fn invalid(key: &str, raw: &str, expected: &'static str) -> ProtocolBuildError {
    ProtocolBuildError::InvalidValue {
        option: key.to_owned(),
        value: raw.to_owned(),
        expected,
    }
}

/// Renders as `key="value", ...` in key order, for diagnostics.
impl fmt::Display for OptionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.values.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}=\"{value}\"")?;
        }
        Ok(())
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for OptionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OptionMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
