use std::fmt;
use std::str::FromStr;

/// Severity attached to every packet.
///
/// The discriminants are stable: they are compared against protocol filters
/// and the backlog flush threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    #[default]
    Debug = 0,
    Verbose = 1,
    Message = 2,
    Warning = 3,
    Error = 4,
    Fatal = 5,
    /// Administrative packets; never filtered.
    Control = 6,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Debug => "DEBUG",
            Level::Verbose => "VERBOSE",
            Level::Message => "MESSAGE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Control => "CONTROL",
        };
        f.write_str(s)
    }
}

/// Error returned when a level name cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown level '{0}'")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "VERBOSE" => Ok(Self::Verbose),
            "MESSAGE" | "INFO" => Ok(Self::Message),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "FATAL" => Ok(Self::Fatal),
            "CONTROL" => Ok(Self::Control),
            _ => Err(ParseLevelError(s.to_owned())),
        }
    }
}
