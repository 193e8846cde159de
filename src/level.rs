use core::fmt;
use core::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

// ===== Levels =====
/// Message severity, ordered from most verbose to most severe.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(u8)]
pub enum Level {
    /// Debug
    Debug = 0,
    /// Trace
    Trace,
    /// Info
    Info,
    /// Warn
    Warn,
    /// Error
    Error,
    /// Critical
    Critical,
}

impl Level {
    /// Every level, in ascending order.
    pub const ALL: [Self; 6] = [
        Self::Debug,
        Self::Trace,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Critical,
    ];

    /// Bytes written in front of every message of this level.
    #[inline]
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Debug => "[DEBUG] ",
            Self::Trace => "[TRACE] ",
            Self::Info => "[INFO] ",
            Self::Warn => "[WARN] ",
            Self::Error => "[ERROR] ",
            Self::Critical => "[CRITICAL] ",
        }
    }

    /// Upper-case name without decoration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    #[inline]
    const fn from_u8(x: u8) -> Self {
        match x {
            1 => Self::Trace,
            2 => Self::Info,
            3 => Self::Warn,
            4 => Self::Error,
            5 => Self::Critical,
            _ => Self::Debug,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLevelError;

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown log level")
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| s.trim().eq_ignore_ascii_case(l.as_str()))
            .or_else(|| s.trim().eq_ignore_ascii_case("warning").then_some(Self::Warn))
            .ok_or(ParseLevelError)
    }
}

impl TryFrom<&str> for Level {
    type Error = ParseLevelError;
    fn try_from(s: &str) -> Result<Self, ParseLevelError> {
        s.parse()
    }
}

/// Severity threshold that can be read and changed from any thread.
#[derive(Debug)]
pub(crate) struct LevelGate(AtomicU8);

impl LevelGate {
    pub(crate) const fn new(l: Level) -> Self {
        Self(AtomicU8::new(l as u8))
    }

    #[inline]
    pub(crate) fn get(&self) -> Level {
        Level::from_u8(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn set(&self, l: Level) {
        self.0.store(l as u8, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn allows(&self, l: Level) -> bool {
        (l as u8) >= self.0.load(Ordering::Relaxed)
    }
}
