#![warn(missing_docs, unsafe_code)]
//! A leveled, buffered message writer.
//!
//! [`Writer`] owns a sink (file, socket, console, anything `Write + Send`)
//! behind an in-memory buffer and one lock. Each message becomes one line:
//! a timestamp, a level prefix, the body and `\n`. Bodies are either literal
//! or rendered from a printf-style format string with `%` placeholders.
//!
//! ```
//! use std::sync::Arc;
//! use buflog::{FixedTimestamp, Level, Writer};
//!
//! let w = Writer::builder()
//!     .stdout()
//!     .timestamp(Arc::new(FixedTimestamp::empty()))
//!     .build()?;
//! let n = buflog::info!(w, "hello %s, you are %d", "world", 3)?;
//! assert_eq!(n, "[INFO] hello world, you are 3\n".len());
//! w.write(Level::Warn, "literal, so 100% is fine")?;
//! w.close()?;
//! # Ok::<(), buflog::Error>(())
//! ```

mod error;
mod format;
mod level;
mod timestamp;
mod writer;

pub use error::{Error, FormatError, Result};
pub use format::{render, Arg, HumanDuration, ESCAPE, PLACEHOLDER};
pub use level::{Level, ParseLevelError};
pub use timestamp::{FixedTimestamp, Refresher, SystemClock, TimeCache, TimestampSource};
pub use writer::{
    default_buffer_size, Sink, Writer, WriterBuilder, ENV_BUFFER_SIZE, ENV_LEVEL, EOL,
};

/// Formatted write through a level method
#[macro_export]
macro_rules! __buflog_log {
    ($w:expr, $method:ident, $fmt:expr $(, $arg:expr)* $(,)?) => {
        $w.$method($fmt, &[$($crate::Arg::from($arg)),*])
    };
}
/// debug
#[macro_export]
macro_rules! debug { ($w:expr, $($t:tt)+) => { $crate::__buflog_log!($w, debugf, $($t)+) } }
/// trace
#[macro_export]
macro_rules! trace { ($w:expr, $($t:tt)+) => { $crate::__buflog_log!($w, tracef, $($t)+) } }
/// info
#[macro_export]
macro_rules! info  { ($w:expr, $($t:tt)+) => { $crate::__buflog_log!($w, infof,  $($t)+) } }
/// warning
#[macro_export]
macro_rules! warn  { ($w:expr, $($t:tt)+) => { $crate::__buflog_log!($w, warnf,  $($t)+) } }
/// error
#[macro_export]
macro_rules! error { ($w:expr, $($t:tt)+) => { $crate::__buflog_log!($w, errorf, $($t)+) } }
/// critical
#[macro_export]
macro_rules! critical { ($w:expr, $($t:tt)+) => { $crate::__buflog_log!($w, criticalf, $($t)+) } }
