use std::env;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::mem;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::error::{Error, Result};
use crate::format::{self, Arg};
use crate::level::{Level, LevelGate};
use crate::timestamp::{SystemClock, TimestampSource};

/// Line terminator appended to every message.
pub const EOL: u8 = b'\n';

/// Environment variable naming the initial level, read by [`WriterBuilder::with_env`].
pub const ENV_LEVEL: &str = "BUFLOG_LEVEL";
/// Environment variable holding the buffer capacity in bytes.
pub const ENV_BUFFER_SIZE: &str = "BUFLOG_BUFFER_SIZE";

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Any byte destination a [`Writer`] can own.
pub type Sink = Box<dyn Write + Send>;

/// Host memory-page size, used as the default buffer capacity.
#[must_use]
pub fn default_buffer_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    *SIZE.get_or_init(page_size)
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn page_size() -> usize {
    // SAFETY: sysconf only reads a system constant.
    let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(n)
        .ok()
        .filter(|&n| n > 0)
        .unwrap_or(FALLBACK_PAGE_SIZE)
}

#[cfg(not(unix))]
const fn page_size() -> usize {
    FALLBACK_PAGE_SIZE
}

/// Thread-safe leveled writer buffering lines in front of a [`Sink`].
///
/// Every line is `timestamp ++ level prefix ++ body ++ "\n"`. All buffer and
/// sink access goes through one mutex, so concurrent callers never tear a
/// line. Bytes reach the sink when the buffer fills, on [`flush`](Self::flush),
/// on a destination swap, on [`close`](Self::close), and when the writer is
/// dropped.
pub struct Writer {
    level: LevelGate,
    clock: Arc<dyn TimestampSource>,
    inner: Mutex<Inner>,
}

struct Inner {
    // `None` once closed
    stream: Option<BufWriter<Sink>>,
    capacity: usize,
    scratch: Vec<u8>,
}

impl Writer {
    /// Bind a writer to `sink` with the default level, capacity and clock.
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self::from_parts(
            Box::new(sink),
            default_buffer_size(),
            Level::Debug,
            Arc::new(SystemClock),
        )
    }

    /// Create a new [`WriterBuilder`].
    #[inline]
    #[must_use]
    pub fn builder() -> WriterBuilder {
        WriterBuilder::default()
    }

    fn from_parts(
        sink: Sink,
        capacity: usize,
        level: Level,
        clock: Arc<dyn TimestampSource>,
    ) -> Self {
        Self {
            level: LevelGate::new(level),
            clock,
            inner: Mutex::new(Inner {
                stream: Some(BufWriter::with_capacity(capacity, sink)),
                capacity,
                scratch: Vec::new(),
            }),
        }
    }

    // A panic while holding the lock leaves at worst a partial line in the
    // buffer; keep going rather than poisoning every later call.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current severity threshold.
    #[inline]
    #[must_use]
    pub fn level(&self) -> Level {
        self.level.get()
    }

    /// Change the severity threshold.
    #[inline]
    pub fn set_level(&self, l: Level) {
        self.level.set(l);
    }

    /// Whether messages at `l` pass the threshold.
    #[inline]
    #[must_use]
    pub fn enabled(&self, l: Level) -> bool {
        self.level.allows(l)
    }

    /// Buffer capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Whether [`close`](Self::close) has completed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().stream.is_none()
    }

    /// Append `message` verbatim, with no placeholder interpretation.
    ///
    /// Returns the number of bytes appended to the buffer. The threshold is
    /// not consulted; see the per-level methods for gated writes.
    /// # Errors
    /// [`Error::Closed`] after close, [`Error::Io`] if a full buffer cannot be
    /// spilled to the sink.
    pub fn write(&self, level: Level, message: &str) -> Result<usize> {
        let stamp = self.clock.now();
        let mut guard = self.lock();
        let Inner {
            stream, scratch, ..
        } = &mut *guard;
        let stream = stream.as_mut().ok_or(Error::Closed)?;
        start_line(scratch, &stamp, level);
        scratch.extend_from_slice(message.as_bytes());
        Ok(finish_line(stream, scratch)?)
    }

    /// Render `format` against `args` and append it as one line.
    ///
    /// Returns the number of bytes appended to the buffer. If the format string
    /// and arguments disagree nothing is appended.
    /// # Errors
    /// [`Error::Format`] on a placeholder/argument mismatch, [`Error::Closed`]
    /// after close, [`Error::Io`] if a full buffer cannot be spilled.
    pub fn write_formatted(&self, level: Level, format: &str, args: &[Arg<'_>]) -> Result<usize> {
        let stamp = self.clock.now();
        let mut guard = self.lock();
        let Inner {
            stream, scratch, ..
        } = &mut *guard;
        let stream = stream.as_mut().ok_or(Error::Closed)?;
        start_line(scratch, &stamp, level);
        format::render(format, args, scratch)?;
        Ok(finish_line(stream, scratch)?)
    }

    /// Push every buffered byte to the sink and flush the sink.
    /// # Errors
    /// [`Error::Closed`] after close, [`Error::Io`] if the sink fails.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.stream.as_mut().ok_or(Error::Closed)?.flush()?;
        Ok(())
    }

    /// Drain the buffer into the current sink, then rebind to `sink`.
    ///
    /// The capacity is preserved. Returns the previous sink. If draining
    /// fails the previous sink stays bound and keeps the unwritten bytes.
    /// # Errors
    /// [`Error::Closed`] after close, [`Error::Io`] if draining fails.
    pub fn reset_destination(&self, sink: impl Write + Send + 'static) -> Result<Sink> {
        let mut inner = self.lock();
        let capacity = inner.capacity;
        let stream = inner.stream.as_mut().ok_or(Error::Closed)?;
        stream.flush()?;
        let old = mem::replace(stream, BufWriter::with_capacity(capacity, Box::new(sink)));
        // already drained, the leftover buffer is empty
        let (old, _) = old.into_parts();
        Ok(old)
    }

    /// Swap to the file at `path`, created if missing and opened for append.
    /// # Errors
    /// As [`reset_destination`](Self::reset_destination), plus [`Error::Io`]
    /// if the file cannot be opened.
    pub fn reset_file(&self, path: impl AsRef<Path>) -> Result<Sink> {
        self.reset_destination(open_append(path.as_ref())?)
    }

    /// Flush and release the buffered stream.
    ///
    /// On success every later write, flush, swap or close fails with
    /// [`Error::Closed`]. If the final flush fails the writer stays open and
    /// the call may be retried.
    /// # Errors
    /// [`Error::Closed`] if already closed, [`Error::Io`] if the flush fails.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.stream.as_mut().ok_or(Error::Closed)?.flush()?;
        inner.stream = None;
        inner.scratch = Vec::new();
        Ok(())
    }
}

fn start_line(line: &mut Vec<u8>, stamp: &[u8], level: Level) {
    line.clear();
    line.extend_from_slice(stamp);
    line.extend_from_slice(level.prefix().as_bytes());
}

// One `write_all` per line: a failed spill leaves none of it buffered.
fn finish_line(stream: &mut BufWriter<Sink>, line: &mut Vec<u8>) -> io::Result<usize> {
    line.push(EOL);
    stream.write_all(line)?;
    Ok(line.len())
}

fn open_append(path: &Path) -> io::Result<std::fs::File> {
    OpenOptions::new().create(true).append(true).open(path)
}

macro_rules! severity_methods {
    ($($lvl:ident => $name:ident, $namef:ident;)+) => {$(
        #[doc = concat!("Write `message` at [`Level::", stringify!($lvl), "`] if the threshold allows it.")]
        ///
        /// Returns `Ok(0)` without touching the buffer when filtered.
        /// # Errors
        /// As [`Writer::write`].
        pub fn $name(&self, message: &str) -> Result<usize> {
            if !self.enabled(Level::$lvl) {
                return Ok(0);
            }
            self.write(Level::$lvl, message)
        }

        #[doc = concat!("Formatted write at [`Level::", stringify!($lvl), "`] if the threshold allows it.")]
        ///
        /// Returns `Ok(0)` without rendering when filtered.
        /// # Errors
        /// As [`Writer::write_formatted`].
        pub fn $namef(&self, format: &str, args: &[Arg<'_>]) -> Result<usize> {
            if !self.enabled(Level::$lvl) {
                return Ok(0);
            }
            self.write_formatted(Level::$lvl, format, args)
        }
    )+};
}

impl Writer {
    severity_methods! {
        Debug => debug, debugf;
        Trace => trace, tracef;
        Info => info, infof;
        Warn => warn, warnf;
        Error => error, errorf;
        Critical => critical, criticalf;
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Writer")
            .field("level", &self.level())
            .field("capacity", &inner.capacity)
            .field("buffered", &inner.stream.as_ref().map(|s| s.buffer().len()))
            .finish_non_exhaustive()
    }
}

enum Destination {
    Stdout,
    Stderr,
    Writer(Sink),
    File(PathBuf),
    Tcp(String),
}

/// Builder for [`Writer`]
pub struct WriterBuilder {
    level: Level,
    buffer_size: usize,
    clock: Option<Arc<dyn TimestampSource>>,
    destination: Destination,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        Self {
            level: Level::Debug,
            buffer_size: default_buffer_size(),
            clock: None,
            destination: Destination::Stderr,
        }
    }
}

impl WriterBuilder {
    #[inline]
    #[must_use]
    /// Set the initial severity threshold
    pub const fn level(mut self, l: Level) -> Self {
        self.level = l;
        self
    }
    #[inline]
    #[must_use]
    /// Set the buffer capacity in bytes
    pub const fn buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }
    #[inline]
    #[must_use]
    /// Use `source` for line timestamps; may be shared between writers
    pub fn timestamp<T: TimestampSource + 'static>(mut self, source: Arc<T>) -> Self {
        self.clock = Some(source);
        self
    }
    #[inline]
    #[must_use]
    /// Write to stdout
    pub fn stdout(mut self) -> Self {
        self.destination = Destination::Stdout;
        self
    }
    #[inline]
    #[must_use]
    /// Write to stderr (the default)
    pub fn stderr(mut self) -> Self {
        self.destination = Destination::Stderr;
        self
    }
    #[inline]
    #[must_use]
    /// Write to a custom sink
    pub fn writer(mut self, w: impl Write + Send + 'static) -> Self {
        self.destination = Destination::Writer(Box::new(w));
        self
    }
    #[inline]
    #[must_use]
    /// Append to a file, created on build if missing
    pub fn file(mut self, p: impl AsRef<Path>) -> Self {
        self.destination = Destination::File(p.as_ref().to_owned());
        self
    }
    #[inline]
    #[must_use]
    /// Stream to a TCP peer, connected on build
    pub fn tcp(mut self, addr: impl Into<String>) -> Self {
        self.destination = Destination::Tcp(addr.into());
        self
    }

    /// Override level and buffer size from [`ENV_LEVEL`] and [`ENV_BUFFER_SIZE`].
    ///
    /// Unset or unparsable variables leave the current setting alone.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if let Some(l) = env::var(ENV_LEVEL).ok().and_then(|s| s.parse().ok()) {
            self.level = l;
        }
        if let Some(n) = env::var(ENV_BUFFER_SIZE)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            self.buffer_size = n;
        }
        self
    }

    /// Build the writer
    /// # Errors
    /// This function will return an error if the file cannot be opened or the
    /// TCP peer cannot be reached
    pub fn build(self) -> Result<Writer> {
        let sink: Sink = match self.destination {
            Destination::Stdout => Box::new(io::stdout()),
            Destination::Stderr => Box::new(io::stderr()),
            Destination::Writer(w) => w,
            Destination::File(p) => Box::new(open_append(&p)?),
            Destination::Tcp(addr) => Box::new(TcpStream::connect(addr.as_str())?),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        Ok(Writer::from_parts(sink, self.buffer_size, self.level, clock))
    }

    /// Build the writer and leak it
    /// # Errors
    /// As [`build`](Self::build)
    pub fn build_static(self) -> Result<&'static Writer> {
        Ok(Box::leak(Box::new(self.build()?)))
    }
}
