//! Timestamp sources.
//!
//! The writer never renders time itself: it asks a [`TimestampSource`] for a
//! ready-to-append byte sequence and copies it verbatim in front of the level
//! prefix. [`SystemClock`] renders on every call, [`TimeCache`] hands out a
//! pre-rendered value refreshed on a cadence owned by the caller (or by a
//! [`Refresher`] thread), and [`FixedTimestamp`] never changes.

use std::io::{self, Write};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Supplies the bytes written at the start of every line.
pub trait TimestampSource: Send + Sync {
    /// Current timestamp, ready to append. Treated as opaque by the writer.
    fn now(&self) -> Arc<[u8]>;
}

/// Renders the wall clock on every call.
///
/// Output looks like `2023-11-14 22:13:20.123Z ` (UTC). With the `localtime`
/// feature the local offset is used and the `Z` is omitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimestampSource for SystemClock {
    fn now(&self) -> Arc<[u8]> {
        render(SystemTime::now()).into()
    }
}

/// Always returns the same bytes.
#[derive(Debug, Clone)]
pub struct FixedTimestamp(Arc<[u8]>);

impl FixedTimestamp {
    /// Wrap constant timestamp bytes.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// A source producing no timestamp at all.
    #[must_use]
    pub fn empty() -> Self {
        Self(Arc::from(&[][..]))
    }
}

impl TimestampSource for FixedTimestamp {
    fn now(&self) -> Arc<[u8]> {
        Arc::clone(&self.0)
    }
}

/// A pre-rendered timestamp shared by any number of writers.
///
/// Reading is a clone of an `Arc`; rendering happens only in [`refresh`](Self::refresh).
#[derive(Debug)]
pub struct TimeCache {
    current: RwLock<Arc<[u8]>>,
}

impl Default for TimeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeCache {
    /// Create a cache holding the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(render(SystemTime::now()).into()),
        }
    }

    /// Re-render the cached value from the wall clock.
    pub fn refresh(&self) {
        self.set(render(SystemTime::now()));
    }

    /// Replace the cached value with arbitrary bytes.
    pub fn set(&self, bytes: impl Into<Arc<[u8]>>) {
        let bytes = bytes.into();
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = bytes;
    }

    /// Start a thread that calls [`refresh`](Self::refresh) every `every`.
    ///
    /// The thread runs until the returned guard is dropped.
    /// # Errors
    /// This function will return an error if the thread cannot be spawned.
    pub fn spawn_refresher(self: &Arc<Self>, every: Duration) -> io::Result<Refresher> {
        let (stop, stopped) = mpsc::channel::<()>();
        let cache = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("buflog-clock".into())
            .spawn(move || loop {
                match stopped.recv_timeout(every) {
                    Err(RecvTimeoutError::Timeout) => cache.refresh(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(Refresher {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl TimestampSource for TimeCache {
    fn now(&self) -> Arc<[u8]> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Keeps a [`TimeCache`] refresh thread alive; stops and joins it on drop.
#[derive(Debug)]
pub struct Refresher {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for Refresher {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Correct Gregorian Y-M-D from days since 1970-01-01 (no deps).
#[inline]
const fn civil_from_days_utc(days_since_unix_epoch: i64) -> (i32, u32, u32) {
    // Howard Hinnant’s algorithm
    let z = days_since_unix_epoch + 719_468; // days since 0000-03-01
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // [0,399]
    let yd = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * yd + 2) / 153; // [0, 11]
    let d = yd - (153 * mp + 2) / 5 + 1; // [1, 31]
    let m = mp + 3 - 12 * (mp / 10); // [1, 12]
    let y = 100 * era + yoe + (m <= 2) as i64; // year
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    (y as i32, m as u32, d as u32)
}

fn render(at: SystemTime) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32);
    write_timestamp(&mut buf, at);
    buf
}

fn write_utc(w: &mut Vec<u8>, at: SystemTime) {
    let since = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = i64::try_from(since.as_secs()).unwrap_or(i64::MAX);
    let ms = since.subsec_millis();

    let days = secs.div_euclid(86_400);
    let sod = secs.rem_euclid(86_400);
    let h = sod / 3_600;
    let m = sod % 3_600 / 60;
    let s = sod % 60;

    let (year, month, day) = civil_from_days_utc(days);
    let _ = write!(
        w,
        "{year:04}-{month:02}-{day:02} {h:02}:{m:02}:{s:02}.{ms:03}Z "
    );
}

#[cfg(not(feature = "localtime"))]
#[inline]
fn write_timestamp(w: &mut Vec<u8>, at: SystemTime) {
    write_utc(w, at);
}

#[cfg(feature = "localtime")]
fn write_timestamp(w: &mut Vec<u8>, at: SystemTime) {
    // Local time via `time`; falls back to UTC if the offset or format is unavailable
    let now: time::OffsetDateTime = at.into();
    let now = now.to_offset(time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC));
    let rendered = time::format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
    )
    .ok()
    .and_then(|fd| now.format(&fd).ok());
    match rendered {
        Some(s) => {
            w.extend_from_slice(s.as_bytes());
            w.push(b' ');
        }
        None => write_utc(w, at),
    }
}
