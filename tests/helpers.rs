#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use buflog::{FixedTimestamp, Level, Writer};

/// Timestamp used by every test writer.
pub const TS: &str = "TS ";

#[derive(Clone, Default)]
pub struct Mem(pub Arc<Mutex<Vec<u8>>>);
impl Write for Mem {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
impl Mem {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .map(std::string::ToString::to_string)
            .collect()
    }
}

/// A sink that fails every write while `down` is set.
#[derive(Clone, Default)]
pub struct Flaky {
    pub down: Arc<AtomicBool>,
    pub mem: Mem,
}
impl Write for Flaky {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if self.down.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "sink down"));
        }
        self.mem.write(bytes)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer over an in-memory sink with a fixed timestamp.
pub fn mem_writer() -> (Writer, Mem) {
    mem_writer_sized(buflog::default_buffer_size())
}

pub fn mem_writer_sized(capacity: usize) -> (Writer, Mem) {
    let mem = Mem::default();
    let w = Writer::builder()
        .writer(mem.clone())
        .buffer_size(capacity)
        .timestamp(Arc::new(FixedTimestamp::new(TS.as_bytes())))
        .build()
        .unwrap();
    (w, mem)
}

/// The exact line a write at `l` with body `body` produces.
pub fn line(l: Level, body: &str) -> String {
    format!("{TS}{}{body}\n", l.prefix())
}
