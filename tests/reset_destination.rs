mod helpers;
use std::fs;
use std::io::Write as _;
use std::sync::atomic::Ordering;

use buflog::Level;
use helpers::*;

#[test]
fn bytes_land_on_the_side_of_the_swap_they_were_written() {
    let (w, old) = mem_writer_sized(256);
    let mut written = 0;
    written += w.write(Level::Info, "before 1").unwrap();
    written += w.infof("before %d", &[2.into()]).unwrap();

    let new = Mem::default();
    let _previous = w.reset_destination(new.clone()).unwrap();
    assert_eq!(old.lines(), vec!["TS [INFO] before 1", "TS [INFO] before 2"]);
    assert_eq!(new.len(), 0);

    written += w.write(Level::Info, "after").unwrap();
    w.flush().unwrap();

    assert_eq!(old.lines(), vec!["TS [INFO] before 1", "TS [INFO] before 2"]);
    assert_eq!(new.lines(), vec!["TS [INFO] after"]);
    assert_eq!(old.len() + new.len(), written);
}

#[test]
fn capacity_is_preserved() {
    let (w, _old) = mem_writer_sized(123);
    w.reset_destination(Mem::default()).unwrap();
    assert_eq!(w.capacity(), 123);
}

#[test]
fn returns_the_previous_sink() {
    let (w, first) = mem_writer();
    w.write(Level::Info, "to first").unwrap();
    let mut previous = w.reset_destination(Mem::default()).unwrap();
    previous.write_all(b"direct\n").unwrap();
    assert_eq!(first.lines(), vec!["TS [INFO] to first", "direct"]);
}

#[test]
fn failed_drain_keeps_the_old_destination() {
    let (w, _) = mem_writer();
    let flaky = Flaky::default();
    w.reset_destination(flaky.clone()).unwrap();
    w.write(Level::Info, "stuck").unwrap();

    flaky.down.store(true, Ordering::SeqCst);
    let replacement = Mem::default();
    assert!(w.reset_destination(replacement.clone()).is_err());

    flaky.down.store(false, Ordering::SeqCst);
    w.flush().unwrap();
    assert_eq!(flaky.mem.lines(), vec!["TS [INFO] stuck"]);
    assert_eq!(replacement.len(), 0);
}

#[test]
fn reset_to_file_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("swap.log");
    fs::write(&path, "existing\n").unwrap();

    let (w, mem) = mem_writer();
    w.write(Level::Info, "memory").unwrap();
    w.reset_file(&path).unwrap();
    w.write(Level::Warn, "file").unwrap();
    w.close().unwrap();

    assert_eq!(mem.lines(), vec!["TS [INFO] memory"]);
    let s = fs::read_to_string(&path).unwrap();
    assert_eq!(s, "existing\nTS [WARN] file\n");
}
