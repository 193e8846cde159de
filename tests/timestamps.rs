mod helpers;
use std::sync::Arc;

use buflog::{Level, TimeCache, TimestampSource, Writer};
use helpers::Mem;

#[test]
#[cfg(not(feature = "localtime"))]
fn system_clock_prefixes_utc_timestamp() {
    let mem = Mem::default();
    let w = Writer::builder().writer(mem.clone()).build().unwrap();
    w.write(Level::Info, "ts").unwrap();
    w.flush().unwrap();

    let s = mem.contents();
    let line = s.lines().next().unwrap_or("");
    // 2023-11-14 22:13:20.123Z [INFO] ts
    assert_eq!(line.len(), "2023-11-14 22:13:20.123Z [INFO] ts".len(), "{line}");
    assert!(line.ends_with("Z [INFO] ts"), "expected UTC 'Z ' marker before level: {line}");
    let b = line.as_bytes();
    assert_eq!((b[4], b[7], b[10], b[13], b[16], b[19]), (b'-', b'-', b' ', b':', b':', b'.'));
    let year: u32 = line[..4].parse().unwrap();
    assert!((2023..3000).contains(&year), "implausible year in {line}");
}

#[cfg(feature = "localtime")]
#[test]
fn localtime_timestamp_prefix() {
    let mem = Mem::default();
    let w = Writer::builder().writer(mem.clone()).build().unwrap();
    w.write(Level::Info, "ts").unwrap();
    w.flush().unwrap();
    let s = mem.contents();
    let line = s.lines().next().unwrap_or("");
    assert!(!line.contains("Z "), "localtime should not include 'Z ': {line}");
}

#[test]
fn writers_share_a_cached_timestamp() {
    let cache = Arc::new(TimeCache::new());
    cache.set(&b"T0 "[..]);
    let (a, b) = (Mem::default(), Mem::default());
    let wa = Writer::builder()
        .writer(a.clone())
        .timestamp(Arc::clone(&cache))
        .build()
        .unwrap();
    let wb = Writer::builder()
        .writer(b.clone())
        .timestamp(Arc::clone(&cache))
        .build()
        .unwrap();

    let n = wa.write(Level::Info, "a").unwrap();
    assert_eq!(n, "T0 [INFO] a\n".len());
    cache.set(&b"T1 "[..]);
    wb.write(Level::Info, "b").unwrap();
    wa.write(Level::Info, "a").unwrap();
    wa.close().unwrap();
    wb.close().unwrap();

    assert_eq!(a.lines(), vec!["T0 [INFO] a", "T1 [INFO] a"]);
    assert_eq!(b.lines(), vec!["T1 [INFO] b"]);
}
