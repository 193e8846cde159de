mod helpers;
use buflog::{critical, debug, error, info, trace, warn, Level};
use helpers::*;

#[test]
fn defaults_to_most_verbose() {
    let (w, mem) = mem_writer();
    assert_eq!(w.level(), Level::Debug);
    for l in Level::ALL {
        assert!(w.enabled(l));
    }
    debug!(w, "d").unwrap();
    trace!(w, "t").unwrap();
    info!(w, "i").unwrap();
    warn!(w, "w").unwrap();
    error!(w, "e").unwrap();
    critical!(w, "c").unwrap();
    w.flush().unwrap();
    assert_eq!(
        mem.lines(),
        vec![
            "TS [DEBUG] d",
            "TS [TRACE] t",
            "TS [INFO] i",
            "TS [WARN] w",
            "TS [ERROR] e",
            "TS [CRITICAL] c",
        ]
    );
}

#[test]
fn threshold_filters_lower_levels() {
    let (w, mem) = mem_writer();
    w.set_level(Level::Warn);
    assert_eq!(w.level(), Level::Warn);

    assert_eq!(w.debug("no").unwrap(), 0);
    assert_eq!(w.tracef("no %d", &[1.into()]).unwrap(), 0);
    assert_eq!(info!(w, "no %s", "x").unwrap(), 0);
    assert!(w.warn("yes").unwrap() > 0);
    assert!(error!(w, "yes %d", 2).unwrap() > 0);
    assert!(w.criticalf("yes %v", &[true.into()]).unwrap() > 0);
    w.flush().unwrap();

    assert_eq!(
        mem.lines(),
        vec!["TS [WARN] yes", "TS [ERROR] yes 2", "TS [CRITICAL] yes true"]
    );
}

#[test]
fn filtered_calls_skip_format_validation() {
    let (w, _mem) = mem_writer();
    w.set_level(Level::Critical);
    // would be a MissingArgument error if rendered
    assert_eq!(w.infof("%d %d", &[]).unwrap(), 0);
    assert!(w.criticalf("%d %d", &[]).is_err());
}

#[test]
fn raw_writes_ignore_the_threshold() {
    let (w, mem) = mem_writer();
    w.set_level(Level::Critical);
    w.write(Level::Debug, "raw").unwrap();
    w.write_formatted(Level::Trace, "raw %d", &[2.into()])
        .unwrap();
    w.flush().unwrap();
    assert_eq!(mem.lines(), vec!["TS [DEBUG] raw", "TS [TRACE] raw 2"]);
}

#[test]
fn macros_accept_trailing_commas_and_owned_values() {
    let (w, mem) = mem_writer();
    let user = String::from("ada");
    let attempts = 3_u8;
    info!(w, "user %s failed %d times", &user, attempts,).unwrap();
    w.flush().unwrap();
    assert_eq!(mem.lines(), vec!["TS [INFO] user ada failed 3 times"]);
}
