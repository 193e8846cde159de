use buflog::{Level, Writer, ENV_BUFFER_SIZE, ENV_LEVEL};

// one test per binary: the environment is process-wide
#[test]
fn builder_reads_level_and_buffer_size_from_env() {
    std::env::set_var(ENV_LEVEL, "error");
    std::env::set_var(ENV_BUFFER_SIZE, "8192");
    let w = Writer::builder()
        .writer(std::io::sink())
        .with_env()
        .build()
        .unwrap();
    assert_eq!(w.level(), Level::Error);
    assert_eq!(w.capacity(), 8192);

    // invalid values leave the builder's settings alone
    std::env::set_var(ENV_LEVEL, "loud");
    std::env::set_var(ENV_BUFFER_SIZE, "0");
    let w = Writer::builder()
        .writer(std::io::sink())
        .level(Level::Info)
        .buffer_size(100)
        .with_env()
        .build()
        .unwrap();
    assert_eq!(w.level(), Level::Info);
    assert_eq!(w.capacity(), 100);

    std::env::remove_var(ENV_LEVEL);
    std::env::remove_var(ENV_BUFFER_SIZE);
    let w = Writer::builder().writer(std::io::sink()).with_env().build().unwrap();
    assert_eq!(w.level(), Level::Debug);
    assert_eq!(w.capacity(), buflog::default_buffer_size());
}
