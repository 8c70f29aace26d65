use std::{env, fs};

use driftlock_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    // Create a temporary TOML configuration file
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("driftlock.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081

[controller]
poll_interval_secs = 10
history_retention = 25
worker_limit = 2

[controller.retry]
max_retries = 5
base_delay_ms = 100
max_delay_ms = 2000

[source]
root = "/srv/repos"

[store]
data_dir = "/var/lib/driftlock"

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.controller.poll_interval_secs, 10);
    assert_eq!(cfg.controller.history_retention, 25);
    assert_eq!(cfg.controller.retry.max_retries, 5);
    assert_eq!(cfg.source.root, "/srv/repos");
    assert_eq!(cfg.logging.level, "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("DRIFTLOCK__CONTROLLER__WORKER_LIMIT", "8");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.controller.worker_limit, 8);
    unsafe {
        env::remove_var("DRIFTLOCK__CONTROLLER__WORKER_LIMIT");
    }

    // 3) Invalid values fail validation
    let bad = dir.path().join("bad.toml");
    fs::write(
        &bad,
        r#"
[controller]
poll_interval_secs = 0
"#,
    )
    .expect("write toml");
    let err = load_config(bad.to_str()).expect_err("zero poll interval must fail");
    assert!(err.contains("poll_interval_secs"));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let cfg = load_config(Some("/nonexistent/driftlock.toml")).expect("defaults are valid");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.store.data_dir, "./data");
}
