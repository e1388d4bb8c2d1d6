#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use pipelink_client::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
client_id: "424087019149328395"
connection:
  slot_count: 4
  handshake_timeot_ms: 100 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.error_code().as_str(), "UNKNOWN_ERROR");
    assert!(err.to_string().contains("handshake_timeot_ms"));
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
client_id: "424087019149328395"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.client_id, "424087019149328395");
    assert_eq!(cfg.connection.slot_count, 10);
    assert_eq!(cfg.connection.target_slot, None);
    assert!(cfg.connection.clear_on_shutdown);
    assert_eq!(cfg.backoff.min_ms, 500);
    assert_eq!(cfg.backoff.max_ms, 60000);
    assert_eq!(cfg.queues.max_commands, 512);
    assert_eq!(cfg.queues.max_events, 128);
}

#[test]
fn full_config_round_trips_into_sections() {
    let full = r#"
version: 1
client_id: "424087019149328395"
connection:
  slot_count: 3
  target_slot: 2
  handshake_timeout_ms: 1000
  idle_wait_ms: 10
  read_timeout_ms: 20
  max_connection_attempts: 4
  clear_on_shutdown: false
  process_id: 4242
backoff:
  min_ms: 100
  max_ms: 200
queues:
  max_commands: 8
  max_events: 16
"#;
    let cfg = config::load_from_str(full).expect("must parse");
    assert_eq!(cfg.connection.slot_order(), vec![2, 0, 1]);
    assert_eq!(cfg.connection.pid(), 4242);
    assert!(!cfg.connection.clear_on_shutdown);
    assert_eq!(cfg.queues.max_events, 16);
}

#[test]
fn unsupported_version_rejected() {
    let bad = r#"
version: 2
client_id: "1"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.to_string(), "unsupported config version");
}

#[test]
fn semantic_validation() {
    let cases = [
        "version: 1\nclient_id: \"\"\n",
        "version: 1\nclient_id: \"1\"\nconnection: { slot_count: 0 }\n",
        "version: 1\nclient_id: \"1\"\nconnection: { slot_count: 11 }\n",
        "version: 1\nclient_id: \"1\"\nconnection: { target_slot: 10 }\n",
        "version: 1\nclient_id: \"1\"\nconnection: { max_connection_attempts: 0 }\n",
        "version: 1\nclient_id: \"1\"\nbackoff: { min_ms: 500, max_ms: 100 }\n",
        "version: 1\nclient_id: \"1\"\nbackoff: { min_ms: 0 }\n",
        "version: 1\nclient_id: \"1\"\nqueues: { max_events: 0 }\n",
    ];
    for yaml in cases {
        let err = config::load_from_str(yaml).expect_err(yaml);
        assert!(err.to_string().starts_with("bad config"), "{yaml}: {err}");
    }
}

#[test]
fn missing_file_is_reported() {
    let err = config::load_from_file("/nonexistent/pipelink.yaml").expect_err("must fail");
    assert!(err.to_string().contains("read config failed"));
}
