//! Integration tests for skirmish-config

use skirmish_config::domains::logging::{LogFormat, LogLevel};
use skirmish_config::*;
use std::io::Write;
use std::time::Duration;
use temp_env::with_vars;

fn no_overrides() -> Vec<(&'static str, Option<&'static str>)> {
    Vec::new()
}

#[test]
fn test_default_config_validation() {
    let config = SkirmishConfig::default();
    assert!(config.validate_all().is_ok());
    assert_eq!(config.server.port, 10900);
    assert_eq!(config.backend.lobbies_uri, "http://127.0.0.1:10000/v1");
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("SKIRMISH_SERVER_PORT", Some("11000")),
        ("SKIRMISH_LOAD_TEST_URIS", Some("http://10.0.0.1, http://10.0.0.2")),
        ("SKIRMISH_HTTP_TIMEOUT_MS", Some("2500")),
        ("SKIRMISH_LOG_LEVEL", Some("debug")),
        ("SKIRMISH_LOG_FORMAT", Some("json")),
        ("SKIRMISH_CHAT_PORT", Some("10701")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::new().from_env().unwrap();

        assert_eq!(config.server.port, 11000);
        assert_eq!(
            config.cluster.load_test_uris,
            vec!["http://10.0.0.1", "http://10.0.0.2"]
        );
        assert_eq!(config.http.timeout, Duration::from_millis(2500));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.backend.chat_port, 10701);
    });
}

#[test]
fn test_invalid_env_value_is_reported() {
    with_vars(vec![("SKIRMISH_SERVER_PORT", Some("not-a-port"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::EnvError(_)));
        assert!(err.to_string().contains("SERVER_PORT"));
    });
}

#[test]
fn test_custom_prefix() {
    with_vars(vec![("LOADGEN_CHAT_HOST", Some("chat.internal"))], || {
        let config = ConfigLoader::with_prefix("LOADGEN").from_env().unwrap();
        assert_eq!(config.backend.chat_host, "chat.internal");
    });
}

#[test]
fn test_yaml_file_with_partial_domains() {
    let yaml = r#"
server:
  port: 12000

cluster:
  load_test_uris:
    - "http://node-a"
    - "http://node-b"

timing:
  get_users_to_list_games: 500
  socket_wait_timeout: 60000

logging:
  level: warn
"#;
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_vars(no_overrides(), || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();

        assert_eq!(config.server.port, 12000);
        assert_eq!(config.cluster.load_test_uris.len(), 2);
        assert_eq!(config.timing.get_users_to_list_games, Duration::from_millis(500));
        assert_eq!(config.timing.socket_wait_timeout, Duration::from_secs(60));
        // Untouched delays keep their defaults
        assert_eq!(config.timing.loop_end_to_loop_start, Duration::from_secs(5));
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.http.max_sockets, 1000);
    });
}

#[test]
fn test_json_file() {
    let json = r#"{ "backend": { "player_stats_uri": "http://stats:10500" }, "http": { "verify_ssl": true } }"#;
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    with_vars(no_overrides(), || {
        let config = ConfigLoader::new().load(Some(file.path())).unwrap();
        assert_eq!(config.backend.player_stats_uri, "http://stats:10500");
        assert!(config.http.verify_ssl);
    });
}

#[test]
fn test_file_validation_failure() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"cluster:\n  load_test_uris: []\n").unwrap();

    with_vars(no_overrides(), || {
        let err = ConfigLoader::new().from_file(file.path()).unwrap_err();
        match err {
            ConfigError::DomainError { domain, .. } => assert_eq!(domain, "cluster"),
            other => panic!("unexpected error: {other}"),
        }
    });
}

#[test]
fn test_sample_round_trips() {
    let yaml = SkirmishConfig::generate_sample();
    let parsed: SkirmishConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(parsed.validate_all().is_ok());
    assert_eq!(parsed.timing, TimingConfig::default());
}
