//! Configuration file loading

use kubechat::config::{Config, ConfigLoader, ContainerLookup, starter_yaml};
use std::io::Write;
use std::path::PathBuf;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_file() {
    let file = write_config(
        r#"
server:
  host: 127.0.0.1
  port: 8080
cluster:
  kubeconfig: /etc/kubechat/kubeconfig
  context: prod-eu
  callTimeoutSecs: 15
  connectTimeoutSecs: 3
  containerLookup: per-pod
  lookupConcurrency: 4
model:
  apiBase: http://localhost:11434/v1
  model: llama3
  temperature: 0.0
  timeoutSecs: 120
  apiKeyEnv: KUBECHAT_TEST_UNSET_KEY
prompt:
  instruction: Answer tersely.
  systemMessage: You answer questions about Kubernetes.
  maxItemsPerSection: 50
logging:
  level: debug
"#,
    );

    let (config, _) = ConfigLoader::load(Some(file.path())).unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(
        config.cluster.kubeconfig,
        Some(PathBuf::from("/etc/kubechat/kubeconfig"))
    );
    assert_eq!(config.cluster.context.as_deref(), Some("prod-eu"));
    assert_eq!(config.cluster.call_timeout_secs, 15);
    assert_eq!(config.cluster.container_lookup, ContainerLookup::PerPod);
    assert_eq!(config.cluster.lookup_concurrency, 4);
    assert_eq!(config.model.model, "llama3");
    assert_eq!(config.model.timeout_secs, 120);
    assert_eq!(config.model.api_key, None);
    assert_eq!(config.prompt.instruction, "Answer tersely.");
    assert_eq!(config.prompt.max_items_per_section, Some(50));
    assert_eq!(config.logging.level, "debug");
    assert!(ConfigLoader::validate(&config).is_ok());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config("model:\n  model: gpt-4o-mini\n");

    let config = ConfigLoader::load_file(file.path()).unwrap();
    let defaults = Config::default();

    assert_eq!(config.model.model, "gpt-4o-mini");
    assert_eq!(config.model.api_base, defaults.model.api_base);
    assert_eq!(config.server, defaults.server);
    assert_eq!(config.cluster, defaults.cluster);
    assert_eq!(config.prompt, defaults.prompt);
}

#[test]
fn test_empty_mapping_is_all_defaults() {
    let file = write_config("{}\n");
    assert_eq!(ConfigLoader::load_file(file.path()).unwrap(), Config::default());
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let file = write_config("server: [unclosed\n");
    let err = ConfigLoader::load_file(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

#[test]
fn test_unknown_lookup_strategy_is_an_error() {
    let file = write_config("cluster:\n  containerLookup: sometimes\n");
    assert!(ConfigLoader::load_file(file.path()).is_err());
}

#[test]
fn test_out_of_range_values_fail_validation() {
    let file = write_config(
        "model:\n  temperature: 2.5\ncluster:\n  lookupConcurrency: 0\nprompt:\n  maxItemsPerSection: 0\n",
    );
    let config = ConfigLoader::load_file(file.path()).unwrap();

    let err = ConfigLoader::validate(&config).unwrap_err().to_string();
    assert!(err.contains("model.temperature"));
    assert!(err.contains("cluster.lookupConcurrency"));
    assert!(err.contains("prompt.maxItemsPerSection"));
}

#[test]
fn test_starter_file_round_trips() {
    let file = write_config(&starter_yaml());
    let config = ConfigLoader::load_file(file.path()).unwrap();
    assert_eq!(config, Config::default());
}
