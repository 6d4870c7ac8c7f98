//! Default configuration values
//!
//! Provides default configuration instances and helper functions.

use super::schema::Config;

/// Get the default configuration
pub fn default_config() -> Config {
    Config::default()
}

/// Starter configuration file written by `kubechat config init`
pub fn starter_yaml() -> String {
    let header = "# kubechat configuration\n# The API key is read from the environment variable named by model.apiKeyEnv.\n";
    let body = serde_yaml::to_string(&default_config()).unwrap_or_default();
    format!("{}{}", header, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_starter_yaml_parses_back_to_defaults() {
        let yaml = starter_yaml();
        assert!(yaml.starts_with("# kubechat configuration"));
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, default_config());
    }
}
