use super::types::Config;
use crate::config::expand_env_vars;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(&yaml_string);

    let config: Config = serde_yaml::from_str(&yaml_string)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.stream.name.is_empty() {
        return Err(ConfigError::Validation(
            "stream.name must not be empty".to_string(),
        ));
    }
    if config.stream.endpoint.is_empty() {
        return Err(ConfigError::Validation(
            "stream.endpoint must not be empty".to_string(),
        ));
    }
    if config.shard.id.is_empty() {
        return Err(ConfigError::Validation(
            "shard.id must not be empty".to_string(),
        ));
    }
    if config.poll.max_records == 0 || config.poll.max_records > 10_000 {
        return Err(ConfigError::Validation(format!(
            "poll.max_records must be between 1 and 10000, got {}",
            config.poll.max_records
        )));
    }
    if config.poll.retry.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "poll.retry.max_attempts must be at least 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::StartPosition;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let file = write_config(
            r#"
stream:
  name: actions
  endpoint: http://localhost:4567
shard:
  id: shard-000000
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.stream.region, "us-east-1");
        assert_eq!(config.shard.start, StartPosition::Earliest);
        assert_eq!(config.poll.max_records, 1000);
        assert_eq!(config.poll.idle_backoff, Duration::from_secs(1));
        assert_eq!(config.poll.retry.max_attempts, 5);
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
stream:
  name: actions
  endpoint: http://localhost:4567
  region: eu-west-1
credentials:
  access_key_id: AKID
  secret_access_key: SECRET
  session_token: TOKEN
shard:
  id: shard-000000
  start: latest
poll:
  max_records: 500
  idle_backoff: 250ms
  retry:
    max_attempts: 3
    initial_backoff: 100ms
    max_backoff: 5s
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.stream.region, "eu-west-1");
        assert_eq!(config.credentials.session_token.as_deref(), Some("TOKEN"));
        assert_eq!(config.shard.start, StartPosition::Latest);
        assert_eq!(config.poll.max_records, 500);
        assert_eq!(config.poll.idle_backoff, Duration::from_millis(250));
        assert_eq!(config.poll.retry.max_backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_env_expansion_in_credentials() {
        std::env::set_var("SHARDTAIL_TEST_AKID", "from-env");
        let file = write_config(
            r#"
stream:
  name: actions
  endpoint: http://localhost:4567
credentials:
  access_key_id: $env{SHARDTAIL_TEST_AKID}
shard:
  id: shard-000000
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.credentials.access_key_id, "from-env");
        std::env::remove_var("SHARDTAIL_TEST_AKID");
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        let file = write_config("stream: [not, a, mapping");

        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::YamlParse(_))
        ));
    }

    #[test]
    fn test_empty_stream_name_rejected() {
        let file = write_config(
            r#"
stream:
  name: ""
  endpoint: http://localhost:4567
shard:
  id: shard-000000
"#,
        );

        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_max_records_out_of_range_rejected() {
        let file = write_config(
            r#"
stream:
  name: actions
  endpoint: http://localhost:4567
shard:
  id: shard-000000
poll:
  max_records: 20000
"#,
        );

        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }
}
