pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};

pub use parse::{load_config, ConfigError};
pub use types::Config;

/// Expands environment variables in a string.
/// Supports $env{VAR_NAME} syntax.
/// If an environment variable is not set, it's left unchanged.
pub fn expand_env_vars(text: &str) -> String {
    // Pattern matches $env{VAR_NAME} where VAR_NAME starts with letter or underscore,
    // followed by alphanumeric characters or underscores
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();

    re.replace_all(text, |caps: &regex::Captures| {
        let var_name = caps.get(1).unwrap().as_str();

        // Try to get the environment variable
        std::env::var(var_name).unwrap_or_else(|_| {
            // If not set, return original match unchanged
            caps.get(0).unwrap().as_str().to_string()
        })
    })
    .to_string()
}

/// Resolves the config file path based on explicit argument or default locations.
/// Returns the first existing path from:
/// 1. Explicit path (if provided)
/// 2. ~/.config/shardtail/config.yml
/// 3. /etc/shardtail/config.yml
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Check ~/.config/shardtail/config.yml
    if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(".config/shardtail/config.yml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    // Check /etc/shardtail/config.yml
    let system_config = PathBuf::from("/etc/shardtail/config.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_single() {
        std::env::set_var("SHARDTAIL_TEST_VAR", "test_value");
        let result = expand_env_vars("key: $env{SHARDTAIL_TEST_VAR}");
        assert_eq!(result, "key: test_value");
        std::env::remove_var("SHARDTAIL_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_unset_left_unchanged() {
        std::env::remove_var("SHARDTAIL_UNSET_VAR");
        let result = expand_env_vars("key: $env{SHARDTAIL_UNSET_VAR}");
        assert_eq!(result, "key: $env{SHARDTAIL_UNSET_VAR}");
    }

    #[test]
    fn test_explicit_path_wins() {
        let resolved = resolve_config_path(Some(Path::new("/tmp/custom.yml")));
        assert_eq!(resolved, Some(PathBuf::from("/tmp/custom.yml")));
    }
}
