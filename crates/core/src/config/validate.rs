use std::collections::HashSet;

use super::types::{Config, ConfigError};
use crate::scheduler::TaskType;

/// Validate configuration beyond what serde enforces: unique ids, usable
/// URLs, sane intervals, known task names.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::Invalid(
            "server.port cannot be 0".to_string(),
        ));
    }

    let mut indexer_ids = HashSet::new();
    for indexer in &config.indexers {
        if indexer.id.is_empty() {
            return Err(ConfigError::Invalid(
                "indexer id cannot be empty".to_string(),
            ));
        }
        if !indexer_ids.insert(indexer.id.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate indexer id: {}",
                indexer.id
            )));
        }
        if !indexer.base_url.starts_with("http://") && !indexer.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "indexer {} base_url must be an http(s) URL",
                indexer.id
            )));
        }
    }

    let mut client_ids = HashSet::new();
    for client in &config.download_clients {
        if client.id.is_empty() {
            return Err(ConfigError::Invalid(
                "download client id cannot be empty".to_string(),
            ));
        }
        if !client_ids.insert(client.id.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "duplicate download client id: {}",
                client.id
            )));
        }
        if client.host.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "download client {} host cannot be empty",
                client.id
            )));
        }
        // Mapping only makes sense as a pair.
        if client.remote_path.is_some() != client.local_path.is_some() {
            return Err(ConfigError::Invalid(format!(
                "download client {} must set remote_path and local_path together",
                client.id
            )));
        }
    }

    for task in &config.tasks {
        if TaskType::from_str(&task.task).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown task type: {}",
                task.task
            )));
        }
        if let Some(interval) = task.interval_minutes {
            if interval < 1 {
                return Err(ConfigError::Invalid(format!(
                    "task {} interval_minutes must be >= 1",
                    task.task
                )));
            }
        }
    }

    for (key, limits) in &config.rate_limits.providers {
        if limits.interval_cap == 0 || limits.concurrency == 0 {
            return Err(ConfigError::Invalid(format!(
                "rate limit for {} must have interval_cap and concurrency >= 1",
                key
            )));
        }
    }
    if config.rate_limits.default.interval_cap == 0 || config.rate_limits.default.concurrency == 0 {
        return Err(ConfigError::Invalid(
            "default rate limit must have interval_cap and concurrency >= 1".to_string(),
        ));
    }

    if config.scanner.history_limit == 0 {
        return Err(ConfigError::Invalid(
            "scanner.history_limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn base_config() -> Config {
        load_config_from_str(
            r#"
[database]
path = "magpie.db"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        let config = base_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_duplicate_indexer_id_fails() {
        let config = load_config_from_str(
            r#"
[database]
path = "magpie.db"

[[indexers]]
id = "ix"
name = "One"
base_url = "https://one.example"
api_key = "k"

[[indexers]]
id = "ix"
name = "Two"
base_url = "https://two.example"
api_key = "k"
"#,
        )
        .unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validate_bad_base_url_fails() {
        let config = load_config_from_str(
            r#"
[database]
path = "magpie.db"

[[indexers]]
id = "ix"
name = "One"
base_url = "ftp://one.example"
api_key = "k"
"#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_unpaired_path_mapping_fails() {
        let config = load_config_from_str(
            r#"
[database]
path = "magpie.db"

[[download_clients]]
id = "sab"
name = "SABnzbd"
kind = "sabnzbd"
host = "localhost"
port = 8080
api_key = "k"
remote_path = "/remote/dl"
"#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_unknown_task_fails() {
        let config = load_config_from_str(
            r#"
[database]
path = "magpie.db"

[[tasks]]
task = "defrag_flux_capacitor"
"#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_rate_limit_fails() {
        let config = load_config_from_str(
            r#"
[database]
path = "magpie.db"

[rate_limits.providers."indexer:ix"]
interval_cap = 0
"#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }
}
