//! Configuration loading.
//!
//! Configuration comes from one TOML file with `MAGPIE_`-prefixed
//! environment variables layered on top. Env keys nest with a double
//! underscore so snake_case field names survive: `MAGPIE_SERVER__PORT=9000`
//! overrides `[server] port`, and `MAGPIE_RSS__GRAB_DELAY_MS=0` overrides
//! `[rss] grab_delay_ms`.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use std::path::Path;

use super::types::{Config, ConfigError};

/// Read the config file and apply environment overrides.
///
/// The file must exist: env vars refine a config, they cannot stand in for
/// one.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }

    Figment::from(Toml::file(path))
        .merge(Env::prefixed("MAGPIE_").split("__"))
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Parse a config from an in-memory TOML document, without environment
/// overrides. Used by tests and tooling that assemble configs
/// programmatically.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_reach_nested_sections() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[database]
path = "data/magpie.db"

[scanner]
history_limit = 25

[[indexers]]
id = "geek"
name = "NZBgeek"
base_url = "https://api.nzbgeek.info"
api_key = "k"
"#,
            )?;

            let config = load_config(Path::new("config.toml")).expect("config loads");
            assert_eq!(config.database.path.to_string_lossy(), "data/magpie.db");
            assert_eq!(config.scanner.history_limit, 25);
            assert_eq!(config.indexers[0].id, "geek");
            // Sections the file does not mention keep their defaults.
            assert_eq!(config.rss.limit, 100);
            assert_eq!(config.blacklist.retention_days, 90);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[database]
path = "magpie.db"

[server]
port = 8686

[rss]
grab_delay_ms = 2000
"#,
            )?;
            jail.set_env("MAGPIE_SERVER__PORT", "9999");
            jail.set_env("MAGPIE_RSS__GRAB_DELAY_MS", "0");

            let config = load_config(Path::new("config.toml")).expect("config loads");
            assert_eq!(config.server.port, 9999);
            assert_eq!(config.rss.grab_delay_ms, 0);
            // Only the named keys are touched.
            assert_eq!(config.rss.limit, 100);
            Ok(())
        });
    }

    #[test]
    fn env_alone_cannot_stand_in_for_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MAGPIE_DATABASE__PATH", "magpie.db");
            let err = load_config(Path::new("config.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Missing(_)));
            Ok(())
        });
    }

    #[test]
    fn broken_toml_is_a_parse_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[database\npath = ")?;
            let err = load_config(Path::new("config.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)));
            Ok(())
        });
    }

    #[test]
    fn str_loader_enforces_required_sections() {
        let err = load_config_from_str("[server]\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let config = load_config_from_str("[database]\npath = \"m.db\"").unwrap();
        assert_eq!(config.database.path.to_string_lossy(), "m.db");
    }
}
