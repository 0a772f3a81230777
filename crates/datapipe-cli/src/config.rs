//! Optional TOML configuration
//!
//! ```toml
//! db = ".datapipe/shapes.db"
//! subscriber_id = "warehouse"
//! repository = "acme"
//! log_profile = "production"
//! quarantine = "abort"
//! ```
//!
//! Every key is optional. Command-line flags win over file values.

use datapipe_core::logging_facility::Profile;
use datapipe_engine::QuarantinePolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB: &str = ".datapipe/shapes.db";
pub const DEFAULT_SUBSCRIBER: &str = "default";
pub const DEFAULT_REPOSITORY: &str = "local";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub db: Option<PathBuf>,
    pub subscriber_id: Option<String>,
    pub repository: Option<String>,
    pub log_profile: Profile,
    pub quarantine: QuarantinePolicy,
}

impl Config {
    /// Read `path` if given; no file means all defaults
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
        let config = toml::from_str(&text)
            .map_err(|e| format!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn db_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.db.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
    }

    pub fn subscriber_id(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.subscriber_id.clone())
            .unwrap_or_else(|| DEFAULT_SUBSCRIBER.to_string())
    }

    pub fn repository(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.repository.clone())
            .unwrap_or_else(|| DEFAULT_REPOSITORY.to_string())
    }

    pub fn quarantine(&self, flag: Option<QuarantinePolicy>) -> QuarantinePolicy {
        flag.unwrap_or(self.quarantine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_means_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.db_path(None), PathBuf::from(DEFAULT_DB));
        assert_eq!(config.subscriber_id(None), DEFAULT_SUBSCRIBER);
        assert_eq!(config.quarantine(None), QuarantinePolicy::Skip);
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "db = \"from_file.db\"\nsubscriber_id = \"warehouse\"\nquarantine = \"abort\"\nlog_profile = \"production\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.log_profile, Profile::Production);
        assert_eq!(config.db_path(None), PathBuf::from("from_file.db"));
        assert_eq!(
            config.db_path(Some(PathBuf::from("flag.db"))),
            PathBuf::from("flag.db")
        );
        assert_eq!(config.subscriber_id(None), "warehouse");
        assert_eq!(config.subscriber_id(Some("lake".to_string())), "lake");
        assert_eq!(config.quarantine(None), QuarantinePolicy::Abort);
        assert_eq!(
            config.quarantine(Some(QuarantinePolicy::Skip)),
            QuarantinePolicy::Skip
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "databse = \"typo.db\"").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }
}
