//! Zone store configuration

use std::path::Path;

use dns_core::{DnsClass, DnsError, DnsResult, LoggingConfig, Name};
use serde::{Deserialize, Serialize};

/// Configuration for an in-memory zone store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Absolute zone origin, e.g. `example.com.`
    pub origin: Option<String>,
    /// Zone class mnemonic
    pub class: String,
    /// Require SOA and NS at the apex before a commit is accepted
    pub validate_on_commit: bool,
    /// Number of committed transactions kept in the version log
    pub max_journal_entries: usize,
    pub logging: LoggingConfig,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            origin: None,
            class: "IN".to_string(),
            validate_on_commit: true,
            max_journal_entries: 1000,
            logging: LoggingConfig::default(),
        }
    }
}

impl ZoneConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> DnsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DnsError::ConfigurationNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| DnsError::ConfigurationParseError {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> DnsResult<Self> {
        let mut config = Self::default();

        if let Ok(origin) = std::env::var("DNS_ZONE_ORIGIN") {
            config.origin = Some(origin);
        }
        if let Ok(class) = std::env::var("DNS_ZONE_CLASS") {
            config.class = class;
        }
        if let Ok(validate) = std::env::var("DNS_ZONE_VALIDATE") {
            config.validate_on_commit = validate.parse().unwrap_or(true);
        }
        if let Ok(size) = std::env::var("DNS_ZONE_JOURNAL_SIZE") {
            config.max_journal_entries = size.parse().map_err(|_| {
                DnsError::invalid_configuration(format!("DNS_ZONE_JOURNAL_SIZE is not a number: {}", size))
            })?;
        }
        if let Ok(level) = std::env::var("DNS_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for consistency
    pub fn validate(&self) -> DnsResult<()> {
        self.zone_class()?;
        self.origin_name()?;
        if self.max_journal_entries == 0 {
            return Err(DnsError::invalid_configuration("max_journal_entries must be at least 1"));
        }
        Ok(())
    }

    pub fn zone_class(&self) -> DnsResult<DnsClass> {
        self.class
            .parse()
            .map_err(|_| DnsError::invalid_configuration(format!("unknown zone class: {}", self.class)))
    }

    /// The parsed origin, which must be absolute
    pub fn origin_name(&self) -> DnsResult<Option<Name>> {
        let Some(text) = &self.origin else {
            return Ok(None);
        };
        let origin = Name::from_text(text, None)
            .map_err(|e| DnsError::invalid_configuration(format!("invalid origin: {}", e)))?;
        if !origin.is_absolute() {
            return Err(DnsError::invalid_configuration(format!(
                "origin must be absolute: {}",
                text
            )));
        }
        Ok(Some(origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_core::LogFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = ZoneConfig::default();
        config.validate().unwrap();
        assert_eq!(config.zone_class().unwrap(), DnsClass::IN);
        assert!(config.origin_name().unwrap().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
origin = "example.com."
class = "in"
max_journal_entries = 16

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = ZoneConfig::from_file(file.path()).unwrap();
        assert_eq!(config.origin_name().unwrap(), Some("example.com.".parse().unwrap()));
        assert_eq!(config.max_journal_entries, 16);
        assert!(config.validate_on_commit);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ZoneConfig::from_file(dir.path().join("zone.toml")).unwrap_err();
        assert!(matches!(err, DnsError::ConfigurationNotFound { .. }));
    }

    #[test]
    fn test_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "origin = [").unwrap();
        let err = ZoneConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, DnsError::ConfigurationParseError { .. }));
    }

    /// Removes the zone variables when dropped, even if the test panics
    struct EnvGuard;

    impl EnvGuard {
        const VARS: [&'static str; 5] = [
            "DNS_ZONE_ORIGIN",
            "DNS_ZONE_CLASS",
            "DNS_ZONE_VALIDATE",
            "DNS_ZONE_JOURNAL_SIZE",
            "DNS_LOG_LEVEL",
        ];

        fn set(vars: &[(&str, &str)]) -> Self {
            for var in Self::VARS {
                std::env::remove_var(var);
            }
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
            Self
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for var in Self::VARS {
                std::env::remove_var(var);
            }
        }
    }

    // Only this test sets the zone variables
    #[test]
    fn test_load_from_env() {
        {
            let _env = EnvGuard::set(&[
                ("DNS_ZONE_ORIGIN", "example.net."),
                ("DNS_ZONE_CLASS", "ch"),
                ("DNS_ZONE_VALIDATE", "false"),
                ("DNS_ZONE_JOURNAL_SIZE", "64"),
                ("DNS_LOG_LEVEL", "debug"),
            ]);
            let config = ZoneConfig::from_env().unwrap();
            assert_eq!(config.origin_name().unwrap(), Some("example.net.".parse().unwrap()));
            assert_eq!(config.zone_class().unwrap(), DnsClass::CH);
            assert!(!config.validate_on_commit);
            assert_eq!(config.max_journal_entries, 64);
            assert_eq!(config.logging.level, "debug");
        }

        {
            let _env = EnvGuard::set(&[("DNS_ZONE_JOURNAL_SIZE", "lots")]);
            let err = ZoneConfig::from_env().unwrap_err();
            assert_eq!(
                err,
                DnsError::invalid_configuration("DNS_ZONE_JOURNAL_SIZE is not a number: lots")
            );
        }

        {
            let _env = EnvGuard::set(&[("DNS_ZONE_ORIGIN", "example.net")]);
            assert!(matches!(ZoneConfig::from_env(), Err(DnsError::InvalidConfiguration { .. })));
        }

        let _env = EnvGuard::set(&[]);
        assert_eq!(ZoneConfig::from_env().unwrap(), ZoneConfig::default());
    }

    #[test]
    fn test_validation_failures() {
        let relative = ZoneConfig { origin: Some("example.com".to_string()), ..Default::default() };
        assert!(matches!(relative.validate(), Err(DnsError::InvalidConfiguration { .. })));

        let bad_class = ZoneConfig { class: "XX".to_string(), ..Default::default() };
        assert!(matches!(bad_class.validate(), Err(DnsError::InvalidConfiguration { .. })));

        let no_journal = ZoneConfig { max_journal_entries: 0, ..Default::default() };
        assert!(matches!(no_journal.validate(), Err(DnsError::InvalidConfiguration { .. })));
    }
}
