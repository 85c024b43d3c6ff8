//! Raw TOML configuration data types
//!
//! These structs mirror the config file exactly. [`FileConfig::validate`]
//! turns them into the typed [`Settings`] the rest of the program uses.

mod classifier;
mod request;
mod transport;

pub use classifier::FileClassifierConfig;
pub use request::{DEFAULT_MODEL, FileRequestConfig};
pub use transport::{DEFAULT_ENDPOINT, FileTransportConfig};

use super::error::ConfigError;
use crate::transport::{FragmentFormat, HttpTransportOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thinkstream_domain::{ClassifierConfig, HeuristicPolicy, ThinkMarkers};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub transport: FileTransportConfig,
    pub request: FileRequestConfig,
    pub classifier: FileClassifierConfig,
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub model: String,
    pub transport: HttpTransportOptions,
    pub classifier: ClassifierConfig,
}

impl FileConfig {
    /// Check every field and build [`Settings`].
    ///
    /// Fails on the first invalid value: an unparsable endpoint, an unknown
    /// format or heuristic name, or unusable markers.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let endpoint = reqwest::Url::parse(&self.transport.endpoint)
            .map_err(|e| ConfigError::invalid("transport.endpoint", e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "transport.endpoint",
                format!("unsupported scheme '{}'", endpoint.scheme()),
            ));
        }

        let format: FragmentFormat = self
            .transport
            .format
            .parse()
            .map_err(|e: String| ConfigError::invalid("transport.format", e))?;

        if self.request.model.trim().is_empty() {
            return Err(ConfigError::invalid("request.model", "must not be empty"));
        }

        let markers = ThinkMarkers::new(
            self.classifier.open_marker.as_str(),
            self.classifier.close_marker.as_str(),
        )
        .map_err(|e| ConfigError::invalid("classifier markers", e.to_string()))?;

        let policy: HeuristicPolicy = self
            .classifier
            .heuristic
            .parse()
            .map_err(|e: thinkstream_domain::ClassificationError| {
                ConfigError::invalid("classifier.heuristic", e.to_string())
            })?;

        let idle_timeout = match self.transport.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Settings {
            endpoint: self.transport.endpoint.clone(),
            model: self.request.model.clone(),
            transport: HttpTransportOptions {
                format,
                connect_timeout: Duration::from_secs(self.transport.connect_timeout_secs),
                idle_timeout,
            },
            classifier: ClassifierConfig::default()
                .with_markers(markers)
                .with_threshold(self.classifier.threshold)
                .with_policy(policy),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::{
        Figment,
        providers::{Format, Toml},
    };

    fn parse(toml_str: &str) -> FileConfig {
        Figment::from(Toml::string(toml_str)).extract().unwrap()
    }

    #[test]
    fn test_defaults_validate() {
        let settings = FileConfig::default().validate().unwrap();
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.transport.format, FragmentFormat::Ndjson);
        assert_eq!(settings.transport.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.transport.idle_timeout, Some(Duration::from_secs(120)));
        assert_eq!(settings.classifier, ClassifierConfig::default());
    }

    #[test]
    fn test_deserialize_full_config() {
        let config = parse(
            r#"
[transport]
endpoint = "https://llm.internal/v1/stream"
format = "raw"
connect_timeout_secs = 3
idle_timeout_secs = 0

[request]
model = "deepseek-r1"

[classifier]
threshold = 80
heuristic = "reevaluate"
"#,
        );

        let settings = config.validate().unwrap();
        assert_eq!(settings.endpoint, "https://llm.internal/v1/stream");
        assert_eq!(settings.model, "deepseek-r1");
        assert_eq!(settings.transport.format, FragmentFormat::Raw);
        assert_eq!(settings.transport.connect_timeout, Duration::from_secs(3));
        assert_eq!(settings.transport.idle_timeout, None);
        assert_eq!(settings.classifier.threshold, 80);
        assert_eq!(settings.classifier.policy, HeuristicPolicy::Reevaluate);
    }

    #[test]
    fn test_unknown_section_is_ignored() {
        let config = parse("[tui]\ntheme = \"dark\"\n");
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = FileConfig::default();
        config.transport.endpoint = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref field, .. } if field == "transport.endpoint")
        );

        config.transport.endpoint = "ftp://example.com/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_format() {
        let mut config = FileConfig::default();
        config.transport.format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("transport.format"));
    }

    #[test]
    fn test_identical_markers_rejected() {
        let mut config = FileConfig::default();
        config.classifier.close_marker = "<think>".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("identical"));
    }

    #[test]
    fn test_empty_marker_rejected() {
        let mut config = FileConfig::default();
        config.classifier.open_marker = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_heuristic_rejected() {
        let mut config = FileConfig::default();
        config.classifier.heuristic = "sometimes".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("classifier.heuristic"));
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut config = FileConfig::default();
        config.request.model = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
