//! YAML configuration for exporting instruments.
//!
//! ```yaml
//! broker: kafka.example.org:9092
//! file_name: run_42.nxs
//! truncate: 10
//! streams:
//!   /entry/instrument/detector:
//!     topic: detector_events
//!     source: det1
//!     writer_module: ev42
//! links:
//!   /entry/monitor:
//!     name: monitor
//!     target: /entry/instrument/monitor
//! ```
//!
//! Every key is optional. Command-line flags override the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::commands::{CommandOptions, DEFAULT_BROKER};
use super::writer::NexusJsonWriter;
use crate::error::NexusError;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriterConfig {
    pub broker: Option<String>,
    pub file_name: Option<String>,
    pub job_id: Option<String>,
    pub truncate: Option<usize>,
    #[serde(default)]
    pub streams: BTreeMap<String, Value>,
    #[serde(default)]
    pub links: BTreeMap<String, LinkConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LinkConfig {
    pub name: String,
    pub target: String,
}

impl WriterConfig {
    /// A writer with this configuration's streams, links and truncation.
    pub fn writer(&self) -> NexusJsonWriter {
        let mut writer = NexusJsonWriter::new();
        writer.truncate = self.truncate;
        for (path, stream) in &self.streams {
            writer.add_stream(path.as_str(), stream.clone());
        }
        for (path, link) in &self.links {
            writer.add_link(path.as_str(), link.name.as_str(), link.target.as_str());
        }
        writer
    }

    /// Command options with this configuration's broker and job id.
    pub fn command_options(&self) -> CommandOptions {
        CommandOptions {
            broker: self
                .broker
                .clone()
                .unwrap_or_else(|| DEFAULT_BROKER.to_string()),
            job_id: self.job_id.clone().unwrap_or_default(),
            ..CommandOptions::default()
        }
    }
}

/// Parses a configuration from YAML text.
pub fn from_yaml_str(yaml: &str) -> Result<WriterConfig, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

/// Reads a configuration file.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid configuration.
pub fn load_writer_config(path: &Path) -> Result<WriterConfig, NexusError> {
    let text = fs::read_to_string(path)?;
    from_yaml_str(&text).map_err(|source| NexusError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EXAMPLE: &str = r#"
broker: kafka:9092
file_name: run_42.nxs
truncate: 5
streams:
  /entry/instrument/detector:
    topic: detector_events
    writer_module: ev42
links:
  /entry/monitor:
    name: monitor
    target: /entry/instrument/monitor
"#;

    #[test]
    fn parses_every_section() {
        let config = from_yaml_str(EXAMPLE).unwrap();
        assert_eq!(config.broker.as_deref(), Some("kafka:9092"));
        assert_eq!(config.truncate, Some(5));
        assert_eq!(
            config.streams["/entry/instrument/detector"],
            json!({"topic": "detector_events", "writer_module": "ev42"})
        );

        let writer = config.writer();
        assert_eq!(writer.truncate, Some(5));
        assert_eq!(writer.links["/entry/monitor"].target, "/entry/instrument/monitor");
        assert_eq!(config.command_options().broker, "kafka:9092");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = from_yaml_str("{}").unwrap();
        assert_eq!(config, WriterConfig::default());
        assert_eq!(config.command_options(), CommandOptions::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(from_yaml_str("brokers: localhost").is_err());
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("writer.yaml");
        fs::write(&path, "truncate: [1, 2]").unwrap();
        match load_writer_config(&path) {
            Err(NexusError::ConfigParse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected a config error, got {other:?}"),
        }
    }
}
