//! Static, deployment-wide agent properties.
//!
//! These properties (blobstore, NTP servers, message bus URL and so on) are
//! merged into every agent environment. They are supplied as a JSON object in
//! a file referenced from configuration.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::util::read_to_string_ambient;

/// Errors raised while loading static agent properties.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum AgentPropertiesError {
    /// Raised when the configured file path is empty or only whitespace.
    #[error("agent properties file path must not be empty")]
    FilePathEmpty,
    /// Raised when reading the file fails.
    #[error("failed to read agent properties file `{path}`: {message}")]
    FileRead {
        /// Path that failed to read.
        path: String,
        /// Underlying error message.
        message: String,
    },
    /// Raised when the file does not contain valid JSON.
    #[error("failed to parse agent properties `{path}`: {message}")]
    Parse {
        /// Path (or `<inline>`) of the offending document.
        path: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when the document is valid JSON but not an object.
    #[error("agent properties `{path}` must be a JSON object")]
    NotAnObject {
        /// Path (or `<inline>`) of the offending document.
        path: String,
    },
}

/// Deployment-wide properties merged into each agent environment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentProperties(Map<String, Value>);

impl AgentProperties {
    /// Wraps an existing JSON object.
    #[must_use]
    pub const fn new(properties: Map<String, Value>) -> Self {
        Self(properties)
    }

    /// Parses properties from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`AgentPropertiesError::Parse`] for malformed JSON and
    /// [`AgentPropertiesError::NotAnObject`] when the top level is not an
    /// object.
    pub fn from_json(document: &str) -> Result<Self, AgentPropertiesError> {
        Self::parse(document, "<inline>")
    }

    /// Loads properties from an optional file path. A missing path yields an
    /// empty property set.
    ///
    /// # Errors
    ///
    /// Returns [`AgentPropertiesError`] when the path is blank, the file
    /// cannot be read, or its contents are not a JSON object.
    pub fn load(path: Option<&str>) -> Result<Self, AgentPropertiesError> {
        let Some(raw_path) = path else {
            return Ok(Self::default());
        };
        if raw_path.trim().is_empty() {
            return Err(AgentPropertiesError::FilePathEmpty);
        }
        let document = read_to_string_ambient(Utf8Path::new(raw_path)).map_err(|message| {
            AgentPropertiesError::FileRead {
                path: raw_path.to_owned(),
                message,
            }
        })?;
        Self::parse(&document, raw_path)
    }

    fn parse(document: &str, origin: &str) -> Result<Self, AgentPropertiesError> {
        let value: Value =
            serde_json::from_str(document).map_err(|err| AgentPropertiesError::Parse {
                path: origin.to_owned(),
                message: err.to_string(),
            })?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(AgentPropertiesError::NotAnObject {
                path: origin.to_owned(),
            }),
        }
    }

    /// Returns the property stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterates over the properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns `true` when no properties are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for AgentProperties {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write as _;

    #[test]
    fn missing_path_yields_empty_properties() {
        let properties = AgentProperties::load(None).expect("empty properties");
        assert!(properties.is_empty());
    }

    #[test]
    fn blank_path_is_rejected() {
        let err = AgentProperties::load(Some("  ")).expect_err("blank path");
        assert_eq!(err, AgentPropertiesError::FilePathEmpty);
    }

    #[test]
    fn loads_object_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"blobstore": {{"provider": "dav"}}, "ntp": ["pool.ntp.org"]}}"#)
            .expect("write properties");
        let path = file.path().to_str().expect("utf8 path");

        let properties = AgentProperties::load(Some(path)).expect("load");
        assert_eq!(
            properties
                .get("blobstore")
                .and_then(|value| value.get("provider"))
                .and_then(Value::as_str),
            Some("dav")
        );
        assert!(properties.get("ntp").is_some());
    }

    #[rstest]
    #[case("[1, 2]")]
    #[case("\"blobstore\"")]
    fn non_object_documents_are_rejected(#[case] document: &str) {
        let err = AgentProperties::from_json(document).expect_err("not an object");
        assert!(matches!(err, AgentPropertiesError::NotAnObject { .. }));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = AgentProperties::from_json("{").expect_err("malformed");
        assert!(matches!(err, AgentPropertiesError::Parse { .. }));
    }

    #[test]
    fn unreadable_file_reports_path() {
        let err = AgentProperties::load(Some("/nonexistent/agent.json")).expect_err("missing");
        assert!(matches!(
            err,
            AgentPropertiesError::FileRead { ref path, .. } if path == "/nonexistent/agent.json"
        ));
    }
}
