//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::rpc::Credentials;
use crate::upload::DEFAULT_FILE_UPLOAD_PORT;

/// Driver configuration derived from environment variables, configuration
/// files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "ESXCLOUD",
    discovery(
        app_name = "esxcloud",
        env_var = "ESXCLOUD_CONFIG_PATH",
        config_file_name = "esxcloud.toml",
        dotfile_name = ".esxcloud.toml",
        project_file_name = "esxcloud.toml"
    )
)]
pub struct CloudConfig {
    /// Host of the controller's message endpoint.
    pub mq_host: String,
    /// Port of the controller's message endpoint. Defaults to `4222`.
    #[ortho_config(default = 4222)]
    pub mq_port: u16,
    /// User presented to the message endpoint.
    pub mq_user: Option<String>,
    /// Password presented to the message endpoint.
    pub mq_password: Option<String>,
    /// Host running the ESX management controller; receives image uploads.
    pub esxmgr_host: String,
    /// Port the controller accepts image uploads on.
    #[ortho_config(default = DEFAULT_FILE_UPLOAD_PORT)]
    pub file_upload_port: u16,
    /// Seconds to wait after an upload before assuming it was received.
    #[ortho_config(default = 5)]
    pub upload_settle_secs: u64,
    /// Timeout in seconds for controller requests without their own bound.
    #[ortho_config(default = 60)]
    pub request_timeout_secs: u64,
    /// Timeout in seconds for stemcell registration, which imports the image.
    #[ortho_config(default = 3600)]
    pub stemcell_timeout_secs: u64,
    /// JSON file holding the static properties merged into every agent
    /// environment.
    pub agent_properties_file: Option<String>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to esxcloud.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

impl CloudConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(metadata.missing());
        }
        Ok(())
    }

    fn require_nonzero(value: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be greater than zero: set {} or {} in esxcloud.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("esxcloud")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages include guidance on how to
    /// provide missing values via environment variables or configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty,
    /// [`ConfigError::Invalid`] when a timeout is zero, and
    /// [`ConfigError::Credentials`] when only one of user and password is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.mq_host,
            &FieldMetadata::new("message endpoint host", "ESXCLOUD_MQ_HOST", "mq_host"),
        )?;
        Self::require_field(
            &self.esxmgr_host,
            &FieldMetadata::new("controller host", "ESXCLOUD_ESXMGR_HOST", "esxmgr_host"),
        )?;
        Self::require_nonzero(
            self.request_timeout_secs,
            &FieldMetadata::new(
                "request timeout",
                "ESXCLOUD_REQUEST_TIMEOUT_SECS",
                "request_timeout_secs",
            ),
        )?;
        Self::require_nonzero(
            self.stemcell_timeout_secs,
            &FieldMetadata::new(
                "stemcell timeout",
                "ESXCLOUD_STEMCELL_TIMEOUT_SECS",
                "stemcell_timeout_secs",
            ),
        )?;
        if self.mq_user.is_some() != self.mq_password.is_some() {
            return Err(ConfigError::Credentials);
        }
        Ok(())
    }

    /// Returns the message endpoint as `host:port`.
    #[must_use]
    pub fn mq_endpoint(&self) -> String {
        format!("{}:{}", self.mq_host, self.mq_port)
    }

    /// Returns the message endpoint credentials, when configured.
    #[must_use]
    pub fn mq_credentials(&self) -> Option<Credentials> {
        match (&self.mq_user, &self.mq_password) {
            (Some(user), Some(password)) => Some(Credentials {
                user: user.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// Post-upload settle time.
    #[must_use]
    pub const fn upload_settle_time(&self) -> Duration {
        Duration::from_secs(self.upload_settle_secs)
    }

    /// Default bound on controller requests.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bound on stemcell registration.
    #[must_use]
    pub const fn stemcell_timeout(&self) -> Duration {
        Duration::from_secs(self.stemcell_timeout_secs)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a field holds an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Indicates only one half of the message endpoint credentials is set.
    #[error("mq_user and mq_password must be set together")]
    Credentials,
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
