//! Error types for the ESX cloud driver.

use thiserror::Error;

use crate::agent_env::EnvironmentError;
use crate::agent_properties::AgentPropertiesError;
use crate::cloud::RequestError;
use crate::config::ConfigError;
use crate::rpc::RpcError;
use crate::upload::UploadError;

/// Errors raised by the ESX cloud driver.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EsxCloudError {
    /// Raised when the driver configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when a lifecycle request is missing a required field.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Raised when a manifest network cannot be mapped to a virtual switch.
    #[error("invalid network '{network}': no virtual switch configured")]
    InvalidNetwork {
        /// Manifest name of the network.
        network: String,
    },
    /// Raised when a controller call fails or times out.
    #[error("controller request failed: {0}")]
    Rpc(#[from] RpcError),
    /// Raised when the controller does not create a requested VM.
    #[error("failed to create vm {vm}: {source}")]
    VmCreateFailed {
        /// Name the VM would have had.
        vm: String,
        /// Underlying controller failure.
        #[source]
        source: RpcError,
    },
    /// Raised when staging an image on the controller host fails.
    #[error("stemcell upload failed: {0}")]
    Upload(#[from] UploadError),
    /// Raised for lifecycle operations the controller does not implement.
    #[error("unsupported operation: {operation}")]
    Unsupported {
        /// Name of the lifecycle operation.
        operation: &'static str,
    },
}

impl EsxCloudError {
    /// Returns `true` for [`EsxCloudError::Unsupported`].
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

impl From<ConfigError> for EsxCloudError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<AgentPropertiesError> for EsxCloudError {
    fn from(value: AgentPropertiesError) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<RequestError> for EsxCloudError {
    fn from(value: RequestError) -> Self {
        match value {
            RequestError::Validation(field) => Self::Validation(field),
        }
    }
}

impl From<EnvironmentError> for EsxCloudError {
    fn from(value: EnvironmentError) -> Self {
        match value {
            EnvironmentError::MissingSwitchName { network } => Self::InvalidNetwork { network },
            other @ EnvironmentError::NetworksFile { .. } => Self::Config(other.to_string()),
        }
    }
}
