//! Controller-facing message shapes.
//!
//! Each lifecycle operation maps onto exactly one [`ControllerRequest`]. The
//! enum is tagged by `type` so a transport can forward it verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent_env::AgentEnvironment;

/// Payload of a "create VM" request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateVm {
    /// Desired VM name (the generated VM identifier).
    pub name: String,
    /// Number of virtual CPUs.
    pub cpu: u32,
    /// Memory in megabytes.
    pub ram: u64,
    /// Stemcell the VM is cloned from.
    pub stemcell: String,
    /// Bootstrap environment exposed to the in-guest agent.
    pub guest_info: AgentEnvironment,
}

/// Request understood by the virtualization controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerRequest {
    /// Registers a previously uploaded image as a stemcell.
    CreateStemcell {
        /// Stemcell name to register.
        name: String,
        /// Name under which the image was uploaded.
        source: String,
    },
    /// Removes a stemcell.
    DeleteStemcell {
        /// Stemcell name.
        name: String,
    },
    /// Creates a VM from a stemcell.
    CreateVm(CreateVm),
    /// Removes a VM.
    DeleteVm {
        /// VM name.
        name: String,
    },
}

impl ControllerRequest {
    /// Operation name used in logs and errors.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::CreateStemcell { .. } => "create_stemcell",
            Self::DeleteStemcell { .. } => "delete_stemcell",
            Self::CreateVm(_) => "create_vm",
            Self::DeleteVm { .. } => "delete_vm",
        }
    }

    /// Name of the resource the request targets.
    #[must_use]
    pub fn resource_name(&self) -> &str {
        match self {
            Self::CreateStemcell { name, .. }
            | Self::DeleteStemcell { name }
            | Self::DeleteVm { name } => name,
            Self::CreateVm(create) => &create.name,
        }
    }
}

impl fmt::Display for ControllerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_are_tagged_by_type() {
        let request = ControllerRequest::CreateStemcell {
            name: String::from("sc-1"),
            source: String::from("sc-1"),
        };
        assert_eq!(
            serde_json::to_value(&request).expect("serialise"),
            json!({ "type": "create_stemcell", "name": "sc-1", "source": "sc-1" })
        );
    }

    #[test]
    fn create_vm_flattens_its_payload() {
        let request = ControllerRequest::CreateVm(CreateVm {
            name: String::from("vm-1"),
            cpu: 2,
            ram: 2048,
            stemcell: String::from("sc-1"),
            guest_info: AgentEnvironment::default(),
        });
        assert_eq!(
            serde_json::to_value(&request).expect("serialise"),
            json!({
                "type": "create_vm",
                "name": "vm-1",
                "cpu": 2,
                "ram": 2048,
                "stemcell": "sc-1",
                "guest_info": {},
            })
        );
        assert_eq!(request.operation(), "create_vm");
        assert_eq!(request.resource_name(), "vm-1");
    }
}
