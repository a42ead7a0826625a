//! Agent bootstrap environment assembly.
//!
//! The in-guest agent receives a single JSON document at VM creation time that
//! describes its identity, the networks it is attached to (with the MAC of the
//! matching virtual device), its disk topology and the deployment-wide static
//! properties. Everything here is pure data transformation.

use std::collections::BTreeMap;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::warn;

use crate::agent_properties::AgentProperties;
use crate::util::read_to_string_ambient;

/// MAC handed to the controller for every device of a new VM; the controller
/// assigns the real address.
pub const PLACEHOLDER_MAC: &str = "00:00:00:00:00:00";

/// Unit number of the system disk.
pub const SYSTEM_DISK_UNIT: u32 = 0;

/// Unit number of the ephemeral disk.
pub const EPHEMERAL_DISK_UNIT: u32 = 1;

/// Errors raised while deriving devices from manifest networks.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EnvironmentError {
    /// Raised when a network does not name its virtual switch.
    #[error("network '{network}' has no cloud_properties.name (virtual switch)")]
    MissingSwitchName {
        /// Manifest name of the offending network.
        network: String,
    },
    /// Raised when a networks document cannot be read or parsed.
    #[error("failed to load networks from `{path}`: {message}")]
    NetworksFile {
        /// Path of the document.
        path: String,
        /// Underlying error message.
        message: String,
    },
}

/// Virtual network device attached to a VM.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Name of the virtual switch the device is plugged into.
    pub vswitch: String,
    /// MAC address of the device.
    pub mac: String,
}

/// Network definition as supplied by the deployment manifest.
///
/// The definition is carried opaquely; only `cloud_properties.name` (the
/// virtual switch name) is interpreted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkSpec(Map<String, Value>);

impl NetworkSpec {
    /// Wraps a manifest network definition.
    #[must_use]
    pub const fn new(definition: Map<String, Value>) -> Self {
        Self(definition)
    }

    /// Returns the configured virtual switch name, if any.
    #[must_use]
    pub fn switch_name(&self) -> Option<&str> {
        self.0
            .get("cloud_properties")?
            .get("name")?
            .as_str()
    }

    /// Returns the raw definition.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for NetworkSpec {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Manifest networks keyed by network name.
pub type Networks = BTreeMap<String, NetworkSpec>;

/// Reads manifest networks from a JSON object keyed by network name.
///
/// # Errors
///
/// Returns [`EnvironmentError::NetworksFile`] when the file cannot be read or
/// does not hold a JSON object of network definitions.
pub fn load_networks(path: &Utf8Path) -> Result<Networks, EnvironmentError> {
    let failed = |message: String| EnvironmentError::NetworksFile {
        path: path.to_string(),
        message,
    };
    let contents = read_to_string_ambient(path).map_err(failed)?;
    serde_json::from_str(&contents).map_err(|err| failed(err.to_string()))
}

/// Network definitions enriched with device MACs, keyed by network name.
pub type NetworkEnvironment = BTreeMap<String, Map<String, Value>>;

/// Builds the device list for a new VM: one device per network, plugged into
/// the network's switch and carrying [`PLACEHOLDER_MAC`].
///
/// # Errors
///
/// Returns [`EnvironmentError::MissingSwitchName`] when a network does not
/// name its virtual switch.
pub fn placeholder_devices(networks: &Networks) -> Result<Vec<Device>, EnvironmentError> {
    networks
        .iter()
        .map(|(name, network)| {
            network
                .switch_name()
                .map(|vswitch| Device {
                    vswitch: vswitch.to_owned(),
                    mac: PLACEHOLDER_MAC.to_owned(),
                })
                .ok_or_else(|| EnvironmentError::MissingSwitchName {
                    network: name.clone(),
                })
        })
        .collect()
}

/// Copies each network definition and attaches the MAC of the first device
/// plugged into the network's switch. Networks without a matching device are
/// copied unchanged, without a `mac` key.
#[must_use]
pub fn build_network_env(devices: &[Device], networks: &Networks) -> NetworkEnvironment {
    networks
        .iter()
        .map(|(name, network)| {
            let mut entry = network.as_map().clone();
            let matching = network.switch_name().and_then(|switch| {
                devices.iter().find(|device| device.vswitch == switch)
            });
            if let Some(device) = matching {
                entry.insert(String::from("mac"), Value::String(device.mac.clone()));
            }
            (name.clone(), entry)
        })
        .collect()
}

/// Disk topology reported to the agent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskEnvironment {
    /// Unit number of the system disk.
    pub system: u32,
    /// Unit number of the ephemeral disk.
    pub ephemeral: u32,
    /// Persistent disks keyed by disk identifier.
    pub persistent: BTreeMap<String, Value>,
}

impl DiskEnvironment {
    /// Topology of a freshly created VM: system and ephemeral disks only.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            system: SYSTEM_DISK_UNIT,
            ephemeral: EPHEMERAL_DISK_UNIT,
            persistent: BTreeMap::new(),
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "system": self.system,
            "ephemeral": self.ephemeral,
            "persistent": self.persistent,
        })
    }
}

/// Bootstrap document handed to the in-guest agent. Immutable once built.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentEnvironment(Map<String, Value>);

impl AgentEnvironment {
    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterates over the top-level keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the document has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Assembles the agent environment for a VM.
///
/// Computed fields (`name`, `id`, `agent_id`, `networks`, `disks`) are written
/// first and the static properties are merged last, so a static property
/// replaces a computed field of the same name. Such collisions are logged.
#[must_use]
pub fn build_agent_environment(
    name: &str,
    vm_id: &str,
    agent_id: &str,
    network_env: &NetworkEnvironment,
    disk_env: &DiskEnvironment,
    static_properties: &AgentProperties,
) -> AgentEnvironment {
    let networks: Map<String, Value> = network_env
        .iter()
        .map(|(network, entry)| (network.clone(), Value::Object(entry.clone())))
        .collect();

    let mut env = Map::new();
    env.insert(String::from("name"), Value::String(name.to_owned()));
    env.insert(String::from("id"), Value::String(vm_id.to_owned()));
    env.insert(String::from("agent_id"), Value::String(agent_id.to_owned()));
    env.insert(String::from("networks"), Value::Object(networks));
    env.insert(String::from("disks"), disk_env.to_value());

    for (key, value) in static_properties.iter() {
        if env.insert(key.clone(), value.clone()).is_some() {
            warn!(key = %key, "static agent property replaces computed field");
        }
    }

    AgentEnvironment(env)
}
