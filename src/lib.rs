//! Cloud provider driver for an ESX management controller.
//!
//! The crate implements the lifecycle interface a deployment orchestrator
//! uses to manage stemcells and VMs. Lifecycle verbs become correlated
//! request/response exchanges with the controller over a message transport
//! whose event loop is started lazily, exactly once per process. Stemcell
//! images are staged on the controller host through a raw bulk upload before
//! they are registered, and every new VM receives an agent environment
//! describing its identity, networks and disks.

pub mod agent_env;
pub mod agent_properties;
pub mod cloud;
pub mod config;
pub mod esx;
pub mod ids;
pub mod messages;
pub mod rpc;
pub mod test_support;
pub mod upload;
mod util;

pub use agent_env::{AgentEnvironment, DiskEnvironment, NetworkSpec, Networks};
pub use agent_properties::{AgentProperties, AgentPropertiesError};
pub use cloud::{Cloud, CloudFuture, RequestError, ResourcePool, VmRequest, VmRequestBuilder};
pub use config::{CloudConfig, ConfigError};
pub use esx::{EsxCloud, EsxCloudError};
pub use ids::{DiskId, StemcellId, VmId};
pub use messages::ControllerRequest;
pub use rpc::{LoopManager, RequestCorrelator, RpcClient, RpcError, TcpTransport, Transport};
pub use upload::{FileUploader, UploadError};
