//! Cloud provider interface consumed by the deployment orchestrator.

use std::future::Future;
use std::pin::Pin;

use camino::Utf8Path;
use serde_json::Value;
use thiserror::Error;

use crate::agent_env::Networks;
use crate::ids::{DiskId, StemcellId, VmId};

/// Compute resources requested for a VM.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResourcePool {
    /// Number of virtual CPUs.
    pub cpu: u32,
    /// Memory in megabytes.
    pub ram: u64,
}

/// Parameters required to create a new VM.
#[derive(Clone, Debug, PartialEq)]
pub struct VmRequest {
    /// Identifier the in-guest agent reports under.
    pub agent_id: String,
    /// Stemcell the VM is cloned from.
    pub stemcell: StemcellId,
    /// CPU and memory sizing.
    pub resource_pool: ResourcePool,
    /// Manifest networks the VM joins.
    pub networks: Networks,
    /// Disks the VM should be placed near. Accepted but not yet honoured.
    pub disk_locality: Vec<DiskId>,
}

impl VmRequest {
    /// Starts a builder for a [`VmRequest`].
    #[must_use]
    pub fn builder() -> VmRequestBuilder {
        VmRequestBuilder::new()
    }

    /// Validates the request, returning a descriptive error when a required
    /// field is missing.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when `agent_id` or `stemcell` is
    /// empty, or when `cpu` or `ram` is zero.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.agent_id.is_empty() {
            return Err(RequestError::Validation("agent_id".to_owned()));
        }
        if self.stemcell.is_empty() {
            return Err(RequestError::Validation("stemcell".to_owned()));
        }
        if self.resource_pool.cpu == 0 {
            return Err(RequestError::Validation("cpu".to_owned()));
        }
        if self.resource_pool.ram == 0 {
            return Err(RequestError::Validation("ram".to_owned()));
        }
        Ok(())
    }
}

/// Builder for [`VmRequest`] that defers trimming and validation to
/// construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VmRequestBuilder {
    agent_id: String,
    stemcell: String,
    cpu: u32,
    ram: u64,
    networks: Networks,
    disk_locality: Vec<DiskId>,
}

impl VmRequestBuilder {
    /// Creates an empty builder; fields must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the agent identifier.
    #[must_use]
    pub fn agent_id(mut self, value: impl Into<String>) -> Self {
        self.agent_id = value.into();
        self
    }

    /// Sets the stemcell.
    #[must_use]
    pub fn stemcell(mut self, value: impl Into<String>) -> Self {
        self.stemcell = value.into();
        self
    }

    /// Sets the CPU count.
    #[must_use]
    pub const fn cpu(mut self, value: u32) -> Self {
        self.cpu = value;
        self
    }

    /// Sets the memory size in megabytes.
    #[must_use]
    pub const fn ram(mut self, value: u64) -> Self {
        self.ram = value;
        self
    }

    /// Sets the networks.
    #[must_use]
    pub fn networks(mut self, value: Networks) -> Self {
        self.networks = value;
        self
    }

    /// Sets the disk locality hint.
    #[must_use]
    pub fn disk_locality(mut self, value: Vec<DiskId>) -> Self {
        self.disk_locality = value;
        self
    }

    /// Builds and validates the [`VmRequest`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when any required field is empty.
    pub fn build(self) -> Result<VmRequest, RequestError> {
        let request = VmRequest {
            agent_id: self.agent_id.trim().to_owned(),
            stemcell: StemcellId::from(self.stemcell.trim()),
            resource_pool: ResourcePool {
                cpu: self.cpu,
                ram: self.ram,
            },
            networks: self.networks,
            disk_locality: self.disk_locality,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Errors raised while validating lifecycle requests.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// Raised when a request is missing a required field.
    #[error("missing or empty field: {0}")]
    Validation(String),
}

/// Future returned by cloud operations.
pub type CloudFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Lifecycle operations a cloud provider exposes to the orchestrator.
///
/// Each resource is either absent or present; a create either returns the
/// identifier of a present resource or fails entirely.
pub trait Cloud {
    /// Provider specific error type returned by the cloud.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Uploads the image at `image_path` and registers it as a stemcell.
    fn create_stemcell<'a>(
        &'a self,
        image_path: &'a Utf8Path,
    ) -> CloudFuture<'a, StemcellId, Self::Error>;

    /// Removes a stemcell.
    fn delete_stemcell<'a>(&'a self, stemcell: &'a StemcellId) -> CloudFuture<'a, (), Self::Error>;

    /// Creates a VM and returns its identifier.
    fn create_vm<'a>(&'a self, request: &'a VmRequest) -> CloudFuture<'a, VmId, Self::Error>;

    /// Removes a VM.
    fn delete_vm<'a>(&'a self, vm: &'a VmId) -> CloudFuture<'a, (), Self::Error>;

    /// Reconfigures the networks of a running VM.
    fn configure_networks<'a>(
        &'a self,
        vm: &'a VmId,
        networks: &'a Networks,
    ) -> CloudFuture<'a, (), Self::Error>;

    /// Attaches a persistent disk to a VM.
    fn attach_disk<'a>(
        &'a self,
        vm: &'a VmId,
        disk: &'a DiskId,
    ) -> CloudFuture<'a, (), Self::Error>;

    /// Detaches a persistent disk from a VM.
    fn detach_disk<'a>(
        &'a self,
        vm: &'a VmId,
        disk: &'a DiskId,
    ) -> CloudFuture<'a, (), Self::Error>;

    /// Creates a persistent disk of `size_mb` megabytes, optionally near `vm`.
    fn create_disk<'a>(
        &'a self,
        size_mb: u64,
        vm_locality: Option<&'a VmId>,
    ) -> CloudFuture<'a, DiskId, Self::Error>;

    /// Removes a persistent disk.
    fn delete_disk<'a>(&'a self, disk: &'a DiskId) -> CloudFuture<'a, (), Self::Error>;

    /// Checks whether moving from `old_manifest` to `new_manifest` is possible.
    fn validate_deployment<'a>(
        &'a self,
        old_manifest: &'a Value,
        new_manifest: &'a Value,
    ) -> CloudFuture<'a, (), Self::Error>;
}
