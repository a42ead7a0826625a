//! Lifecycle helpers for the ESX cloud driver.
//!
//! Stemcell and VM management go through the controller. Disk management,
//! network reconfiguration and deployment validation have no controller-side
//! implementation and deterministically report [`EsxCloudError::Unsupported`]
//! without touching the transport.

mod stemcell;
mod vm;

use serde_json::Value;
use tracing::info;

use crate::agent_env::Networks;
use crate::ids::{DiskId, VmId};

use super::EsxCloudError;

const fn unsupported(operation: &'static str) -> EsxCloudError {
    EsxCloudError::Unsupported { operation }
}

pub(in crate::esx) fn configure_networks(
    vm: &VmId,
    networks: &Networks,
) -> Result<(), EsxCloudError> {
    let names: Vec<&str> = networks.keys().map(String::as_str).collect();
    info!(vm = %vm, networks = ?names, "configuring networks");
    Err(unsupported("configure_networks"))
}

pub(in crate::esx) fn attach_disk(vm: &VmId, disk: &DiskId) -> Result<(), EsxCloudError> {
    info!(vm = %vm, disk = %disk, "attaching disk");
    Err(unsupported("attach_disk"))
}

pub(in crate::esx) fn detach_disk(vm: &VmId, disk: &DiskId) -> Result<(), EsxCloudError> {
    info!(vm = %vm, disk = %disk, "detaching disk");
    Err(unsupported("detach_disk"))
}

pub(in crate::esx) fn create_disk(
    size_mb: u64,
    vm_locality: Option<&VmId>,
) -> Result<DiskId, EsxCloudError> {
    info!(size_mb, vm = ?vm_locality.map(VmId::as_str), "creating disk");
    Err(unsupported("create_disk"))
}

pub(in crate::esx) fn delete_disk(disk: &DiskId) -> Result<(), EsxCloudError> {
    info!(disk = %disk, "deleting disk");
    Err(unsupported("delete_disk"))
}

pub(in crate::esx) fn validate_deployment(
    _old_manifest: &Value,
    _new_manifest: &Value,
) -> Result<(), EsxCloudError> {
    info!("validating deployment");
    Err(unsupported("validate_deployment"))
}
