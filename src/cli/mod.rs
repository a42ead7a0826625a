//! Command-line interface definitions for the `esxcloud` binary.
//!
//! The parser lives in its own module so the build script can render the
//! manual page from the same definitions.

use clap::Parser;

/// Top-level CLI for the `esxcloud` binary.
#[derive(Debug, Parser)]
#[command(
    name = "esxcloud",
    about = "Manage stemcells and VMs on an ESX management controller",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Upload an image and register it as a stemcell.
    #[command(name = "create-stemcell", about = "Upload an image and register it as a stemcell")]
    CreateStemcell(CreateStemcellCommand),
    /// Remove a stemcell.
    #[command(name = "delete-stemcell", about = "Remove a stemcell")]
    DeleteStemcell(DeleteStemcellCommand),
    /// Create a VM from a stemcell.
    #[command(name = "create-vm", about = "Create a VM from a stemcell")]
    CreateVm(CreateVmCommand),
    /// Remove a VM.
    #[command(name = "delete-vm", about = "Remove a VM")]
    DeleteVm(DeleteVmCommand),
}

/// Arguments for `esxcloud create-stemcell`.
#[derive(Debug, Parser)]
pub(crate) struct CreateStemcellCommand {
    /// Local path of the stemcell image.
    #[arg(value_name = "IMAGE")]
    pub(crate) image: String,
}

/// Arguments for `esxcloud delete-stemcell`.
#[derive(Debug, Parser)]
pub(crate) struct DeleteStemcellCommand {
    /// Stemcell identifier as printed by `create-stemcell`.
    #[arg(value_name = "STEMCELL")]
    pub(crate) stemcell: String,
}

/// Arguments for `esxcloud create-vm`.
#[derive(Debug, Parser)]
pub(crate) struct CreateVmCommand {
    /// Identifier the in-guest agent reports under.
    #[arg(long, value_name = "ID")]
    pub(crate) agent_id: String,
    /// Stemcell to clone the VM from.
    #[arg(long, value_name = "STEMCELL")]
    pub(crate) stemcell: String,
    /// Number of virtual CPUs.
    #[arg(long, value_name = "COUNT", default_value_t = 1)]
    pub(crate) cpu: u32,
    /// Memory in megabytes.
    #[arg(long, value_name = "MB", default_value_t = 1024)]
    pub(crate) ram: u64,
    /// JSON file describing the networks, keyed by network name.
    ///
    /// Each network must name its virtual switch under
    /// `cloud_properties.name`.
    #[arg(long, value_name = "PATH")]
    pub(crate) networks_file: Option<String>,
}

/// Arguments for `esxcloud delete-vm`.
#[derive(Debug, Parser)]
pub(crate) struct DeleteVmCommand {
    /// VM identifier as printed by `create-vm`.
    #[arg(value_name = "VM")]
    pub(crate) vm: String,
}
