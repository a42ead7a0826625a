//! VM creation and removal.

use tracing::{debug, info};

use crate::agent_env::{
    DiskEnvironment, build_agent_environment, build_network_env, placeholder_devices,
};
use crate::cloud::VmRequest;
use crate::ids::VmId;
use crate::messages::{ControllerRequest, CreateVm};
use crate::rpc::Transport;

use crate::esx::{EsxCloud, EsxCloudError};

impl<T: Transport> EsxCloud<T> {
    /// Creates a VM from a stemcell.
    ///
    /// Every network gets a device on its virtual switch with a placeholder
    /// MAC; the controller assigns the real address. The disk locality hint is
    /// accepted but not yet honoured.
    pub(in crate::esx) async fn clone_vm(
        &self,
        request: &VmRequest,
    ) -> Result<VmId, EsxCloudError> {
        request.validate()?;
        let vm = VmId::generate();
        info!(
            vm = %vm,
            agent_id = %request.agent_id,
            stemcell = %request.stemcell,
            "creating vm"
        );
        if !request.disk_locality.is_empty() {
            debug!(vm = %vm, disks = request.disk_locality.len(), "ignoring disk locality hint");
        }

        let devices = placeholder_devices(&request.networks)?;
        let network_env = build_network_env(&devices, &request.networks);
        let guest_info = build_agent_environment(
            vm.as_str(),
            vm.as_str(),
            &request.agent_id,
            &network_env,
            &DiskEnvironment::initial(),
            &self.agent_properties,
        );

        let create = ControllerRequest::CreateVm(CreateVm {
            name: vm.to_string(),
            cpu: request.resource_pool.cpu,
            ram: request.resource_pool.ram,
            stemcell: request.stemcell.to_string(),
            guest_info,
        });
        self.rpc
            .call(create, None)
            .await
            .map_err(|source| EsxCloudError::VmCreateFailed {
                vm: vm.to_string(),
                source,
            })?;

        info!(vm = %vm, "vm created");
        Ok(vm)
    }

    pub(in crate::esx) async fn remove_vm(&self, vm: &VmId) -> Result<(), EsxCloudError> {
        info!(vm = %vm, "deleting vm");
        let request = ControllerRequest::DeleteVm {
            name: vm.to_string(),
        };
        self.rpc.call(request, None).await?;
        Ok(())
    }
}
