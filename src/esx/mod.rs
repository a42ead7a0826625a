//! ESX management controller implementation of the cloud lifecycle.
//!
//! Lifecycle verbs become controller requests sent over the message
//! transport; stemcell images are first staged on the controller host through
//! the bulk upload port.

mod error;
mod lifecycle;

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8Path;
use serde_json::Value;
use tracing::info;

use crate::agent_env::Networks;
use crate::agent_properties::AgentProperties;
use crate::cloud::{Cloud, CloudFuture, VmRequest};
use crate::config::CloudConfig;
use crate::ids::{DiskId, StemcellId, VmId};
use crate::rpc::{EventLoop, LoopManager, RequestCorrelator, RpcClient, TcpTransport, Transport};
use crate::upload::FileUploader;

pub use error::EsxCloudError;

/// Cloud driver backed by an ESX management controller.
#[derive(Debug)]
pub struct EsxCloud<T> {
    rpc: RpcClient<T>,
    uploader: FileUploader,
    agent_properties: AgentProperties,
    stemcell_timeout: Duration,
}

impl EsxCloud<TcpTransport> {
    /// Builds a driver that talks to the controller over TCP, starting the
    /// transport loop before returning.
    ///
    /// # Errors
    ///
    /// Returns [`EsxCloudError::Config`] when configuration or agent
    /// properties are invalid and [`EsxCloudError::Rpc`] when the transport
    /// loop cannot be started.
    pub async fn from_config(config: &CloudConfig) -> Result<Self, EsxCloudError> {
        config.validate()?;
        let agent_properties = AgentProperties::load(config.agent_properties_file.as_deref())?;
        let transport = TcpTransport::new(config.mq_endpoint(), config.mq_credentials());
        let loop_manager = LoopManager::new(transport.clone());
        Self::connect(
            config,
            transport,
            &loop_manager,
            Arc::new(RequestCorrelator::new()),
            agent_properties,
        )
        .await
    }
}

impl<T: Transport> EsxCloud<T> {
    /// Builds a driver on an existing transport. The loop behind
    /// `loop_manager` is started if it is not already running.
    ///
    /// # Errors
    ///
    /// Returns [`EsxCloudError::Config`] when the configuration is invalid
    /// and [`EsxCloudError::Rpc`] when the transport loop cannot be started.
    pub async fn connect<L: EventLoop>(
        config: &CloudConfig,
        transport: T,
        loop_manager: &LoopManager<L>,
        correlator: Arc<RequestCorrelator>,
        agent_properties: AgentProperties,
    ) -> Result<Self, EsxCloudError> {
        config.validate()?;
        info!(
            mq = %config.mq_endpoint(),
            esxmgr = %config.esxmgr_host,
            "connecting to controller"
        );
        let rpc = RpcClient::connect(transport, loop_manager, correlator)
            .await?
            .with_default_timeout(config.request_timeout());
        let uploader = FileUploader::new(&config.esxmgr_host, config.file_upload_port)
            .with_settle_time(config.upload_settle_time());
        Ok(Self {
            rpc,
            uploader,
            agent_properties,
            stemcell_timeout: config.stemcell_timeout(),
        })
    }

    /// Returns the transport used for controller requests.
    #[must_use]
    pub const fn transport(&self) -> &T {
        self.rpc.transport()
    }
}

impl<T: Transport> Cloud for EsxCloud<T> {
    type Error = EsxCloudError;

    fn create_stemcell<'a>(
        &'a self,
        image_path: &'a Utf8Path,
    ) -> CloudFuture<'a, StemcellId, Self::Error> {
        Box::pin(async move { self.upload_and_register_stemcell(image_path).await })
    }

    fn delete_stemcell<'a>(&'a self, stemcell: &'a StemcellId) -> CloudFuture<'a, (), Self::Error> {
        Box::pin(async move { self.remove_stemcell(stemcell).await })
    }

    fn create_vm<'a>(&'a self, request: &'a VmRequest) -> CloudFuture<'a, VmId, Self::Error> {
        Box::pin(async move { self.clone_vm(request).await })
    }

    fn delete_vm<'a>(&'a self, vm: &'a VmId) -> CloudFuture<'a, (), Self::Error> {
        Box::pin(async move { self.remove_vm(vm).await })
    }

    fn configure_networks<'a>(
        &'a self,
        vm: &'a VmId,
        networks: &'a Networks,
    ) -> CloudFuture<'a, (), Self::Error> {
        Box::pin(async move { lifecycle::configure_networks(vm, networks) })
    }

    fn attach_disk<'a>(
        &'a self,
        vm: &'a VmId,
        disk: &'a DiskId,
    ) -> CloudFuture<'a, (), Self::Error> {
        Box::pin(async move { lifecycle::attach_disk(vm, disk) })
    }

    fn detach_disk<'a>(
        &'a self,
        vm: &'a VmId,
        disk: &'a DiskId,
    ) -> CloudFuture<'a, (), Self::Error> {
        Box::pin(async move { lifecycle::detach_disk(vm, disk) })
    }

    fn create_disk<'a>(
        &'a self,
        size_mb: u64,
        vm_locality: Option<&'a VmId>,
    ) -> CloudFuture<'a, DiskId, Self::Error> {
        Box::pin(async move { lifecycle::create_disk(size_mb, vm_locality) })
    }

    fn delete_disk<'a>(&'a self, disk: &'a DiskId) -> CloudFuture<'a, (), Self::Error> {
        Box::pin(async move { lifecycle::delete_disk(disk) })
    }

    fn validate_deployment<'a>(
        &'a self,
        old_manifest: &'a Value,
        new_manifest: &'a Value,
    ) -> CloudFuture<'a, (), Self::Error> {
        Box::pin(async move { lifecycle::validate_deployment(old_manifest, new_manifest) })
    }
}
