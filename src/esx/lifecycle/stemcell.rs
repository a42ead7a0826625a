//! Stemcell upload and registration.
//!
//! The image is streamed to the controller host under a generated name, then
//! registered with a single long-running request. Registration imports the
//! image on the controller side, so it gets its own (hour-scale) timeout.

use camino::Utf8Path;
use tracing::info;

use crate::ids::StemcellId;
use crate::messages::ControllerRequest;
use crate::rpc::Transport;

use crate::esx::{EsxCloud, EsxCloudError};

impl<T: Transport> EsxCloud<T> {
    pub(in crate::esx) async fn upload_and_register_stemcell(
        &self,
        image_path: &Utf8Path,
    ) -> Result<StemcellId, EsxCloudError> {
        let stemcell = StemcellId::generate();
        info!(stemcell = %stemcell, image = %image_path, "creating stemcell");

        self.uploader.upload(stemcell.as_str(), image_path).await?;

        let request = ControllerRequest::CreateStemcell {
            name: stemcell.to_string(),
            source: stemcell.to_string(),
        };
        self.rpc.call(request, Some(self.stemcell_timeout)).await?;

        info!(stemcell = %stemcell, "stemcell created");
        Ok(stemcell)
    }

    pub(in crate::esx) async fn remove_stemcell(
        &self,
        stemcell: &StemcellId,
    ) -> Result<(), EsxCloudError> {
        info!(stemcell = %stemcell, "deleting stemcell");
        let request = ControllerRequest::DeleteStemcell {
            name: stemcell.to_string(),
        };
        self.rpc.call(request, None).await?;
        Ok(())
    }
}
