pub mod auth;
pub mod config;
pub mod transport;

use thiserror::Error;
use tracing::info;

use augur_core::{Document, ModelError, Workspace};

pub use config::{Config, ConfigError, Credentials};
pub use transport::{HttpTransport, Transport, TransportError};

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("fetched workspace is invalid: {0}")]
    Model(#[from] ModelError),
}

/// Sends finished workspaces to the service and reads them back.
pub struct Publisher<T: Transport> {
    transport: T,
}

impl<T: Transport> Publisher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Snapshot the workspace and send it in a single request.
    pub async fn publish(
        &self,
        workspace: &Workspace,
        credentials: &Credentials,
    ) -> Result<(), PublishError> {
        self.publish_document(&workspace.to_document(), credentials)
            .await
    }

    pub async fn publish_document(
        &self,
        document: &Document,
        credentials: &Credentials,
    ) -> Result<(), PublishError> {
        info!(
            credentials = %credentials.masked(),
            elements = document.model.elements.len(),
            relationships = document.model.relationships.len(),
            views = document.views.len(),
            "publishing workspace"
        );
        self.transport.put_workspace(credentials, document).await?;
        info!(workspace = credentials.workspace_id, "workspace published");
        Ok(())
    }

    pub async fn fetch_document(&self, credentials: &Credentials) -> Result<Document, PublishError> {
        let document = self.transport.get_workspace(credentials).await?;
        info!(workspace = credentials.workspace_id, name = %document.name, "workspace fetched");
        Ok(document)
    }

    /// Fetch and rebuild the workspace, checking every model invariant.
    pub async fn fetch(&self, credentials: &Credentials) -> Result<Workspace, PublishError> {
        Ok(self.fetch_document(credentials).await?.into_workspace()?)
    }
}
