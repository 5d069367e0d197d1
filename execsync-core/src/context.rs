//! Service handles shared by the store and the notification dispatcher.

use std::sync::Arc;

use crate::backend::{
    CollectionPath, LocalAuth, LocalDocumentStore, SharedAuth, SharedDocuments,
};
use crate::config::ExecSyncConfig;
use crate::error::ExecSyncResult;

/// Connections to the auth service and document database plus the fixed
/// identifiers of this deployment. Built once per session and disposed when
/// the session ends.
#[derive(Clone)]
pub struct ServiceContext {
    pub auth: SharedAuth,
    pub documents: SharedDocuments,
    pub collection: CollectionPath,
    pub office_id: String,
    pub username: String,
    pub auth_token: Option<String>,
}

impl ServiceContext {
    pub fn new(
        auth: SharedAuth,
        documents: SharedDocuments,
        app_id: &str,
        office_id: &str,
        username: &str,
    ) -> ExecSyncResult<Self> {
        Ok(ServiceContext {
            auth,
            documents,
            collection: CollectionPath::appointments(app_id)?,
            office_id: office_id.to_string(),
            username: username.to_string(),
            auth_token: None,
        })
    }

    /// Session context backed by the local services described in `config`.
    pub fn init(config: &ExecSyncConfig) -> ExecSyncResult<Self> {
        let documents = LocalDocumentStore::file_backed(config.data_path(), config.poll_interval);
        let mut context = Self::new(
            Arc::new(LocalAuth::new()),
            Arc::new(documents),
            &config.app_id,
            &config.office_id,
            &config.username,
        )?;
        context.auth_token = config.auth_token.clone();
        tracing::debug!(collection = %context.collection, office = %context.office_id, "service context ready");
        Ok(context)
    }

    /// End the session: sign out. Subscriptions must already be released.
    pub async fn dispose(self) -> ExecSyncResult<()> {
        self.auth.sign_out().await?;
        tracing::debug!("service context disposed");
        Ok(())
    }
}
