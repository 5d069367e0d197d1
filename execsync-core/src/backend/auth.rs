//! Local sign-in service.

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use super::{AuthService, Identity};
use crate::error::{ExecSyncError, ExecSyncResult};

/// Sign-in without a remote identity provider.
///
/// Anonymous sign-in mints a fresh uid per call. Custom tokens map to a
/// stable uid so the same token always yields the same identity.
pub struct LocalAuth {
    state: watch::Sender<Option<Identity>>,
}

impl LocalAuth {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        LocalAuth { state }
    }
}

impl Default for LocalAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn sign_in_anonymously(&self) -> ExecSyncResult<Identity> {
        let identity = Identity {
            uid: Uuid::new_v4().simple().to_string(),
            anonymous: true,
        };
        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in_with_custom_token(&self, token: &str) -> ExecSyncResult<Identity> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ExecSyncError::Auth("custom token is empty".into()));
        }

        let identity = Identity {
            uid: Uuid::new_v5(&Uuid::NAMESPACE_OID, token.as_bytes())
                .simple()
                .to_string(),
            anonymous: false,
        };
        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> ExecSyncResult<()> {
        self.state.send_replace(None);
        Ok(())
    }

    fn on_auth_state_changed(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anonymous_sign_in_publishes_identity() {
        let auth = LocalAuth::new();
        let mut changes = auth.on_auth_state_changed();
        assert!(changes.borrow().is_none());

        let identity = auth.sign_in_anonymously().await.unwrap();
        assert!(identity.anonymous);

        changes.changed().await.unwrap();
        assert_eq!(changes.borrow().as_ref(), Some(&identity));
    }

    #[tokio::test]
    async fn custom_token_yields_stable_uid() {
        let auth = LocalAuth::new();
        let first = auth.sign_in_with_custom_token("office-token").await.unwrap();
        let second = auth.sign_in_with_custom_token("office-token").await.unwrap();
        assert_eq!(first, second);
        assert!(!first.anonymous);
    }

    #[tokio::test]
    async fn blank_custom_token_fails() {
        let auth = LocalAuth::new();
        let err = auth.sign_in_with_custom_token("   ").await.unwrap_err();
        assert!(matches!(err, ExecSyncError::Auth(_)));
        assert!(auth.on_auth_state_changed().borrow().is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_identity() {
        let auth = LocalAuth::new();
        auth.sign_in_anonymously().await.unwrap();
        auth.sign_out().await.unwrap();
        assert!(auth.on_auth_state_changed().borrow().is_none());
    }
}
