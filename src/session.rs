use tokio::sync::watch;

use crate::error::ApiError;
use crate::gateway::PaymentsApi;
use crate::models::{Credentials, User};

/// Who is signed in, passed explicitly to whatever needs to gate admin features.
pub struct Session {
    current: watch::Sender<Option<User>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.borrow().clone()
    }

    pub fn is_admin(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub async fn login(
        &self,
        api: &dyn PaymentsApi,
        credentials: &Credentials,
    ) -> Result<User, ApiError> {
        let user = api.login(credentials).await?;
        tracing::info!("signed in as {} ({})", user.username, user.name);
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// End the session. The local session is cleared even if the server call fails.
    pub async fn logout(&self, api: &dyn PaymentsApi) {
        if let Err(err) = api.logout().await {
            tracing::warn!("server logout failed: {}", err);
        }
        if let Some(user) = self.current.send_replace(None) {
            tracing::info!("signed out {}", user.username);
        }
    }
}
