use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    api::AuthApi,
    error::ClientError,
    state::{SessionEvent, SessionState, SessionStatus},
    token_store::TokenStore,
};
use crate::{
    auth::dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
    card::PaymentForm,
    students::dto::{PaymentRequest, ProfileUpdateRequest},
};

/// Owns the client session: drives [`AuthApi`] calls, feeds their outcomes
/// through the reducer and keeps the [`TokenStore`] in step with the state.
pub struct SessionManager<A> {
    api: A,
    tokens: Arc<dyn TokenStore>,
    state: Mutex<SessionState>,
}

impl<A: AuthApi> SessionManager<A> {
    pub fn new(api: A, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            tokens,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    pub async fn user(&self) -> Option<PublicUser> {
        self.state.lock().await.user.clone()
    }

    /// Apply one event and persist the resulting token. Returns the new state.
    pub async fn dispatch(&self, event: SessionEvent) -> SessionState {
        let mut state = self.state.lock().await;
        let previous = state.token.clone();
        let next = std::mem::take(&mut *state).reduce(event);
        // A signed-out state always clears storage, even if this process never
        // loaded the token it is replacing.
        if next.token != previous || next.token.is_none() {
            self.persist(next.token.as_deref());
        }
        *state = next.clone();
        next
    }

    fn persist(&self, token: Option<&str>) {
        let result = match token {
            Some(t) => self.tokens.save(t),
            None => self.tokens.clear(),
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to persist session token");
        }
    }

    /// Restore a persisted session, loading the user if a token was found.
    pub async fn start(&self) -> SessionState {
        let token = self.tokens.load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read persisted token");
            None
        });
        let state = self.dispatch(SessionEvent::Started { token }).await;
        if state.is_loading() {
            if let Err(e) = self.fetch_user(state.generation, state.token).await {
                debug!(error = %e, "session restore did not authenticate");
            }
        }
        self.snapshot().await
    }

    /// Reload the current user with the held token. Also the retry path out
    /// of [`SessionStatus::ServerUnreachable`].
    pub async fn load_user(&self) -> Result<PublicUser, ClientError> {
        let state = self.dispatch(SessionEvent::LoadStarted).await;
        if !state.is_loading() {
            return Err(ClientError::Unauthenticated);
        }
        self.fetch_user(state.generation, state.token).await
    }

    async fn fetch_user(
        &self,
        generation: u64,
        token: Option<String>,
    ) -> Result<PublicUser, ClientError> {
        let Some(token) = token else {
            return Err(ClientError::Unauthenticated);
        };

        if let Err(e) = self.api.health().await {
            debug!(error = %e, "health probe failed before user load");
            self.dispatch(SessionEvent::LoadUnreachable { generation }).await;
            return Err(ClientError::ServerUnavailable);
        }

        match self.api.me(&token).await {
            Ok(user) => {
                let state = self
                    .dispatch(SessionEvent::UserLoaded {
                        generation,
                        user: user.clone(),
                    })
                    .await;
                if state.generation != generation || !state.is_authenticated() {
                    return Err(ClientError::Superseded);
                }
                Ok(user)
            }
            Err(e) if e.is_auth_failure() => {
                info!("stored token was refused, signing out");
                self.dispatch(SessionEvent::LoadRejected { generation }).await;
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "user load failed, keeping token");
                self.dispatch(SessionEvent::LoadUnreachable { generation }).await;
                Err(e)
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, ClientError> {
        self.ensure_server().await?;
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.api.login(&req).await;
        self.finish_credentials(result).await
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, ClientError> {
        self.ensure_server().await?;
        let req = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = self.api.register(&req).await;
        self.finish_credentials(result).await
    }

    async fn ensure_server(&self) -> Result<(), ClientError> {
        self.api.health().await.map(|_| ()).map_err(|e| {
            warn!(error = %e, "server is not available");
            ClientError::ServerUnavailable
        })
    }

    async fn finish_credentials(
        &self,
        result: Result<AuthResponse, ClientError>,
    ) -> Result<PublicUser, ClientError> {
        match result {
            Ok(AuthResponse { token, user }) => {
                info!(user_id = %user.id, "signed in");
                self.dispatch(SessionEvent::LoggedIn {
                    token,
                    user: user.clone(),
                })
                .await;
                Ok(user)
            }
            // Network trouble says nothing about the credentials.
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                self.dispatch(SessionEvent::CredentialsRejected).await;
                Err(e)
            }
        }
    }

    pub async fn logout(&self) -> SessionState {
        info!("signed out");
        self.dispatch(SessionEvent::LoggedOut).await
    }

    pub async fn list_students(&self) -> Result<Vec<PublicUser>, ClientError> {
        self.api.list_students().await
    }

    pub async fn update_profile(&self, name: &str, email: &str) -> Result<PublicUser, ClientError> {
        let token = self.require_token().await?;
        let req = ProfileUpdateRequest {
            name: name.to_string(),
            email: email.to_string(),
        };
        match self.api.update_profile(&token, &req).await {
            Ok(user) => {
                self.dispatch(SessionEvent::UserUpdated { user: user.clone() }).await;
                Ok(user)
            }
            Err(e) => Err(self.guarded_failure(e).await),
        }
    }

    /// Validate the form locally, then submit it. Only the number, expiry and
    /// CVV leave the process.
    pub async fn pay_fees(&self, form: &PaymentForm) -> Result<PublicUser, ClientError> {
        form.validate().map_err(|e| ClientError::Validation(e.to_string()))?;
        let token = self.require_token().await?;
        let req = PaymentRequest {
            card_number: form.card_number.clone(),
            expiry_date: form.expiry_date.clone(),
            cvv: form.cvv.clone(),
        };
        match self.api.pay_fees(&token, &req).await {
            Ok(res) => {
                if res.success {
                    self.dispatch(SessionEvent::UserUpdated {
                        user: res.user.clone(),
                    })
                    .await;
                }
                Ok(res.user)
            }
            Err(e) => Err(self.guarded_failure(e).await),
        }
    }

    async fn require_token(&self) -> Result<String, ClientError> {
        let state = self.state.lock().await;
        match (&state.status, &state.token) {
            (SessionStatus::Authenticated, Some(token)) => Ok(token.clone()),
            _ => Err(ClientError::Unauthenticated),
        }
    }

    async fn guarded_failure(&self, e: ClientError) -> ClientError {
        if e.is_auth_failure() {
            info!("session was refused by the server");
            self.dispatch(SessionEvent::SessionExpired).await;
        }
        e
    }
}
