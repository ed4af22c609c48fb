use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::ClientError;
use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        TOKEN_HEADER,
    },
    error::ErrorBody,
    health::Health,
    students::dto::{PaymentRequest, PaymentResponse, ProfileUpdateRequest},
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Reachability probes and the "who am I" call.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Credential submission and other mutations.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The HTTP surface the session manager talks to.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn health(&self) -> Result<Health, ClientError>;
    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ClientError>;
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ClientError>;
    async fn me(&self, token: &str) -> Result<PublicUser, ClientError>;
    async fn list_students(&self) -> Result<Vec<PublicUser>, ClientError>;
    async fn update_profile(
        &self,
        token: &str,
        req: &ProfileUpdateRequest,
    ) -> Result<PublicUser, ClientError>;
    async fn pay_fees(&self, token: &str, req: &PaymentRequest)
        -> Result<PaymentResponse, ClientError>;
}

/// reqwest-backed [`AuthApi`].
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let res = req.send().await?;
        decode(res).await
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let status = res.status();
    if status.is_success() {
        return res.json::<T>().await.map_err(|e| ClientError::Decode(e.to_string()));
    }

    let text = res.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or_else(|_| ErrorBody {
        error: if text.is_empty() { status.to_string() } else { text },
        code: String::new(),
    });
    debug!(%status, code = %body.code, "request rejected");

    if status == StatusCode::UNAUTHORIZED && body.code == "unauthenticated" {
        return Err(ClientError::Unauthenticated);
    }
    Err(ClientError::rejected(status, body.code, body.error))
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn health(&self) -> Result<Health, ClientError> {
        self.send(self.http.get(self.url("/health")).timeout(PROBE_TIMEOUT))
            .await
            .map_err(|e| {
                warn!(error = %e, "server connection test failed");
                e
            })
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        self.send(self.http.post(self.url("/auth/register")).json(req)).await
    }

    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.send(self.http.post(self.url("/auth/login")).json(req)).await
    }

    async fn me(&self, token: &str) -> Result<PublicUser, ClientError> {
        self.send(
            self.http
                .get(self.url("/auth/me"))
                .header(TOKEN_HEADER, token)
                .timeout(PROBE_TIMEOUT),
        )
        .await
    }

    async fn list_students(&self) -> Result<Vec<PublicUser>, ClientError> {
        self.send(self.http.get(self.url("/students"))).await
    }

    async fn update_profile(
        &self,
        token: &str,
        req: &ProfileUpdateRequest,
    ) -> Result<PublicUser, ClientError> {
        self.send(
            self.http
                .put(self.url("/students/profile"))
                .header(TOKEN_HEADER, token)
                .json(req),
        )
        .await
    }

    async fn pay_fees(
        &self,
        token: &str,
        req: &PaymentRequest,
    ) -> Result<PaymentResponse, ClientError> {
        self.send(
            self.http
                .post(self.url("/students/payment"))
                .header(TOKEN_HEADER, token)
                .json(req),
        )
        .await
    }
}
