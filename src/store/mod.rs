//! Credential store: the persisted user records behind the API.
//!
//! Handlers only see the [`UserStore`] trait object held in
//! [`AppState`](crate::state::AppState). Emails are normalized
//! (trimmed, lowercased) by every implementation before they are compared or
//! written, so uniqueness is case-insensitive.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// Placeholder persisted instead of the card verification code.
pub const MASKED_CVV: &str = "***";

/// Masked payment metadata kept after a successful fee payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub last_four_digits: String,
    pub expiry_date: String,
    pub cvv_masked: String,
    #[serde(with = "time::serde::rfc3339")]
    pub payment_date: OffsetDateTime,
}

/// User record as stored, including the password hash.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub fees_paid: bool,
    pub payment_details: Option<PaymentDetails>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with [`StoreError::DuplicateEmail`] when the
    /// normalized email is taken.
    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    /// Replace name and email. Keeping one's own email is not a conflict.
    async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
    ) -> Result<UserRecord, StoreError>;

    /// Mark fees as paid and overwrite the masked payment details.
    async fn record_payment(
        &self,
        id: Uuid,
        last_four: &str,
        expiry_date: &str,
    ) -> Result<UserRecord, StoreError>;

    /// All users in insertion order.
    async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
