use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    normalize_email, NewUser, PaymentDetails, StoreError, UserRecord, UserStore, MASKED_CVV,
};

/// In-process user store. Writes are serialized by the lock, which is what
/// makes the email uniqueness check atomic here.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a user, as an administrator would out of band.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        users.len() != before
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
        let email = normalize_email(&new_user.email);
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: new_user.name.trim().to_string(),
            email,
            password_hash: new_user.password_hash,
            fees_paid: false,
            payment_details: None,
            created_at: now,
            updated_at: now,
        };
        users.push(record.clone());
        debug!(user_id = %record.id, "user inserted");
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
    ) -> Result<UserRecord, StoreError> {
        let email = normalize_email(email);
        let mut users = self.users.write().await;
        let idx = users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        if users.iter().any(|u| u.email == email && u.id != id) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = &mut users[idx];
        user.name = name.trim().to_string();
        user.email = email;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn record_payment(
        &self,
        id: Uuid,
        last_four: &str,
        expiry_date: &str,
    ) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        let now = OffsetDateTime::now_utc();
        user.fees_paid = true;
        user.payment_details = Some(PaymentDetails {
            last_four_digits: last_four.to_string(),
            expiry_date: expiry_date.to_string(),
            cvv_masked: MASKED_CVV.to_string(),
            payment_date: now,
        });
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.users.read().await.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
