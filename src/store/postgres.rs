use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::{
    normalize_email, NewUser, PaymentDetails, StoreError, UserRecord, UserStore, MASKED_CVV,
};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    fees_paid: bool,
    payment_last_four: Option<String>,
    payment_expiry: Option<String>,
    payment_cvv_masked: Option<String>,
    payment_date: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(r: UserRow) -> Self {
        let payment_details = match (r.payment_last_four, r.payment_date) {
            (Some(last_four_digits), Some(payment_date)) => Some(PaymentDetails {
                last_four_digits,
                expiry_date: r.payment_expiry.unwrap_or_default(),
                cvv_masked: r.payment_cvv_masked.unwrap_or_else(|| MASKED_CVV.into()),
                payment_date,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            fees_paid: r.fees_paid,
            payment_details,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn map_write_error(e: sqlx::Error, what: &'static str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Backend(anyhow::Error::new(e).context(what))
}

/// PostgreSQL-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, fees_paid,
                      payment_last_four, payment_expiry, payment_cvv_masked, payment_date,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_user.name.trim())
        .bind(normalize_email(&new_user.email))
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "insert user"))?;
        debug!(user_id = %row.id, "user inserted");
        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, fees_paid,
                   payment_last_four, payment_expiry, payment_cvv_masked, payment_date,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .context("find user by email")?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, fees_paid,
                   payment_last_four, payment_expiry, payment_cvv_masked, payment_date,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user by id")?;
        Ok(row.map(Into::into))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
    ) -> Result<UserRecord, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
               SET name = $2, email = $3, updated_at = now()
             WHERE id = $1
            RETURNING id, name, email, password_hash, fees_paid,
                      payment_last_four, payment_expiry, payment_cvv_masked, payment_date,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name.trim())
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "update profile"))?;
        row.map(Into::into).ok_or(StoreError::NotFound)
    }

    async fn record_payment(
        &self,
        id: Uuid,
        last_four: &str,
        expiry_date: &str,
    ) -> Result<UserRecord, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
               SET fees_paid = TRUE,
                   payment_last_four = $2,
                   payment_expiry = $3,
                   payment_cvv_masked = $4,
                   payment_date = now(),
                   updated_at = now()
             WHERE id = $1
            RETURNING id, name, email, password_hash, fees_paid,
                      payment_last_four, payment_expiry, payment_cvv_masked, payment_date,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(last_four)
        .bind(expiry_date)
        .bind(MASKED_CVV)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "record payment"))?;
        row.map(Into::into).ok_or(StoreError::NotFound)
    }

    async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, fees_paid,
                   payment_last_four, payment_expiry, payment_cvv_masked, payment_date,
                   created_at, updated_at
              FROM users
             ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("list users")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("ping database")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_without_payment_has_no_details() {
        let now = OffsetDateTime::now_utc();
        let record: UserRecord = UserRow {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "hash".into(),
            fees_paid: false,
            payment_last_four: None,
            payment_expiry: None,
            payment_cvv_masked: None,
            payment_date: None,
            created_at: now,
            updated_at: now,
        }
        .into();
        assert!(record.payment_details.is_none());
    }

    #[test]
    fn row_with_payment_maps_masked_details() {
        let now = OffsetDateTime::now_utc();
        let record: UserRecord = UserRow {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "hash".into(),
            fees_paid: true,
            payment_last_four: Some("1111".into()),
            payment_expiry: Some("12/29".into()),
            payment_cvv_masked: Some("***".into()),
            payment_date: Some(now),
            created_at: now,
            updated_at: now,
        }
        .into();
        let details = record.payment_details.expect("payment details");
        assert_eq!(details.last_four_digits, "1111");
        assert_eq!(details.expiry_date, "12/29");
        assert_eq!(details.cvv_masked, MASKED_CVV);
    }
}
