use crate::config::{AppConfig, JwtConfig};
use crate::store::{MemoryUserStore, PgUserStore, UserStore};
use anyhow::Context;
use sqlx::migrate::Migrator;
use std::sync::Arc;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store = if config.uses_memory_store() {
            tracing::warn!("using in-memory user store; data is lost on restart");
            Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
        } else {
            let pg = PgUserStore::connect(&config.database_url).await?;
            MIGRATOR.run(pg.pool()).await.context("run migrations")?;
            tracing::info!("connected to postgres");
            Arc::new(pg) as Arc<dyn UserStore>
        };

        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// State backed by an empty in-memory store and a fixed test secret.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: "memory://".into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });
        Self::from_parts(Arc::new(MemoryUserStore::new()), config)
    }
}
