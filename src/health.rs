use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub port: u16,
    pub database: String,
}

// Always 200 so clients can tell "server up, database down" from "server down".
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let database = match state.store.ping().await {
        Ok(()) => {
            debug!("database connection is healthy");
            "connected"
        }
        Err(e) => {
            error!(error = %e, "database ping failed");
            "disconnected"
        }
    };

    Json(Health {
        message: "Server is running".into(),
        timestamp: OffsetDateTime::now_utc(),
        port: state.config.port,
        database: database.into(),
    })
}
