use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{PaymentRequest, PaymentResponse, ProfileUpdateRequest};
use crate::{
    auth::{dto::PublicUser, extractors::AuthUser, services::validate_identity},
    card::{last_four, validate_payment},
    error::{ApiError, AppJson},
    state::AppState,
};

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students))
        .route("/students/profile", put(update_profile))
        .route("/students/payment", post(pay_fees))
}

#[instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = state.store.list_all().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<ProfileUpdateRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    validate_identity(&payload.name, &payload.email)?;
    let user = state
        .store
        .update_profile(user_id, &payload.name, &payload.email)
        .await?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn pay_fees(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<PaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let digits = validate_payment(&payload.card_number, &payload.expiry_date, &payload.cvv)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let user = state
        .store
        .record_payment(user_id, last_four(&digits), &payload.expiry_date)
        .await?;
    info!(user_id = %user.id, "fees paid");
    Ok(Json(PaymentResponse {
        success: true,
        user: user.into(),
    }))
}
