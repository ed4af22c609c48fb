use std::sync::Arc;

use feeportal::{
    app::{bind, build_app},
    card::PaymentForm,
    client::{
        ApiClient, AuthApi, ClientError, FileTokenStore, MemoryTokenStore, SessionManager,
        SessionStatus, TokenStore,
    },
    state::AppState,
};

async fn spawn_server() -> String {
    let listener = bind("127.0.0.1", 0).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_app(AppState::fake());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn card() -> PaymentForm {
    PaymentForm {
        cardholder_name: "Ada Lovelace".into(),
        card_number: "4111 1111 1111 1111".into(),
        expiry_date: "12/29".into(),
        cvv: "123".into(),
    }
}

#[tokio::test]
async fn register_pay_restore_and_logout() {
    let base = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token");

    let session = SessionManager::new(
        ApiClient::new(&base).unwrap(),
        Arc::new(FileTokenStore::new(&token_path)),
    );
    assert_eq!(session.start().await.status, SessionStatus::Unauthenticated);

    let ada = session
        .register("Ada", "ada@example.com", "secret1")
        .await
        .unwrap();
    assert!(!ada.fees_paid);

    let paid = session.pay_fees(&card()).await.unwrap();
    assert!(paid.fees_paid);
    let details = paid.payment_details.unwrap();
    assert_eq!(details.last_four_digits, "1111");
    assert_eq!(details.cvv_masked, "***");

    // A fresh process picks the session back up from disk.
    let restored = SessionManager::new(
        ApiClient::new(&base).unwrap(),
        Arc::new(FileTokenStore::new(&token_path)),
    );
    let state = restored.start().await;
    assert!(state.is_authenticated());
    assert_eq!(state.user.unwrap().id, ada.id);

    restored.logout().await;
    assert!(!token_path.exists());
}

#[tokio::test]
async fn login_is_case_insensitive_on_email() {
    let base = spawn_server().await;
    let api = ApiClient::new(&base).unwrap();

    let first = SessionManager::new(api.clone(), Arc::new(MemoryTokenStore::new()));
    let ada = first
        .register("Ada", "ada@example.com", "secret1")
        .await
        .unwrap();

    let second = SessionManager::new(api, Arc::new(MemoryTokenStore::new()));
    let again = second.login("  ADA@example.com", "secret1").await.unwrap();
    assert_eq!(again.id, ada.id);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let base = spawn_server().await;
    let api = ApiClient::new(&base).unwrap();
    let session = SessionManager::new(api, Arc::new(MemoryTokenStore::new()));
    session
        .register("Ada", "ada@example.com", "secret1")
        .await
        .unwrap();
    session.logout().await;

    let err = session.login("ada@example.com", "wrong").await.unwrap_err();
    match err {
        ClientError::Rejected { status, code, .. } => {
            assert_eq!(status, 401);
            assert_eq!(code, "invalid_credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.status().await, SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn garbage_token_is_dropped_on_start() {
    let base = spawn_server().await;
    let tokens = Arc::new(MemoryTokenStore::with_token("not-a-jwt"));
    let session = SessionManager::new(ApiClient::new(&base).unwrap(), tokens.clone());

    let state = session.start().await;
    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert_eq!(tokens.load().unwrap(), None);
}

#[tokio::test]
async fn api_client_reports_error_envelope() {
    let base = spawn_server().await;
    let api = ApiClient::new(&base).unwrap();

    let health = api.health().await.unwrap();
    assert_eq!(health.database, "connected");

    assert_eq!(api.me("not-a-jwt").await, Err(ClientError::Unauthenticated));
    let students = api.list_students().await.unwrap();
    assert!(students.is_empty());
}

#[tokio::test]
async fn profile_update_reaches_server() {
    let base = spawn_server().await;
    let api = ApiClient::new(&base).unwrap();
    let session = SessionManager::new(api.clone(), Arc::new(MemoryTokenStore::new()));
    session
        .register("Ada", "ada@example.com", "secret1")
        .await
        .unwrap();

    let updated = session
        .update_profile("Ada Lovelace", "ada@example.com")
        .await
        .unwrap();
    assert_eq!(updated.name, "Ada Lovelace");

    let listed = api.list_students().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Ada Lovelace");
}
