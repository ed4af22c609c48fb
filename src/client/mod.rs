//! Typed HTTP client and the session state manager built on top of it.

pub mod api;
pub mod error;
pub mod session;
pub mod state;
pub mod token_store;

pub use api::{ApiClient, AuthApi, DEFAULT_BASE_URL};
pub use error::ClientError;
pub use session::SessionManager;
pub use state::{SessionEvent, SessionState, SessionStatus};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
