pub mod app;
pub mod auth;
pub mod card;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod state;
pub mod store;
pub mod students;
