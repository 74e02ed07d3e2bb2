//! unisession-http - Backend auth endpoints over HTTP.
//!
//! [`AuthApi`] logs in with credentials and exchanges refresh tokens for new
//! access tokens. It implements [`TokenRefresher`](unisession_core::TokenRefresher)
//! so it can be handed straight to a session manager.

mod auth;
mod client;
mod endpoints;

pub use auth::{AuthApi, LoginOutput};
