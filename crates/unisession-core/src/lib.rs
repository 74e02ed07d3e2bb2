//! unisession-core - Session management for the Unicorn admin dashboard.
//!
//! The [`SessionManager`] owns the access/refresh token pair, mirrors it into a
//! durable [`SessionStore`], renews the access token shortly before it expires
//! and notifies subscribers whenever the session changes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use unisession_core::{AccessToken, Identity, MemoryStore, RefreshToken, SessionManager};
//! # use unisession_core::traits::{RefreshedTokens, TokenRefresher};
//! # struct Backend;
//! # #[async_trait::async_trait]
//! # impl TokenRefresher for Backend {
//! #     async fn refresh(&self, _: &RefreshToken) -> unisession_core::Result<RefreshedTokens> {
//! #         unimplemented!()
//! #     }
//! # }
//!
//! # async fn example(identity: Identity) {
//! let manager = SessionManager::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(Backend),
//!     Default::default(),
//! );
//!
//! manager.login(
//!     AccessToken::new("eyJhbGciOi..."),
//!     RefreshToken::new("refresh"),
//!     identity,
//! );
//! assert!(manager.is_authenticated());
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod manager;
pub mod renewal;
pub mod session;
pub mod store;
pub mod tokens;
pub mod traits;
pub mod types;

pub use config::SessionConfig;
pub use credentials::Credentials;
pub use error::Error;
pub use identity::Identity;
pub use manager::{RenewOutcome, SessionEvent, SessionManager};
pub use renewal::RenewalTimer;
pub use session::Session;
pub use store::MemoryStore;
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{SessionStore, StoreKey, StoreSnapshot, TokenRefresher};
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
