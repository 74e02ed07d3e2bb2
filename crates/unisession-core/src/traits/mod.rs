//! Collaborator traits injected into the session manager.

mod refresher;
mod store;

pub use refresher::{RefreshedTokens, TokenRefresher};
pub use store::{SessionStore, StoreChange, StoreKey, StoreOp, StoreSnapshot};
