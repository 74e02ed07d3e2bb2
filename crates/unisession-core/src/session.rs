//! The session entity.

use std::fmt;

use crate::identity::Identity;
use crate::tokens::{AccessToken, RefreshToken};

/// An authenticated session: the token pair plus the cached identity.
///
/// Both tokens are always present together; there is no partially
/// authenticated state.
#[derive(Clone, PartialEq)]
pub struct Session {
    access_token: AccessToken,
    refresh_token: RefreshToken,
    identity: Identity,
}

impl Session {
    pub fn new(access_token: AccessToken, refresh_token: RefreshToken, identity: Identity) -> Self {
        Self {
            access_token,
            refresh_token,
            identity,
        }
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &RefreshToken {
        &self.refresh_token
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity.id)
            .field("role", &self.identity.role)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}
