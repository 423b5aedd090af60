//! Typed account identity.
//!
//! A session is keyed by (owner, credential), not by a composite string —
//! the same owner can drive any number of credentials, and the same
//! credential value under two owners is two independent sessions.

use std::fmt;

/// Identity of the observer/front end that supplied a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(pub i64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque access token for one remote account.
///
/// The core never mutates or persists it, only attaches it to outbound
/// requests. `Debug` and `Display` render a truncated preview so the full
/// token never lands in logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

/// Characters of the token shown in logs and observer surfaces.
const PREVIEW_LEN: usize = 10;

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The full token, for attaching to requests.
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Truncated form safe for logs.
    pub fn preview(&self) -> String {
        if self.0.len() <= PREVIEW_LEN {
            self.0.clone()
        } else {
            let cut = self
                .0
                .char_indices()
                .nth(PREVIEW_LEN)
                .map(|(i, _)| i)
                .unwrap_or(self.0.len());
            format!("{}…", &self.0[..cut])
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.preview())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.preview())
    }
}

/// Registry key for one matching session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountKey {
    pub owner: OwnerId,
    pub credential: Credential,
}

impl AccountKey {
    pub fn new(owner: OwnerId, credential: Credential) -> Self {
        Self { owner, credential }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner={} token={}", self.owner, self.credential)
    }
}
