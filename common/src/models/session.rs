// common/src/models/session.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle of a client session within one application shell.
///
/// `Uninitialized -> Hydrating -> {HydratedEmpty | HydratedAuthenticated}`;
/// sign-in moves any hydrated phase to `HydratedAuthenticated`, logout moves
/// any phase to `HydratedEmpty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Uninitialized,
    Hydrating,
    HydratedEmpty,
    HydratedAuthenticated,
}

impl SessionPhase {
    pub fn is_hydrated(self) -> bool {
        matches!(self, SessionPhase::HydratedEmpty | SessionPhase::HydratedAuthenticated)
    }
}

/// Point-in-time view of the session held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Signed-in user as returned by the login endpoint
    pub user: Option<Value>,
    /// Bearer token for gateway calls
    pub token: Option<String>,
    /// True once the initial storage read has been attempted
    pub hydrated: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.hydrated && self.user.is_some() && self.token.is_some()
    }
}

/// One of the places a session is mirrored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistTarget {
    UserEntry,
    TokenEntry,
    Cookie,
}

impl fmt::Display for PersistTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistTarget::UserEntry => write!(f, "user storage entry"),
            PersistTarget::TokenEntry => write!(f, "token storage entry"),
            PersistTarget::Cookie => write!(f, "token cookie"),
        }
    }
}

/// Result of a session write. Failed targets are not rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub failed: Vec<PersistTarget>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn has_failed(&self, target: PersistTarget) -> bool {
        self.failed.contains(&target)
    }
}
