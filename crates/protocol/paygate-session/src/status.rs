//! Session status.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a session.
///
/// ```text
/// pending -> active <-> paused -> { expired | exhausted | settled }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Active,
    Paused,
    Expired,
    Exhausted,
    Settled,
}

impl SessionStatus {
    /// Terminal states accept no further calls.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Exhausted | Self::Settled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Expired => "expired",
            Self::Exhausted => "exhausted",
            Self::Settled => "settled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
