//! Opaque optimistic concurrency token.

use serde::{Deserialize, Serialize};

/// Server-assigned version marker.
///
/// The client never fabricates or alters a token: it is read from a `get` or
/// `list` response and handed back verbatim on the next update of the same
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wraps a token received from the server. Empty input yields `None`.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deserialized tokens may still be empty strings.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the token only when it is present and non-empty.
pub fn present(token: Option<&VersionToken>) -> Option<&VersionToken> {
    token.filter(|t| !t.is_empty())
}
