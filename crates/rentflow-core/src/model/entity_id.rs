// ── Template identity ──
//
// Server-assigned ids are usually UUIDs; optimistic records carry a
// locally minted temporary id until the server confirms them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TEMP_PREFIX: &str = "temp-";

// ── EntityId ────────────────────────────────────────────────────────

/// Identifier of a template record.
///
/// Temporary ids render as `temp-<uuid>` and never collide with
/// server-assigned ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EntityId {
    /// Server-confirmed UUID.
    Uuid(Uuid),
    /// Local placeholder for an optimistically created record.
    Temporary(Uuid),
    /// Any other server-assigned id shape.
    Other(String),
}

impl EntityId {
    /// Mint a fresh temporary id.
    pub fn temporary() -> Self {
        Self::Temporary(Uuid::new_v4())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Uuid(u) => Some(u),
            _ => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Temporary(u) => write!(f, "{TEMP_PREFIX}{u}"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl From<Uuid> for EntityId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        if let Some(rest) = s.strip_prefix(TEMP_PREFIX) {
            if let Ok(u) = Uuid::parse_str(rest) {
                return Self::Temporary(u);
            }
        }
        match Uuid::parse_str(&s) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Other(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn uuid_string_parses_as_uuid() {
        let id = EntityId::from("550e8400-e29b-41d4-a716-446655440000");
        assert!(id.as_uuid().is_some());
        assert!(!id.is_temporary());
    }

    #[test]
    fn other_ids_are_kept_verbatim() {
        let id: EntityId = "42".parse().unwrap();
        assert_eq!(id, EntityId::Other("42".into()));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn temporary_ids_roundtrip_through_display() {
        let id = EntityId::temporary();
        let rendered = id.to_string();
        assert!(rendered.starts_with("temp-"));
        assert_eq!(EntityId::from(rendered), id);
    }

    #[test]
    fn temp_prefix_without_uuid_is_other() {
        let id = EntityId::from("temp-abc");
        assert_eq!(id, EntityId::Other("temp-abc".into()));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = EntityId::from("abc");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("abc"));
        let back: EntityId = serde_json::from_value(serde_json::json!("abc")).unwrap();
        assert_eq!(back, id);
    }
}
