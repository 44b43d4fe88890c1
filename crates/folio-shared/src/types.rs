use serde::{Deserialize, Serialize};
use uuid::Uuid;

// User identity = random UUID assigned at registration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_display_roundtrip() {
        let id = UserId::new();
        let parsed = UserId::from(Uuid::parse_str(&id.to_string()).unwrap());
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_short_is_prefix() {
        let id = UserId::new();
        assert_eq!(id.short().len(), 8);
        assert!(id.0.simple().to_string().starts_with(&id.short()));
    }

    #[test]
    fn test_serializes_as_plain_uuid() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
    }
}
