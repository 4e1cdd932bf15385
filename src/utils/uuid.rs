//! Identifiers for relay sessions.
use uuid::Uuid;

/// Generate a new session identifier.
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(generate_session_id(), generate_session_id());
        assert_eq!(generate_session_id().len(), 36);
    }
}
