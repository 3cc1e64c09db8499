//! Identity types for submission attempts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a single submission attempt.
///
/// Format: `att-<date>-<time>-<random>`
/// Example: `att-20260115-143022-abc123`
///
/// A retried entry gets a fresh attempt id when it rejoins a new batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub String);

impl AttemptId {
    /// Generate a new attempt ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let random: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(6)
            .collect();
        AttemptId(format!("att-{}-{}", now.format("%Y%m%d-%H%M%S"), random))
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_follow_format() {
        let id = AttemptId::new();
        let rest = id.0.strip_prefix("att-").expect("prefix");
        let parts: Vec<&str> = rest.split('-').collect();
        assert_eq!(parts.len(), 3, "bad id: {id}");
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn new_ids_are_distinct() {
        assert_ne!(AttemptId::new(), AttemptId::new());
    }
}
