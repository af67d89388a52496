//! Shared storage types.

use serde::{Deserialize, Serialize};

/// Entity name used in engine errors.
pub const ENGINE_ENTITY: &str = "engine";

/// Entity name used in car errors.
pub const CAR_ENTITY: &str = "car";

/// What happens to cars when the engine they reference is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineDeletePolicy {
    /// Refuse to delete an engine that any car still references.
    #[default]
    Restrict,
    /// Clear `engine_id` on referencing cars, then delete the engine.
    Detach,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_policy_serde() {
        assert_eq!(EngineDeletePolicy::default(), EngineDeletePolicy::Restrict);

        let policy: EngineDeletePolicy = serde_json::from_str("\"detach\"").unwrap();
        assert_eq!(policy, EngineDeletePolicy::Detach);
        assert_eq!(
            serde_json::to_string(&EngineDeletePolicy::Restrict).unwrap(),
            "\"restrict\""
        );
    }
}
