// Entity identifiers are UUIDs generated by the store.
use uuid::Uuid;

use crate::error::{CoreError, Result};

pub fn generate_id() -> Uuid {
    Uuid::new_v4()
}

/// Parses a caller-supplied identifier string.
pub fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| CoreError::invalid_id(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_is_unique() {
        assert_ne!(generate_id(), generate_id());
        assert_eq!(generate_id().get_version_num(), 4);
    }

    #[test]
    fn test_parse_id() {
        let id = generate_id();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert_eq!(parse_id(&format!(" {id} ")).unwrap(), id);
        assert!(matches!(parse_id("car-1"), Err(CoreError::InvalidId(_))));
        assert!(parse_id("").is_err());
    }
}
