use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest reference accepted from a caller. Real OEM/IAM codes stay well below this.
pub const MAX_REFERENCE_LEN: usize = 64;

/// Canonical form used for deduplication: uppercase, every separator stripped.
/// `"ab-1234"`, `"AB 1234"` and `"ab.1234"` all become `"AB1234"`.
pub fn normalize_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// A validated part reference as typed by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartReference(String);

impl PartReference {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::Validation("reference must not be empty".into()));
        }
        if trimmed.chars().count() > MAX_REFERENCE_LEN {
            return Err(DomainError::Validation(format!(
                "reference longer than {MAX_REFERENCE_LEN} characters"
            )));
        }
        if !trimmed.chars().any(|c| c.is_alphanumeric()) {
            return Err(DomainError::Validation(format!(
                "reference '{trimmed}' has no alphanumeric characters"
            )));
        }
        Ok(PartReference(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn normalized(&self) -> String {
        normalize_code(&self.0)
    }
}

impl fmt::Display for PartReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize_code("ab-1234"), "AB1234");
        assert_eq!(normalize_code(" 0 986 424 815 "), "0986424815");
        assert_eq!(normalize_code("7700.500.155/A"), "7700500155A");
    }

    #[test]
    fn test_parse_trims() {
        let r = PartReference::parse("  8200 123 456 ").unwrap();
        assert_eq!(r.as_str(), "8200 123 456");
        assert_eq!(r.normalized(), "8200123456");
    }

    #[test]
    fn test_parse_rejects_blank_and_symbols() {
        assert!(PartReference::parse("   ").is_err());
        assert!(PartReference::parse("--//").is_err());
        assert!(PartReference::parse(&"9".repeat(MAX_REFERENCE_LEN + 1)).is_err());
    }
}
