use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registry bucket of a price source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSpeed {
    /// Included in every "all platforms" request.
    Fast,
    /// Only queried on explicit opt-in.
    Slow,
}

impl fmt::Display for SourceSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpeed::Fast => write!(f, "fast"),
            SourceSpeed::Slow => write!(f, "slow"),
        }
    }
}

/// Which platforms a price search should hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformSelector {
    All,
    Only(String),
}

impl fmt::Display for PlatformSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformSelector::All => write!(f, "all"),
            PlatformSelector::Only(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for PlatformSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "" => Err("platform must not be empty".to_string()),
            "all" => Ok(PlatformSelector::All),
            _ => Ok(PlatformSelector::Only(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parse() {
        assert_eq!("ALL".parse::<PlatformSelector>().unwrap(), PlatformSelector::All);
        assert_eq!(
            " Ovoko ".parse::<PlatformSelector>().unwrap(),
            PlatformSelector::Only("ovoko".into())
        );
        assert!("".parse::<PlatformSelector>().is_err());
    }
}
