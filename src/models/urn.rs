//! Platform entity identifiers.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Namespace every platform URN lives under
pub const URN_NAMESPACE: &str = "li";

static URN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^urn:li:(\w+):(\d+)$").unwrap()
});

/// Identifier of a platform entity, e.g. `urn:li:organization:12345`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Urn {
    pub entity_type: String,
    pub id: u64,
}

impl Urn {
    pub fn new(entity_type: impl Into<String>, id: u64) -> Self {
        Urn {
            entity_type: entity_type.into(),
            id,
        }
    }

    pub fn organization(id: u64) -> Self {
        Urn::new("organization", id)
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "urn:{}:{}:{}", URN_NAMESPACE, self.entity_type, self.id)
    }
}

impl FromStr for Urn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = URN_REGEX
            .captures(s)
            .ok_or_else(|| Error::Format(format!("URN string invalid: {s}")))?;
        let id = caps[2]
            .parse::<u64>()
            .map_err(|e| Error::Format(format!("URN id out of range in {s}: {e}")))?;
        Ok(Urn::new(&caps[1], id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let urn: Urn = "urn:li:organization:12345".parse().unwrap();
        assert_eq!(urn, Urn::organization(12345));
        assert_eq!(urn.to_string(), "urn:li:organization:12345");
    }

    #[test]
    fn test_other_entity_types() {
        let urn: Urn = "urn:li:share:6367102219933806592".parse().unwrap();
        assert_eq!(urn.entity_type, "share");
        assert_eq!(urn.id, 6367102219933806592);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "urn:li:organization:",
            "urn:li:organization:abc",
            "urn:xx:organization:1",
            "urn:li:organization:1:extra",
            "organization:1",
        ] {
            assert!(matches!(bad.parse::<Urn>(), Err(Error::Format(_))), "{bad}");
        }
    }
}
