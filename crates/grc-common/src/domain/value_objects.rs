//! Value Objects - Immutable identifiers for the compliance domain
//!
//! Value Objects are:
//! - Immutable
//! - Comparable by value (not identity)
//! - Cheap to clone and hash

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Tenant ID
pub type TenantId = Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from any string-like value
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get inner value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Control identifier (e.g. `AC-01`, `custom-<uuid>`)
    ControlId
);

string_id!(
    /// Framework identifier (e.g. `soc2`, `hipaa`)
    FrameworkId
);

string_id!(
    /// Dotted requirement path (e.g. `CC6.1`, `1.3.2`)
    RequirementId
);

string_id!(
    /// Domain identifier (e.g. `access-control`)
    DomainId
);

impl RequirementId {
    /// Path segments split on `.`
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Parent path (last segment removed), `None` for roots
    pub fn parent(&self) -> Option<RequirementId> {
        self.0
            .rsplit_once('.')
            .map(|(parent, _)| RequirementId(parent.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_requirement_parent() {
        assert_eq!(RequirementId::new("3.2.1").parent(), Some(RequirementId::new("3.2")));
        assert_eq!(RequirementId::new("A.5.15").parent(), Some(RequirementId::new("A.5")));
        assert_eq!(RequirementId::new("CC6").parent(), None);
    }

    #[test]
    fn test_borrow_lookup() {
        let mut map = HashMap::new();
        map.insert(ControlId::new("AC-01"), 1);
        assert_eq!(map.get("AC-01"), Some(&1));
    }

    #[test]
    fn test_serde_transparent() {
        let id = FrameworkId::new("soc2");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"soc2\"");
    }
}
