//! Strongly-typed identifiers for ledger entities
//!
//! Bills and line items are keyed by time-ordered UUIDs wrapped in newtypes,
//! so a line item id can never be passed where a bill id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declares a UUID v7 newtype shown as `<TAG>-<uuid>`
///
/// Parsing accepts the tagged form or a bare UUID. Serde goes through the
/// tagged string.
macro_rules! ledger_id {
    ($(#[$meta:meta])* $name:ident => $tag:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Uuid);

        impl $name {
            const TAG: &'static str = concat!($tag, "-");

            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", Self::TAG, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(Self::TAG).unwrap_or(s);
                Uuid::parse_str(raw).map(Self)
            }
        }

        impl TryFrom<String> for $name {
            type Error = uuid::Error;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.to_string()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

ledger_id! {
    /// Identifies a bill; ids sort by creation time
    BillId => "BILL"
}

ledger_id! {
    /// Identifies a line item within its bill
    LineItemId => "LINE"
}
