//! Strongly-typed identifiers.
//!
//! Uptrace identifies projects and dashboards with positive integers. Zero is
//! never a valid id, so it doubles as the "unset" sentinel callers send.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to define a strongly-typed numeric ID newtype wrapper.
///
/// Generates: struct, `new()` (rejects zero), `get()`, Display, Serialize, Deserialize.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw id. Returns `None` for zero.
            pub fn new(raw: i64) -> Option<Self> {
                if raw == 0 {
                    None
                } else {
                    Some(Self(raw))
                }
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(ProjectId);
define_id!(DashboardId);
