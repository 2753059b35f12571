//! `NodeId` / `ElementId`: strong integer handles for mesh entities.
//!
//! Node and element identifiers live in separate id spaces, so they get
//! separate newtypes; mixing them up is a compile error rather than a silent
//! lookup miss. Both wrap a `u64` and order, hash and print like the raw
//! integer.
//!
//! Source tables frequently carry ids formatted as decimals (`19640.0`).
//! [`parse_decimal_id`] accepts those as long as they denote an exact,
//! non-negative integer.

use crate::mesh_error::MeshTriageError;
use std::fmt;
use std::str::FromStr;

/// Largest integer that an `f64` represents exactly.
const MAX_EXACT_F64_INT: f64 = 9_007_199_254_740_992.0;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw integer id.
            #[inline]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw integer value.
            #[inline]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = MeshTriageError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_decimal_id(s).map(Self)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a mesh node (unique within its mesh).
    NodeId
);

id_newtype!(
    /// Identifier of a mesh element (unique within its mesh).
    ElementId
);

/// Coerce a decimal-formatted string to a non-negative integer id.
///
/// Accepts plain integers (`"42"`) and integral decimals (`"42.0"`,
/// `"4.2e1"`); rejects fractions, negatives, non-finite values and values
/// beyond the exactly representable `f64` range.
pub fn parse_decimal_id(raw: &str) -> Result<u64, MeshTriageError> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<u64>() {
        return Ok(v);
    }
    let v = trimmed
        .parse::<f64>()
        .map_err(|_| MeshTriageError::InvalidId(raw.to_string()))?;
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v > MAX_EXACT_F64_INT {
        return Err(MeshTriageError::InvalidId(raw.to_string()));
    }
    Ok(v as u64)
}
