use http::Method;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Stable short route identifier derived from `method + ":" + pattern`.
///
/// The id is the first four bytes of the SHA-256 digest, rendered as eight
/// lowercase hex characters. It is collision-tolerant, not collision-free:
/// ids are only used for diagnostics and parameter lookup, never uniqueness.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RouteId([u8; 4]);

impl RouteId {
    /// Derive the id from the route's method and raw pattern. Computed once at
    /// registration; immutable afterwards.
    #[must_use]
    pub fn derive(method: &Method, pattern: &str) -> Self {
        let digest = Sha256::digest(format!("{method}:{pattern}").as_bytes());
        let mut short = [0u8; 4];
        short.copy_from_slice(&digest[..4]);
        Self(short)
    }
}

impl Display for RouteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for RouteId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Strongly typed request identifier backed by ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RequestId(ulid::Ulid::from_string(s)?))
    }
}
