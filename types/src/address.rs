//! Opaque member identity.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An account identity as supplied by the host runtime.
///
/// The engine never interprets the contents; it only compares and hashes
/// addresses. Hosts that authenticate callers hand the engine whatever
/// identifier they already use (a public key encoding, an account name).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create an address from a raw string without validation.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parse an address, rejecting empty strings and embedded whitespace.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        if raw.is_empty() {
            return Err(TypeError::EmptyAddress);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(TypeError::MalformedAddress(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
