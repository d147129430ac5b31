//! Aggregate identification and versioning types.
//!
//! This module defines strong types for procurement request identification
//! (`RequestId`) and optimistic concurrency control (`Version`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `RequestId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid request ID: {0}")]
pub struct ParseRequestIdError(String);

/// Unique identifier for a procurement request (one DA aggregate).
///
/// # Validation
///
/// - `FromStr::from_str()`: Validates input (rejects blank strings)
/// - `From::from()` and `new()`: No validation (for internal use with trusted input)
///
/// Use `FromStr` when parsing external/user input.
///
/// # Examples
///
/// ```
/// use kimbo_core::identity::RequestId;
///
/// let id = RequestId::new("da-2024-0042");
/// assert_eq!(id.as_str(), "da-2024-0042");
///
/// let parsed: RequestId = "da-7".parse().unwrap();
/// assert_eq!(parsed, RequestId::new("da-7"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Create a new `RequestId` from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the request ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the `RequestId` into its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ParseRequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ParseRequestIdError("Request ID cannot be blank".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Record version number for optimistic concurrency control.
///
/// A request is stored at version 1 when created and every persisted
/// transition bumps the version by one. Writers state the version they read;
/// a store that holds a different version must refuse the write.
///
/// # Examples
///
/// ```
/// use kimbo_core::identity::Version;
///
/// let v1 = Version::INITIAL.next();
/// assert_eq!(v1, Version::new(1));
/// assert_eq!(v1.value(), 1);
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// The version of a request that has not been stored yet.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Check if this is the initial version (0).
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod request_id_tests {
        use super::*;

        #[test]
        fn from_string() {
            let id = RequestId::from("da-123");
            assert_eq!(id.as_str(), "da-123");

            let id2 = RequestId::from("da-456".to_string());
            assert_eq!(id2.into_inner(), "da-456");
        }

        #[test]
        #[allow(clippy::expect_used)] // Panics: Test will fail if parse fails
        fn parse_from_str() {
            let id: RequestId = "da-123".parse().expect("parse should succeed");
            assert_eq!(id, RequestId::new("da-123"));
        }

        #[test]
        fn parse_blank_string_fails() {
            assert!("".parse::<RequestId>().is_err());
            assert!("   ".parse::<RequestId>().is_err());
        }

        #[test]
        fn display() {
            let id = RequestId::new("da-123");
            assert_eq!(format!("{id}"), "da-123");
        }
    }

    mod version_tests {
        use super::*;

        #[test]
        fn initial_version() {
            assert_eq!(Version::INITIAL, Version::new(0));
            assert!(Version::INITIAL.is_initial());
            assert!(!Version::new(1).is_initial());
        }

        #[test]
        fn next_version() {
            let v1 = Version::INITIAL.next();
            assert_eq!(v1, Version::new(1));
            assert_eq!(v1.next(), Version::new(2));
        }

        #[test]
        fn version_round_trips_through_u64() {
            let version = Version::from(42_u64);
            let num: u64 = version.into();
            assert_eq!(num, 42);
            assert_eq!(format!("{version}"), "42");
        }
    }
}
