//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create integer ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Identity keys are
//! opaque strings handed out by the identity provider and get their own
//! validated type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe integer ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>`, `Into<i64>` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use figurine_core::define_id;
/// define_id!(ProductId);
/// define_id!(OrderId);
///
/// let product_id = ProductId::new(1);
/// let order_id = OrderId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(ProductId);

/// Errors that can occur when parsing an [`IdentityKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityKeyError {
    /// The key is empty.
    #[error("identity key cannot be empty")]
    Empty,
    /// The key is too long.
    #[error("identity key must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The key contains a character outside `[A-Za-z0-9_-]`.
    #[error("identity key contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Stable key of an authenticated principal.
///
/// Used as the key of the per-user remote documents, so it is restricted to
/// characters that are safe in document paths and file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Maximum length of an identity key.
    pub const MAX_LENGTH: usize = 128;

    /// Parse an `IdentityKey` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains characters other than ASCII
    /// alphanumerics, `_` and `-`.
    pub fn parse(s: &str) -> Result<Self, IdentityKeyError> {
        if s.is_empty() {
            return Err(IdentityKeyError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(IdentityKeyError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(IdentityKeyError::InvalidCharacter(bad));
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for IdentityKey {
    type Err = IdentityKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = IdentityKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IdentityKey> for String {
    fn from(key: IdentityKey) -> Self {
        key.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_from_str() {
        let id: ProductId = " 42 ".parse().unwrap();
        assert_eq!(id, ProductId::new(42));
        assert!("forty-two".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_product_id_serializes_as_number() {
        let json = serde_json::to_string(&ProductId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_identity_key_valid() {
        let key = IdentityKey::parse("uid_AbC-123").unwrap();
        assert_eq!(key.as_str(), "uid_AbC-123");
        assert_eq!(key.to_string(), "uid_AbC-123");
    }

    #[test]
    fn test_identity_key_rejects_path_characters() {
        assert_eq!(
            IdentityKey::parse("../etc"),
            Err(IdentityKeyError::InvalidCharacter('.'))
        );
        assert_eq!(
            IdentityKey::parse("a/b"),
            Err(IdentityKeyError::InvalidCharacter('/'))
        );
    }

    #[test]
    fn test_identity_key_empty_and_too_long() {
        assert_eq!(IdentityKey::parse(""), Err(IdentityKeyError::Empty));
        let long = "k".repeat(IdentityKey::MAX_LENGTH + 1);
        assert!(matches!(
            IdentityKey::parse(&long),
            Err(IdentityKeyError::TooLong { .. })
        ));
    }

    #[test]
    fn test_identity_key_deserialize_validates() {
        let ok: IdentityKey = serde_json::from_str("\"user1\"").unwrap();
        assert_eq!(ok.as_str(), "user1");
        assert!(serde_json::from_str::<IdentityKey>("\"bad key\"").is_err());
    }
}
