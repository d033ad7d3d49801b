//! Invalidation tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key used to selectively evict cached decisions.
///
/// Tags render as `kind:value` (`user:u1`, `tenant:acme`,
/// `client:mobile`, `permission:Orders.Create`) and parse back the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InvalidationTag {
    /// Every decision made for a user.
    User(String),
    /// Every decision made within a tenant.
    Tenant(String),
    /// Every decision made for a client application.
    Client(String),
    /// Every decision about one permission.
    Permission(String),
}

impl InvalidationTag {
    /// Tag for a user id.
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    /// Tag for a tenant id.
    #[must_use]
    pub fn tenant(id: impl Into<String>) -> Self {
        Self::Tenant(id.into())
    }

    /// Tag for a client id.
    #[must_use]
    pub fn client(id: impl Into<String>) -> Self {
        Self::Client(id.into())
    }

    /// Tag for a permission name.
    #[must_use]
    pub fn permission(name: impl Into<String>) -> Self {
        Self::Permission(name.into())
    }

    /// The tag kind as a static string.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Tenant(_) => "tenant",
            Self::Client(_) => "client",
            Self::Permission(_) => "permission",
        }
    }

    /// The tagged value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::User(v) | Self::Tenant(v) | Self::Client(v) | Self::Permission(v) => v,
        }
    }
}

impl fmt::Display for InvalidationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

/// Error returned when parsing an [`InvalidationTag`] fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid invalidation tag '{input}': expected user|tenant|client|permission:<value>")]
pub struct ParseTagError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for InvalidationTag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTagError {
            input: s.to_owned(),
        };
        let (kind, value) = s.split_once(':').ok_or_else(err)?;
        if value.is_empty() {
            return Err(err());
        }
        match kind {
            "user" => Ok(Self::user(value)),
            "tenant" => Ok(Self::tenant(value)),
            "client" => Ok(Self::client(value)),
            "permission" => Ok(Self::permission(value)),
            _ => Err(err()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let tag = InvalidationTag::permission("Orders.Create");
        assert_eq!(tag.to_string(), "permission:Orders.Create");
        assert_eq!("permission:Orders.Create".parse::<InvalidationTag>(), Ok(tag));
    }

    #[test]
    fn test_value_may_contain_colon() {
        let tag: InvalidationTag = "user:ldap:jdoe".parse().unwrap();
        assert_eq!(tag, InvalidationTag::user("ldap:jdoe"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("role:admin".parse::<InvalidationTag>().is_err());
        assert!("user:".parse::<InvalidationTag>().is_err());
        assert!("tenant".parse::<InvalidationTag>().is_err());
    }
}
