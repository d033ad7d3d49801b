//! Evaluation context and its cache fingerprint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::tag::InvalidationTag;

/// The principal a permission check is evaluated for.
///
/// Every identity field is optional; an empty context is a valid anonymous
/// caller. The extension bag carries provider-specific data such as an
/// organizational unit or a comma separated role list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Authenticated user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Tenant the request belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Calling client / application, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Provider-specific extension values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

impl EvaluationContext {
    /// Create an anonymous context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user id.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the tenant id.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the client id.
    #[must_use]
    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Add an extension value.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Look up an extension value.
    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }

    /// Whether no identity and no extension is present.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
            && self.tenant_id.is_none()
            && self.client_id.is_none()
            && self.extensions.is_empty()
    }

    /// Reduce the context to a stable fingerprint.
    ///
    /// Fields are encoded in a fixed order with explicit presence markers and
    /// length prefixes, so `None` and `Some("")` never collide and two
    /// contexts with the same fields always hash identically.
    #[must_use]
    pub fn fingerprint(&self) -> ContextFingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"arbiter.context.v1");
        write_optional(&mut hasher, self.user_id.as_deref());
        write_optional(&mut hasher, self.tenant_id.as_deref());
        write_optional(&mut hasher, self.client_id.as_deref());
        write_len(&mut hasher, self.extensions.len());
        for (key, value) in &self.extensions {
            write_field(&mut hasher, key);
            write_field(&mut hasher, value);
        }
        ContextFingerprint(*hasher.finalize().as_bytes())
    }

    /// Tags identifying the principals this context depends on.
    ///
    /// The cache attaches these to each entry so that invalidating a user,
    /// tenant, or client evicts every decision made for it.
    #[must_use]
    pub fn invalidation_tags(&self) -> Vec<InvalidationTag> {
        let mut tags = Vec::with_capacity(3);
        if let Some(user) = &self.user_id {
            tags.push(InvalidationTag::User(user.clone()));
        }
        if let Some(tenant) = &self.tenant_id {
            tags.push(InvalidationTag::Tenant(tenant.clone()));
        }
        if let Some(client) = &self.client_id {
            tags.push(InvalidationTag::Client(client.clone()));
        }
        tags
    }
}

fn write_len(hasher: &mut blake3::Hasher, len: usize) {
    let len = u64::try_from(len).unwrap_or(u64::MAX);
    hasher.update(&len.to_le_bytes());
}

fn write_field(hasher: &mut blake3::Hasher, value: &str) {
    write_len(hasher, value.len());
    hasher.update(value.as_bytes());
}

fn write_optional(hasher: &mut blake3::Hasher, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(&[1]);
            write_field(hasher, v);
        },
        None => {
            hasher.update(&[0]);
        },
    }
}

/// Stable digest of an [`EvaluationContext`], used as part of cache keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextFingerprint([u8; 32]);

impl ContextFingerprint {
    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding of the digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for ContextFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContextFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are plenty for logs.
        let hex = self.to_hex();
        write!(f, "ContextFingerprint({})", &hex[..16])
    }
}
