use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::normalizer::value_as_string;

/// Fields the backend's id object defines, in the order the admin page shows them.
pub const KNOWN_ID_OBJECT_FIELDS: [&str; 17] = [
    "id",
    "bip32_enabled",
    "bip70_static_amount",
    "bip70_enabled",
    "last_generated_index",
    "last_used_index",
    "wallet_address",
    "expires",
    "memo",
    "master_public_key",
    "private_key",
    "x509_cert",
    "payment_url",
    "merchant_data",
    "presigned_payment_requests",
    "presigned_only",
    "auth_public_key",
];

/// Client-side copy of an id object. The backend owns it; this copy may be stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceRecord(Map<String, Value>);

impl ResourceRecord {
    /// The persisted id. Null or empty ids count as unset.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.0
            .get("id")
            .and_then(value_as_string)
            .filter(|id| !id.is_empty())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn merge(&mut self, other: ResourceRecord) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Known fields first in display order, then whatever else the backend sent.
    #[must_use]
    pub fn display_fields(&self) -> Vec<(&str, &Value)> {
        let mut fields = Vec::with_capacity(self.0.len());
        for key in KNOWN_ID_OBJECT_FIELDS {
            if let Some(value) = self.0.get(key) {
                fields.push((key, value));
            }
        }
        for (key, value) in &self.0 {
            if !KNOWN_ID_OBJECT_FIELDS.contains(&key.as_str()) {
                fields.push((key.as_str(), value));
            }
        }
        fields
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl TryFrom<Value> for ResourceRecord {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(other),
        }
    }
}
