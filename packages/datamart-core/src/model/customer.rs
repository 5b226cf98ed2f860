use serde::{Deserialize, Serialize};

use crate::error::FieldErrors;
use crate::key::RecordKey;
use crate::record::{FieldRules, Record};
use crate::version::VersionToken;

/// Tenant owning cubes, cubesets, roles and users.
///
/// The customer id is chosen by the administrator at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

fn default_active() -> bool {
    true
}

impl Customer {
    pub fn new(customer_id: impl Into<String>, customer_name: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            customer_name: customer_name.into(),
            description: None,
            is_active: true,
            version: None,
        }
    }
}

impl Record for Customer {
    const COLLECTION: &'static str = "customers";
    const KEY_FIELDS: &'static [&'static str] = &["customer_id"];

    fn key(&self) -> RecordKey {
        RecordKey::simple(self.customer_id.as_str())
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .required("customer_id", &self.customer_id)
            .max_len("customer_id", &self.customer_id, 10)
            .check(
                "customer_id",
                self.customer_id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_'),
                "customer_id may only contain letters, digits and underscores",
            )
            .required("customer_name", &self.customer_name)
            .max_len("customer_name", &self.customer_name, 100)
            .optional_max_len("description", self.description.as_deref(), 255)
            .finish()
    }
}
