use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, Result};
use crate::key::{KeyPart, RecordKey};
use crate::record::{int_part, text_part, FieldRules, ParentScoped, Record};
use crate::version::VersionToken;

/// Security role defined for one customer. Role names are unique per customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub role_id: i64,
    pub customer_id: String,
    pub role_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

/// Editable part of a [`Role`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleAttributes {
    pub description: Option<String>,
}

impl Record for Role {
    const COLLECTION: &'static str = "roles";
    const KEY_FIELDS: &'static [&'static str] = &["role_id"];
    const SERVER_ASSIGNED_KEY: bool = true;
    const READ_ONLY_FIELDS: &'static [&'static str] = &["customer_name"];

    fn key(&self) -> RecordKey {
        RecordKey::simple(self.role_id)
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .required("customer_id", &self.customer_id)
            .required("role_name", &self.role_name)
            .max_len("role_name", &self.role_name, 50)
            .optional_max_len("description", self.description.as_deref(), 255)
            .finish()
    }
}

impl ParentScoped for Role {
    type Attributes = RoleAttributes;
    const PARENT_FIELD: &'static str = "customer_id";

    fn parent_id(&self) -> KeyPart {
        KeyPart::from(self.customer_id.as_str())
    }

    fn child_id(&self) -> KeyPart {
        KeyPart::from(self.role_name.as_str())
    }

    fn compose(parent: &KeyPart, child: &KeyPart, attributes: RoleAttributes) -> Result<Self> {
        Ok(Self {
            role_id: 0,
            customer_id: text_part::<Self>(parent)?,
            role_name: text_part::<Self>(child)?,
            description: attributes.description,
            customer_name: None,
            version: None,
        })
    }

    fn attributes(&self) -> RoleAttributes {
        RoleAttributes {
            description: self.description.clone(),
        }
    }

    fn apply(&mut self, attributes: RoleAttributes) {
        self.description = attributes.description;
    }
}

/// Console user belonging to a customer. User ids are login names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub customer_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl Record for User {
    const COLLECTION: &'static str = "users";
    const KEY_FIELDS: &'static [&'static str] = &["user_id"];

    fn key(&self) -> RecordKey {
        RecordKey::simple(self.user_id.as_str())
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .required("user_id", &self.user_id)
            .max_len("user_id", &self.user_id, 50)
            .required("customer_id", &self.customer_id)
            .required("first_name", &self.first_name)
            .required("last_name", &self.last_name)
            .check(
                "email",
                self.email.as_deref().map_or(true, |e| e.contains('@')),
                "email must be a valid address",
            )
            .finish()
    }
}

/// Membership of a user in a customer, with the role granted there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerUser {
    pub customer_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerUserAttributes {
    pub role_id: Option<i64>,
}

impl Record for CustomerUser {
    const COLLECTION: &'static str = "customerusers";
    const KEY_FIELDS: &'static [&'static str] = &["customer_id", "user_id"];
    const READ_ONLY_FIELDS: &'static [&'static str] = &["user_full_name", "role_name"];

    fn key(&self) -> RecordKey {
        RecordKey::composite(self.customer_id.as_str(), self.user_id.as_str())
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .required("customer_id", &self.customer_id)
            .required("user_id", &self.user_id)
            .finish()
    }
}

impl ParentScoped for CustomerUser {
    type Attributes = CustomerUserAttributes;
    const PARENT_FIELD: &'static str = "customer_id";

    fn parent_id(&self) -> KeyPart {
        KeyPart::from(self.customer_id.as_str())
    }

    fn child_id(&self) -> KeyPart {
        KeyPart::from(self.user_id.as_str())
    }

    fn compose(
        parent: &KeyPart,
        child: &KeyPart,
        attributes: CustomerUserAttributes,
    ) -> Result<Self> {
        Ok(Self {
            customer_id: text_part::<Self>(parent)?,
            user_id: text_part::<Self>(child)?,
            role_id: attributes.role_id,
            user_full_name: None,
            role_name: None,
            version: None,
        })
    }

    fn attributes(&self) -> CustomerUserAttributes {
        CustomerUserAttributes {
            role_id: self.role_id,
        }
    }

    fn apply(&mut self, attributes: CustomerUserAttributes) {
        self.role_id = attributes.role_id;
    }
}

/// Access of a user to one cube, with the role applied inside the cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeUser {
    pub cube_id: i64,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cube_name: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CubeUserAttributes {
    pub role_id: Option<i64>,
}

impl Record for CubeUser {
    const COLLECTION: &'static str = "cubeusers";
    const KEY_FIELDS: &'static [&'static str] = &["cube_id", "user_id"];
    const READ_ONLY_FIELDS: &'static [&'static str] = &["user_full_name", "cube_name"];

    fn key(&self) -> RecordKey {
        RecordKey::composite(self.cube_id, self.user_id.as_str())
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .reference("cube_id", self.cube_id)
            .required("user_id", &self.user_id)
            .finish()
    }
}

impl ParentScoped for CubeUser {
    type Attributes = CubeUserAttributes;
    const PARENT_FIELD: &'static str = "cube_id";

    fn parent_id(&self) -> KeyPart {
        KeyPart::Int(self.cube_id)
    }

    fn child_id(&self) -> KeyPart {
        KeyPart::from(self.user_id.as_str())
    }

    fn compose(parent: &KeyPart, child: &KeyPart, attributes: CubeUserAttributes) -> Result<Self> {
        Ok(Self {
            cube_id: int_part::<Self>(parent)?,
            user_id: text_part::<Self>(child)?,
            role_id: attributes.role_id,
            user_full_name: None,
            cube_name: None,
            version: None,
        })
    }

    fn attributes(&self) -> CubeUserAttributes {
        CubeUserAttributes {
            role_id: self.role_id,
        }
    }

    fn apply(&mut self, attributes: CubeUserAttributes) {
        self.role_id = attributes.role_id;
    }
}
