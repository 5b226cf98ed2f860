use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, Result};
use crate::key::{KeyPart, RecordKey};
use crate::record::{text_part, FieldRules, ParentScoped, Record};
use crate::version::VersionToken;

/// OLAP cube deployed for a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    #[serde(default)]
    pub cube_id: i64,
    pub customer_id: String,
    pub cube_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

impl Record for Cube {
    const COLLECTION: &'static str = "cubes";
    const KEY_FIELDS: &'static [&'static str] = &["cube_id"];
    const SERVER_ASSIGNED_KEY: bool = true;
    const READ_ONLY_FIELDS: &'static [&'static str] = &["customer_name"];

    fn key(&self) -> RecordKey {
        RecordKey::simple(self.cube_id)
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .required("customer_id", &self.customer_id)
            .required("cube_name", &self.cube_name)
            .max_len("cube_name", &self.cube_name, 100)
            .optional_max_len("database_name", self.database_name.as_deref(), 128)
            .finish()
    }
}

/// Named group of cubes offered to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cubeset {
    #[serde(default)]
    pub cubeset_id: i64,
    pub customer_id: String,
    pub cubeset_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CubesetAttributes {
    pub description: Option<String>,
}

impl Record for Cubeset {
    const COLLECTION: &'static str = "cubesets";
    const KEY_FIELDS: &'static [&'static str] = &["cubeset_id"];
    const SERVER_ASSIGNED_KEY: bool = true;
    const READ_ONLY_FIELDS: &'static [&'static str] = &["customer_name"];

    fn key(&self) -> RecordKey {
        RecordKey::simple(self.cubeset_id)
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .required("customer_id", &self.customer_id)
            .required("cubeset_name", &self.cubeset_name)
            .max_len("cubeset_name", &self.cubeset_name, 100)
            .optional_max_len("description", self.description.as_deref(), 255)
            .finish()
    }
}

impl ParentScoped for Cubeset {
    type Attributes = CubesetAttributes;
    const PARENT_FIELD: &'static str = "customer_id";

    fn parent_id(&self) -> KeyPart {
        KeyPart::from(self.customer_id.as_str())
    }

    fn child_id(&self) -> KeyPart {
        KeyPart::from(self.cubeset_name.as_str())
    }

    fn compose(parent: &KeyPart, child: &KeyPart, attributes: CubesetAttributes) -> Result<Self> {
        Ok(Self {
            cubeset_id: 0,
            customer_id: text_part::<Self>(parent)?,
            cubeset_name: text_part::<Self>(child)?,
            description: attributes.description,
            customer_name: None,
            version: None,
        })
    }

    fn attributes(&self) -> CubesetAttributes {
        CubesetAttributes {
            description: self.description.clone(),
        }
    }

    fn apply(&mut self, attributes: CubesetAttributes) {
        self.description = attributes.description;
    }
}

/// Dimension table mapped into a cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(default)]
    pub dimension_id: i64,
    pub cube_id: i64,
    pub dimension_name: String,
    pub table_name: String,
    pub key_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cube_name: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

impl Record for Dimension {
    const COLLECTION: &'static str = "dimensions";
    const KEY_FIELDS: &'static [&'static str] = &["dimension_id"];
    const SERVER_ASSIGNED_KEY: bool = true;
    const READ_ONLY_FIELDS: &'static [&'static str] = &["cube_name"];

    fn key(&self) -> RecordKey {
        RecordKey::simple(self.dimension_id)
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .reference("cube_id", self.cube_id)
            .required("dimension_name", &self.dimension_name)
            .required("table_name", &self.table_name)
            .required("key_column", &self.key_column)
            .finish()
    }
}
