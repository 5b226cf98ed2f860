use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, Result};
use crate::key::{KeyPart, RecordKey};
use crate::record::{int_part, FieldRules, ParentScoped, Record};
use crate::version::VersionToken;

/// Group of RDL reports sharing a column selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdlGroup {
    #[serde(default)]
    pub rdl_group_id: i64,
    pub group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

impl Record for RdlGroup {
    const COLLECTION: &'static str = "rdlgroups";
    const KEY_FIELDS: &'static [&'static str] = &["rdl_group_id"];
    const SERVER_ASSIGNED_KEY: bool = true;

    fn key(&self) -> RecordKey {
        RecordKey::simple(self.rdl_group_id)
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .required("group_name", &self.group_name)
            .max_len("group_name", &self.group_name, 100)
            .finish()
    }
}

/// Fact column exposed to an RDL group, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdlGroupFactColumn {
    pub rdl_group_id: i64,
    pub fact_column_id: i64,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisplayOrder(pub i32);

impl Record for RdlGroupFactColumn {
    const COLLECTION: &'static str = "rdlgroupfactcolumns";
    const KEY_FIELDS: &'static [&'static str] = &["rdl_group_id", "fact_column_id"];
    const READ_ONLY_FIELDS: &'static [&'static str] = &["column_name"];

    fn key(&self) -> RecordKey {
        RecordKey::composite(self.rdl_group_id, self.fact_column_id)
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .reference("rdl_group_id", self.rdl_group_id)
            .reference("fact_column_id", self.fact_column_id)
            .check(
                "display_order",
                self.display_order >= 0,
                "display_order cannot be negative",
            )
            .finish()
    }
}

impl ParentScoped for RdlGroupFactColumn {
    type Attributes = DisplayOrder;
    const PARENT_FIELD: &'static str = "rdl_group_id";

    fn parent_id(&self) -> KeyPart {
        KeyPart::Int(self.rdl_group_id)
    }

    fn child_id(&self) -> KeyPart {
        KeyPart::Int(self.fact_column_id)
    }

    fn compose(parent: &KeyPart, child: &KeyPart, attributes: DisplayOrder) -> Result<Self> {
        Ok(Self {
            rdl_group_id: int_part::<Self>(parent)?,
            fact_column_id: int_part::<Self>(child)?,
            display_order: attributes.0,
            column_name: None,
            version: None,
        })
    }

    fn attributes(&self) -> DisplayOrder {
        DisplayOrder(self.display_order)
    }

    fn apply(&mut self, attributes: DisplayOrder) {
        self.display_order = attributes.0;
    }
}
