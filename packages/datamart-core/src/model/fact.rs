use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, Result};
use crate::key::{KeyPart, RecordKey};
use crate::record::{int_part, text_part, FieldRules, ParentScoped, Record};
use crate::version::VersionToken;

/// Fact table feeding a cube's measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    #[serde(default)]
    pub fact_id: i64,
    pub cube_id: i64,
    pub fact_name: String,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

impl Record for Fact {
    const COLLECTION: &'static str = "facts";
    const KEY_FIELDS: &'static [&'static str] = &["fact_id"];
    const SERVER_ASSIGNED_KEY: bool = true;

    fn key(&self) -> RecordKey {
        RecordKey::simple(self.fact_id)
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .reference("cube_id", self.cube_id)
            .required("fact_name", &self.fact_name)
            .required("table_name", &self.table_name)
            .finish()
    }
}

/// Column of a fact table. Column names are unique per fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactColumn {
    #[serde(default)]
    pub fact_column_id: i64,
    pub fact_id: i64,
    pub column_name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_measure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_name: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactColumnAttributes {
    pub data_type: String,
    pub is_measure: bool,
    pub format_string: Option<String>,
}

impl Record for FactColumn {
    const COLLECTION: &'static str = "factcolumns";
    const KEY_FIELDS: &'static [&'static str] = &["fact_column_id"];
    const SERVER_ASSIGNED_KEY: bool = true;
    const READ_ONLY_FIELDS: &'static [&'static str] = &["fact_name"];

    fn key(&self) -> RecordKey {
        RecordKey::simple(self.fact_column_id)
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .reference("fact_id", self.fact_id)
            .required("column_name", &self.column_name)
            .max_len("column_name", &self.column_name, 128)
            .required("data_type", &self.data_type)
            .finish()
    }
}

impl ParentScoped for FactColumn {
    type Attributes = FactColumnAttributes;
    const PARENT_FIELD: &'static str = "fact_id";

    fn parent_id(&self) -> KeyPart {
        KeyPart::Int(self.fact_id)
    }

    fn child_id(&self) -> KeyPart {
        KeyPart::from(self.column_name.as_str())
    }

    fn compose(
        parent: &KeyPart,
        child: &KeyPart,
        attributes: FactColumnAttributes,
    ) -> Result<Self> {
        Ok(Self {
            fact_column_id: 0,
            fact_id: int_part::<Self>(parent)?,
            column_name: text_part::<Self>(child)?,
            data_type: attributes.data_type,
            is_measure: attributes.is_measure,
            format_string: attributes.format_string,
            fact_name: None,
            version: None,
        })
    }

    fn attributes(&self) -> FactColumnAttributes {
        FactColumnAttributes {
            data_type: self.data_type.clone(),
            is_measure: self.is_measure,
            format_string: self.format_string.clone(),
        }
    }

    fn apply(&mut self, attributes: FactColumnAttributes) {
        self.data_type = attributes.data_type;
        self.is_measure = attributes.is_measure;
        self.format_string = attributes.format_string;
    }
}

/// Calculation type (sum, average, running total, ...) identified by a code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcType {
    pub calc_type_code: String,
    pub description: String,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

impl Record for CalcType {
    const COLLECTION: &'static str = "calctypes";
    const KEY_FIELDS: &'static [&'static str] = &["calc_type_code"];

    fn key(&self) -> RecordKey {
        RecordKey::simple(self.calc_type_code.as_str())
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .required("calc_type_code", &self.calc_type_code)
            .max_len("calc_type_code", &self.calc_type_code, 10)
            .required("description", &self.description)
            .finish()
    }
}

/// Calculation type enabled on a fact column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactColumnCalcType {
    pub fact_column_id: i64,
    pub calc_type_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calc_type_description: Option<String>,
    #[serde(rename = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionToken>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalcTypeDisplay {
    pub display_name: Option<String>,
    pub is_visible: bool,
}

impl Record for FactColumnCalcType {
    const COLLECTION: &'static str = "factcolumncalctypes";
    const KEY_FIELDS: &'static [&'static str] = &["fact_column_id", "calc_type_code"];
    const READ_ONLY_FIELDS: &'static [&'static str] = &["calc_type_description"];

    fn key(&self) -> RecordKey {
        RecordKey::composite(self.fact_column_id, self.calc_type_code.as_str())
    }

    fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    fn validate(&self) -> FieldErrors {
        FieldRules::new()
            .reference("fact_column_id", self.fact_column_id)
            .required("calc_type_code", &self.calc_type_code)
            .optional_max_len("display_name", self.display_name.as_deref(), 100)
            .finish()
    }
}

impl ParentScoped for FactColumnCalcType {
    type Attributes = CalcTypeDisplay;
    const PARENT_FIELD: &'static str = "fact_column_id";

    fn parent_id(&self) -> KeyPart {
        KeyPart::Int(self.fact_column_id)
    }

    fn child_id(&self) -> KeyPart {
        KeyPart::from(self.calc_type_code.as_str())
    }

    fn compose(parent: &KeyPart, child: &KeyPart, attributes: CalcTypeDisplay) -> Result<Self> {
        Ok(Self {
            fact_column_id: int_part::<Self>(parent)?,
            calc_type_code: text_part::<Self>(child)?,
            display_name: attributes.display_name,
            is_visible: attributes.is_visible,
            calc_type_description: None,
            version: None,
        })
    }

    fn attributes(&self) -> CalcTypeDisplay {
        CalcTypeDisplay {
            display_name: self.display_name.clone(),
            is_visible: self.is_visible,
        }
    }

    fn apply(&mut self, attributes: CalcTypeDisplay) {
        self.display_name = attributes.display_name;
        self.is_visible = attributes.is_visible;
    }
}
