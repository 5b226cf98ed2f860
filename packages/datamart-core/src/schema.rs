//! Mapping between domain records and wire DTOs.
//!
//! Domain structs use snake_case field names. The backend may speak another
//! casing; the mapping is applied once at the repository boundary and nowhere
//! else.

use std::str::FromStr;

use convert_case::{Case, Casing};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{FieldErrors, Result};

/// Field-name casing used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireCase {
    Snake,
    #[default]
    Camel,
    Pascal,
}

impl FromStr for WireCase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "snake" => Ok(WireCase::Snake),
            "camel" => Ok(WireCase::Camel),
            "pascal" => Ok(WireCase::Pascal),
            other => Err(format!("unknown wire case '{}'", other)),
        }
    }
}

impl std::fmt::Display for WireCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WireCase::Snake => "snake",
            WireCase::Camel => "camel",
            WireCase::Pascal => "pascal",
        };
        f.write_str(name)
    }
}

/// Typed DTO adapter for one wire casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchemaMapper {
    case: WireCase,
}

impl SchemaMapper {
    pub fn new(case: WireCase) -> Self {
        Self { case }
    }

    pub fn case(&self) -> WireCase {
        self.case
    }

    /// Domain field name to wire field name.
    pub fn field_to_wire(&self, name: &str) -> String {
        match self.case {
            WireCase::Snake => name.to_string(),
            WireCase::Camel => name.to_case(Case::Camel),
            WireCase::Pascal => name.to_case(Case::Pascal),
        }
    }

    /// Wire field name back to the domain snake_case name.
    pub fn field_from_wire(&self, name: &str) -> String {
        match self.case {
            WireCase::Snake => name.to_string(),
            WireCase::Camel | WireCase::Pascal => name.to_case(Case::Snake),
        }
    }

    /// Renames object keys recursively for transmission.
    pub fn to_wire(&self, value: Value) -> Value {
        self.rename(value, &|name| self.field_to_wire(name))
    }

    /// Renames object keys recursively after reception.
    pub fn from_wire(&self, value: Value) -> Value {
        self.rename(value, &|name| self.field_from_wire(name))
    }

    pub fn encode<R: Serialize>(&self, record: &R) -> Result<Value> {
        Ok(self.to_wire(serde_json::to_value(record)?))
    }

    pub fn decode<R: DeserializeOwned>(&self, value: Value) -> Result<R> {
        Ok(serde_json::from_value(self.from_wire(value))?)
    }

    /// Maps the keys of a server `errors` map onto domain field names.
    pub fn errors_from_wire(&self, errors: FieldErrors) -> FieldErrors {
        errors
            .into_iter()
            .map(|(field, messages)| (self.field_from_wire(&field), messages))
            .collect()
    }

    /// Maps domain error keys onto wire names.
    pub fn errors_to_wire(&self, errors: FieldErrors) -> FieldErrors {
        errors
            .into_iter()
            .map(|(field, messages)| (self.field_to_wire(&field), messages))
            .collect()
    }

    fn rename(&self, value: Value, f: &dyn Fn(&str) -> String) -> Value {
        if self.case == WireCase::Snake {
            return value;
        }
        match value {
            Value::Object(map) => {
                let renamed: Map<String, Value> = map
                    .into_iter()
                    .map(|(k, v)| (f(&k), self.rename(v, f)))
                    .collect();
                Value::Object(renamed)
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.rename(v, f)).collect())
            }
            other => other,
        }
    }
}
