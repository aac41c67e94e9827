use crate::model::{generate_id, AttributeType, Id};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A typed field definable once and assignable to many product families.
/// The declared type is immutable once values exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: Id,
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_group_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_group_order: Option<i64>,
    /// Allowed options for enumerated types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_value: Option<Vec<String>>,
    /// Per-locale option lists, keyed by locale code (e.g. "de_DE").
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locale_type_values: BTreeMap<String, Vec<String>>,
    /// Per-locale display names, keyed by locale code.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locale_names: BTreeMap<String, String>,
    #[serde(default)]
    pub deleted: bool,
}

/// Input model for attribute creation; the id is assigned server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_group_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_group_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_value: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locale_type_values: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locale_names: BTreeMap<String, String>,
}

impl NewAttribute {
    pub fn into_attribute(self) -> Attribute {
        Attribute {
            id: generate_id(),
            name: self.name,
            attribute_type: self.attribute_type,
            sort_order: self.sort_order,
            attribute_group_id: self.attribute_group_id,
            attribute_group_name: self.attribute_group_name,
            attribute_group_order: self.attribute_group_order,
            type_value: self.type_value,
            locale_type_values: self.locale_type_values,
            locale_names: self.locale_names,
            deleted: false,
        }
    }
}
