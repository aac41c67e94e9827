use crate::model::{AttributeType, Id};
use serde::Serialize;

/// Group fallback used when an attribute belongs to no group, matching the
/// durable output contract.
pub const NO_GROUP_ID: &str = "no_group";
pub const NO_GROUP_NAME: &str = "No group";
pub const NO_GROUP_ORDER: i64 = 999;

/// One fully typed, locale-expanded attribute record produced by the read
/// path. Locale-qualified fields ("valueDeDe", "typeValueDeDe", "nameDeDe")
/// are flattened into the record to preserve the original field naming.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAttribute {
    pub product_attribute_value_id: Id,
    pub attribute_id: Id,
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    pub is_required: bool,
    pub is_custom: bool,
    pub attribute_group_id: Id,
    pub attribute_group_name: String,
    pub attribute_group_order: i64,
    pub sort_order: i64,
    pub value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_value: Option<Vec<String>>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(flatten)]
    pub locale_fields: serde_json::Map<String, serde_json::Value>,
}

/// One channel-scoped attribute record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAttributeRecord {
    pub channel_product_attribute_value_id: Id,
    pub product_id: Id,
    pub attribute_id: Id,
    pub attribute_name: String,
    pub attribute_type: AttributeType,
    pub attribute_is_required: bool,
    pub attribute_is_multi_channel: bool,
    pub attribute_group_id: Id,
    pub attribute_group_name: String,
    pub attribute_group_order: i64,
    pub attribute_value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_type_value: Option<Vec<String>>,
    #[serde(flatten)]
    pub locale_fields: serde_json::Map<String, serde_json::Value>,
}

/// Channel grouping for the channel read path: the channel is returned even
/// when it has no overriding values yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAttributes {
    pub channel_id: Id,
    pub channel_name: String,
    pub locales: Vec<String>,
    pub attributes: Vec<ChannelAttributeRecord>,
}
