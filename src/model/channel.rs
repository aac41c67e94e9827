use crate::model::{generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sales destination that may override attribute values independently of
/// the base instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locales: Vec<String>,
    #[serde(default)]
    pub deleted: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            locales: Vec::new(),
            deleted: false,
        }
    }
}

/// Channel-scoped override of an attribute value. At most one active row
/// per (productId, channelId, attributeId); shares the raw/locale value
/// shape of the base instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAttributeValue {
    pub id: Id,
    pub product_id: Id,
    pub channel_id: Id,
    pub attribute_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locale_values: BTreeMap<String, String>,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChannelAttributeValue {
    pub fn new(product_id: Id, channel_id: Id, attribute_id: Id) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            product_id,
            channel_id,
            attribute_id,
            value: None,
            locale_values: BTreeMap::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}
