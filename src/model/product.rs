use crate::model::{generate_id, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Id,
    pub name: String,
    /// Nullable: "custom" products carry no family but may still hold
    /// ad-hoc attribute instances.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_family_id: Option<Id>,
    #[serde(default)]
    pub deleted: bool,
}

/// Input model for product creation; the id is assigned server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_family_id: Option<Id>,
}

impl NewProduct {
    pub fn into_product(self) -> Product {
        Product {
            id: generate_id(),
            name: self.name,
            product_family_id: self.product_family_id,
            deleted: false,
        }
    }
}

/// The materialized per-product, per-attribute storage row.
///
/// `productFamilyId` is non-null iff the instance arose from a family link;
/// null means the instance is custom and the propagator never touches it.
/// `value` holds the raw (possibly JSON-encoded) value; `localeValues` holds
/// one raw value per configured locale, keyed by locale code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeValueInstance {
    pub id: Id,
    pub product_id: Id,
    pub attribute_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_family_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub locale_values: BTreeMap<String, String>,
    /// Auxiliary instance metadata written via the update path.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttributeValueInstance {
    /// A fresh, default-valued instance materialized from a family link.
    pub fn from_link(product_id: Id, attribute_id: Id, product_family_id: Id) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            product_id,
            attribute_id,
            product_family_id: Some(product_family_id),
            value: None,
            locale_values: BTreeMap::new(),
            data: serde_json::Map::new(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.product_family_id.is_none()
    }
}
