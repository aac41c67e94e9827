use crate::model::{generate_id, Id};
use serde::{Deserialize, Serialize};

/// A named bundle of attributes that products can subscribe to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFamily {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
}

impl ProductFamily {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            deleted: false,
        }
    }
}

/// The many-to-many linkage row between a family and an attribute.
/// The (productFamilyId, attributeId) pair is unique; the row is
/// soft-deleted rather than removed so relink history survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyAttributeLink {
    pub id: Id,
    pub product_family_id: Id,
    pub attribute_id: Id,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_multi_channel: bool,
    #[serde(default)]
    pub deleted: bool,
}

impl FamilyAttributeLink {
    pub fn new(product_family_id: Id, attribute_id: Id) -> Self {
        Self {
            id: generate_id(),
            product_family_id,
            attribute_id,
            is_required: false,
            is_multi_channel: false,
            deleted: false,
        }
    }
}

/// Flags carried by a link when it is (re)activated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkOptions {
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_multi_channel: bool,
}
