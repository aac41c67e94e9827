use crate::model::{generate_id, Id};
use serde::{Deserialize, Serialize};

/// A typed, optionally symmetric relation between two products
/// (e.g. "accessory of"). When `backwardAssociationId` is set, every forward
/// row implies a mirrored row under the backward association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub id: Id,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backward_association_id: Option<Id>,
    #[serde(default)]
    pub deleted: bool,
}

impl Association {
    pub fn new(name: impl Into<String>, backward_association_id: Option<Id>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            backward_association_id,
            deleted: false,
        }
    }
}

/// A directed association edge. The forward row of a symmetric pair carries
/// the backward association id; its mirror is a plain row under the backward
/// association with main/related swapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedProduct {
    pub id: Id,
    pub association_id: Id,
    pub main_product_id: Id,
    pub related_product_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backward_association_id: Option<Id>,
    #[serde(default)]
    pub deleted: bool,
}

impl AssociatedProduct {
    pub fn new(association_id: Id, main_product_id: Id, related_product_id: Id) -> Self {
        Self {
            id: generate_id(),
            association_id,
            main_product_id,
            related_product_id,
            backward_association_id: None,
            deleted: false,
        }
    }
}
