use crate::model::{
    AssociatedProduct, AttributeValueInstance, FamilyAttributeLink, Id, Product,
};
use serde::{Deserialize, Serialize};

/// Repoint one instance's owning family, preserving its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retarget {
    pub instance_id: Id,
    pub product_family_id: Id,
}

/// The derived instance writes computed for one mutation event. Applied by
/// the store as a whole or not at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceChangeSet {
    pub creates: Vec<AttributeValueInstance>,
    pub updates: Vec<AttributeValueInstance>,
    pub retargets: Vec<Retarget>,
    pub deletes: Vec<Id>,
}

impl InstanceChangeSet {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty()
            && self.updates.is_empty()
            && self.retargets.is_empty()
            && self.deletes.is_empty()
    }
}

/// One logical unit of work per triggering change: the row that triggered
/// it (a link toggle or a product write) together with every derived
/// instance write. Either all of it becomes durable or none of it does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeUnit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<FamilyAttributeLink>,
    #[serde(default)]
    pub instances: InstanceChangeSet,
}

impl ChangeUnit {
    pub fn for_instances(instances: InstanceChangeSet) -> Self {
        Self {
            product: None,
            link: None,
            instances,
        }
    }
}

/// Paired association writes sharing one rollback boundary: forward rows and
/// their backward mirrors are created and deleted together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationChangeSet {
    pub creates: Vec<AssociatedProduct>,
    pub deletes: Vec<Id>,
}

impl AssociationChangeSet {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.deletes.is_empty()
    }
}
