use crate::model::{
    AssociatedProduct, Association, AssociationChangeSet, Attribute, AttributeValueInstance,
    ChangeUnit, Channel, ChannelAttributeValue, FamilyAttributeLink, Id, Product, ProductFamily,
};
use anyhow::Result;

#[async_trait::async_trait]
pub trait AttributeStore: Send + Sync {
    async fn get_attribute(&self, id: &Id) -> Result<Option<Attribute>>;
    async fn list_attributes(&self) -> Result<Vec<Attribute>>;
    async fn upsert_attribute(&self, attribute: Attribute) -> Result<()>;
    /// Assign new sort orders in one atomic write.
    async fn set_attribute_sort_orders(&self, orders: &[(Id, i64)]) -> Result<()>;
}

#[async_trait::async_trait]
pub trait FamilyStore: Send + Sync {
    async fn get_family(&self, id: &Id) -> Result<Option<ProductFamily>>;
    async fn list_families(&self) -> Result<Vec<ProductFamily>>;
    async fn upsert_family(&self, family: ProductFamily) -> Result<()>;
    /// Fetch the unique link row for a (family, attribute) pair, soft-deleted
    /// rows included so relink can distinguish 1->0 from fresh creation.
    async fn get_link(&self, family_id: &Id, attribute_id: &Id)
        -> Result<Option<FamilyAttributeLink>>;
    /// Active (non-deleted) links of a family.
    async fn list_links_for_family(&self, family_id: &Id) -> Result<Vec<FamilyAttributeLink>>;
}

#[async_trait::async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_product(&self, id: &Id) -> Result<Option<Product>>;
    async fn list_products(&self) -> Result<Vec<Product>>;
    /// Non-deleted products currently assigned to a family.
    async fn list_products_for_family(&self, family_id: &Id) -> Result<Vec<Product>>;
    async fn upsert_product(&self, product: Product) -> Result<()>;
}

#[async_trait::async_trait]
pub trait InstanceStore: Send + Sync {
    /// The active instance for a (product, attribute) pair, if any.
    async fn get_instance(
        &self,
        product_id: &Id,
        attribute_id: &Id,
    ) -> Result<Option<AttributeValueInstance>>;
    async fn list_instances_for_product(
        &self,
        product_id: &Id,
    ) -> Result<Vec<AttributeValueInstance>>;
    /// Active instances governed by a specific (family, attribute) link.
    async fn list_instances_for_link(
        &self,
        family_id: &Id,
        attribute_id: &Id,
    ) -> Result<Vec<AttributeValueInstance>>;
    /// Apply one unit of work atomically: the triggering product/link write
    /// plus every derived instance create, update, retarget and delete.
    /// Units touching the same product are serialized by the store.
    async fn apply_change_unit(&self, unit: ChangeUnit) -> Result<()>;
}

#[async_trait::async_trait]
pub trait ChannelStore: Send + Sync {
    async fn get_channel(&self, id: &Id) -> Result<Option<Channel>>;
    async fn list_channels(&self) -> Result<Vec<Channel>>;
    async fn upsert_channel(&self, channel: Channel) -> Result<()>;
    async fn list_channel_values_for_product(
        &self,
        product_id: &Id,
    ) -> Result<Vec<ChannelAttributeValue>>;
    async fn upsert_channel_value(&self, value: ChannelAttributeValue) -> Result<()>;
}

#[async_trait::async_trait]
pub trait AssociationStore: Send + Sync {
    async fn get_association(&self, id: &Id) -> Result<Option<Association>>;
    async fn upsert_association(&self, association: Association) -> Result<()>;
    /// Active association rows, optionally narrowed by main/related id sets.
    async fn list_associated_products(
        &self,
        association_id: &Id,
        main_ids: Option<&[Id]>,
        related_ids: Option<&[Id]>,
    ) -> Result<Vec<AssociatedProduct>>;
    /// Apply paired forward/backward writes in one rollback boundary.
    async fn apply_association_changes(&self, changes: AssociationChangeSet) -> Result<()>;
}

pub trait Store:
    AttributeStore
    + FamilyStore
    + ProductStore
    + InstanceStore
    + ChannelStore
    + AssociationStore
    + Send
    + Sync
{
}
