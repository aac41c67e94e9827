use crate::model::{
    AssociatedProduct, Association, AssociationChangeSet, Attribute, AttributeValueInstance,
    ChangeUnit, Channel, ChannelAttributeValue, FamilyAttributeLink, Id, Product, ProductFamily,
};
use crate::store::traits::{
    AssociationStore, AttributeStore, ChannelStore, FamilyStore, InstanceStore, ProductStore,
    Store,
};
use anyhow::{bail, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct State {
    attributes: HashMap<Id, Attribute>,
    families: HashMap<Id, ProductFamily>,
    links: HashMap<Id, FamilyAttributeLink>,
    products: HashMap<Id, Product>,
    instances: HashMap<Id, AttributeValueInstance>,
    channels: HashMap<Id, Channel>,
    channel_values: HashMap<Id, ChannelAttributeValue>,
    associations: HashMap<Id, Association>,
    associated_products: HashMap<Id, AssociatedProduct>,
}

/// In-process store backed by locked maps, used by tests, the seed loader
/// and single-node deployments. The single write lock per unit gives the
/// same atomicity and same-product serialization the Postgres store gets
/// from transactions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AttributeStore for MemoryStore {
    async fn get_attribute(&self, id: &Id) -> Result<Option<Attribute>> {
        Ok(self.state.read().attributes.get(id).cloned())
    }

    async fn list_attributes(&self) -> Result<Vec<Attribute>> {
        let mut attributes: Vec<Attribute> = self
            .state
            .read()
            .attributes
            .values()
            .filter(|a| !a.deleted)
            .cloned()
            .collect();
        attributes.sort_by(|a, b| (a.sort_order, &a.id).cmp(&(b.sort_order, &b.id)));
        Ok(attributes)
    }

    async fn upsert_attribute(&self, attribute: Attribute) -> Result<()> {
        self.state
            .write()
            .attributes
            .insert(attribute.id.clone(), attribute);
        Ok(())
    }

    async fn set_attribute_sort_orders(&self, orders: &[(Id, i64)]) -> Result<()> {
        let mut state = self.state.write();
        for (id, sort_order) in orders {
            if let Some(attribute) = state.attributes.get_mut(id) {
                attribute.sort_order = *sort_order;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl FamilyStore for MemoryStore {
    async fn get_family(&self, id: &Id) -> Result<Option<ProductFamily>> {
        Ok(self.state.read().families.get(id).cloned())
    }

    async fn list_families(&self) -> Result<Vec<ProductFamily>> {
        Ok(self
            .state
            .read()
            .families
            .values()
            .filter(|f| !f.deleted)
            .cloned()
            .collect())
    }

    async fn upsert_family(&self, family: ProductFamily) -> Result<()> {
        self.state.write().families.insert(family.id.clone(), family);
        Ok(())
    }

    async fn get_link(
        &self,
        family_id: &Id,
        attribute_id: &Id,
    ) -> Result<Option<FamilyAttributeLink>> {
        Ok(self
            .state
            .read()
            .links
            .values()
            .find(|l| &l.product_family_id == family_id && &l.attribute_id == attribute_id)
            .cloned())
    }

    async fn list_links_for_family(&self, family_id: &Id) -> Result<Vec<FamilyAttributeLink>> {
        Ok(self
            .state
            .read()
            .links
            .values()
            .filter(|l| &l.product_family_id == family_id && !l.deleted)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl ProductStore for MemoryStore {
    async fn get_product(&self, id: &Id) -> Result<Option<Product>> {
        Ok(self.state.read().products.get(id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self
            .state
            .read()
            .products
            .values()
            .filter(|p| !p.deleted)
            .cloned()
            .collect())
    }

    async fn list_products_for_family(&self, family_id: &Id) -> Result<Vec<Product>> {
        Ok(self
            .state
            .read()
            .products
            .values()
            .filter(|p| !p.deleted && p.product_family_id.as_ref() == Some(family_id))
            .cloned()
            .collect())
    }

    async fn upsert_product(&self, product: Product) -> Result<()> {
        self.state.write().products.insert(product.id.clone(), product);
        Ok(())
    }
}

#[async_trait::async_trait]
impl InstanceStore for MemoryStore {
    async fn get_instance(
        &self,
        product_id: &Id,
        attribute_id: &Id,
    ) -> Result<Option<AttributeValueInstance>> {
        Ok(self
            .state
            .read()
            .instances
            .values()
            .find(|i| {
                !i.deleted && &i.product_id == product_id && &i.attribute_id == attribute_id
            })
            .cloned())
    }

    async fn list_instances_for_product(
        &self,
        product_id: &Id,
    ) -> Result<Vec<AttributeValueInstance>> {
        Ok(self
            .state
            .read()
            .instances
            .values()
            .filter(|i| !i.deleted && &i.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn list_instances_for_link(
        &self,
        family_id: &Id,
        attribute_id: &Id,
    ) -> Result<Vec<AttributeValueInstance>> {
        Ok(self
            .state
            .read()
            .instances
            .values()
            .filter(|i| {
                !i.deleted
                    && i.product_family_id.as_ref() == Some(family_id)
                    && &i.attribute_id == attribute_id
            })
            .cloned()
            .collect())
    }

    async fn apply_change_unit(&self, unit: ChangeUnit) -> Result<()> {
        let mut state = self.state.write();

        // validate before mutating so the unit applies whole or not at all
        for id in &unit.instances.deletes {
            if !state.instances.contains_key(id) {
                bail!("cannot delete unknown instance {}", id);
            }
        }
        for retarget in &unit.instances.retargets {
            if !state.instances.contains_key(&retarget.instance_id) {
                bail!("cannot retarget unknown instance {}", retarget.instance_id);
            }
        }
        for update in &unit.instances.updates {
            if !state.instances.contains_key(&update.id) {
                bail!("cannot update unknown instance {}", update.id);
            }
        }
        for create in &unit.instances.creates {
            let displaced = unit.instances.deletes.iter().collect::<Vec<_>>();
            let occupied = state.instances.values().any(|i| {
                !i.deleted
                    && i.product_id == create.product_id
                    && i.attribute_id == create.attribute_id
                    && !displaced.contains(&&i.id)
            });
            if occupied {
                bail!(
                    "instance for product {} attribute {} already exists",
                    create.product_id,
                    create.attribute_id
                );
            }
        }

        if let Some(product) = unit.product {
            state.products.insert(product.id.clone(), product);
        }
        if let Some(link) = unit.link {
            state.links.insert(link.id.clone(), link);
        }
        for id in unit.instances.deletes {
            if let Some(instance) = state.instances.get_mut(&id) {
                instance.deleted = true;
            }
        }
        for retarget in unit.instances.retargets {
            if let Some(instance) = state.instances.get_mut(&retarget.instance_id) {
                instance.product_family_id = Some(retarget.product_family_id);
            }
        }
        for update in unit.instances.updates {
            state.instances.insert(update.id.clone(), update);
        }
        for create in unit.instances.creates {
            state.instances.insert(create.id.clone(), create);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChannelStore for MemoryStore {
    async fn get_channel(&self, id: &Id) -> Result<Option<Channel>> {
        Ok(self.state.read().channels.get(id).cloned())
    }

    async fn list_channels(&self) -> Result<Vec<Channel>> {
        Ok(self
            .state
            .read()
            .channels
            .values()
            .filter(|c| !c.deleted)
            .cloned()
            .collect())
    }

    async fn upsert_channel(&self, channel: Channel) -> Result<()> {
        self.state.write().channels.insert(channel.id.clone(), channel);
        Ok(())
    }

    async fn list_channel_values_for_product(
        &self,
        product_id: &Id,
    ) -> Result<Vec<ChannelAttributeValue>> {
        Ok(self
            .state
            .read()
            .channel_values
            .values()
            .filter(|v| !v.deleted && &v.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn upsert_channel_value(&self, value: ChannelAttributeValue) -> Result<()> {
        let mut state = self.state.write();
        // at most one active row per (product, channel, attribute)
        let existing = state
            .channel_values
            .values()
            .find(|v| {
                !v.deleted
                    && v.product_id == value.product_id
                    && v.channel_id == value.channel_id
                    && v.attribute_id == value.attribute_id
            })
            .map(|v| v.id.clone());
        let mut value = value;
        if let Some(id) = existing {
            value.id = id;
        }
        state.channel_values.insert(value.id.clone(), value);
        Ok(())
    }
}

#[async_trait::async_trait]
impl AssociationStore for MemoryStore {
    async fn get_association(&self, id: &Id) -> Result<Option<Association>> {
        Ok(self.state.read().associations.get(id).cloned())
    }

    async fn upsert_association(&self, association: Association) -> Result<()> {
        self.state
            .write()
            .associations
            .insert(association.id.clone(), association);
        Ok(())
    }

    async fn list_associated_products(
        &self,
        association_id: &Id,
        main_ids: Option<&[Id]>,
        related_ids: Option<&[Id]>,
    ) -> Result<Vec<AssociatedProduct>> {
        Ok(self
            .state
            .read()
            .associated_products
            .values()
            .filter(|row| {
                !row.deleted
                    && &row.association_id == association_id
                    && main_ids.map_or(true, |ids| ids.contains(&row.main_product_id))
                    && related_ids.map_or(true, |ids| ids.contains(&row.related_product_id))
            })
            .cloned()
            .collect())
    }

    async fn apply_association_changes(&self, changes: AssociationChangeSet) -> Result<()> {
        let mut state = self.state.write();
        for id in &changes.deletes {
            if !state.associated_products.contains_key(id) {
                bail!("cannot delete unknown associated product {}", id);
            }
        }
        for id in changes.deletes {
            if let Some(row) = state.associated_products.get_mut(&id) {
                row.deleted = true;
            }
        }
        for create in changes.creates {
            state
                .associated_products
                .insert(create.id.clone(), create);
        }
        Ok(())
    }
}

impl Store for MemoryStore {}
