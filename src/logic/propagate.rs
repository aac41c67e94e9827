use crate::model::{
    AttributeValueInstance, CatalogError, CatalogResult, ChangeUnit, FamilyAttributeLink, Id,
    InstanceChangeSet, LinkOptions, Product, Retarget,
};
use crate::store::traits::Store;
use std::collections::HashSet;

/// Keeps the derived instance table consistent with the family-attribute
/// linkage: "instances for product P" always equals "attributes linked to
/// P's family", plus custom instances the propagator never touches.
///
/// Planning is pure; application is one atomic `ChangeUnit` per triggering
/// mutation, so a partial old/new mix is never observable. Errors propagate
/// to the caller without internal retry.
pub struct Propagator;

impl Propagator {
    /// Link or unlink an attribute from a family and propagate to every
    /// product of that family. Activation and re-activation of a
    /// soft-deleted link behave identically; both are idempotent.
    pub async fn apply_family_link<S: Store>(
        store: &S,
        family_id: &Id,
        attribute_id: &Id,
        active: bool,
        options: LinkOptions,
    ) -> CatalogResult<()> {
        let family = store
            .get_family(family_id)
            .await?
            .filter(|f| !f.deleted)
            .ok_or_else(|| CatalogError::NotFound(format!("product family {}", family_id)))?;
        store
            .get_attribute(attribute_id)
            .await?
            .filter(|a| !a.deleted)
            .ok_or_else(|| CatalogError::NotFound(format!("attribute {}", attribute_id)))?;

        let existing = store.get_link(family_id, attribute_id).await?;

        if active {
            let mut link = existing.unwrap_or_else(|| {
                FamilyAttributeLink::new(family_id.clone(), attribute_id.clone())
            });
            link.deleted = false;
            link.is_required = options.is_required;
            link.is_multi_channel = options.is_multi_channel;

            let products = store.list_products_for_family(family_id).await?;
            let mut pairs = Vec::with_capacity(products.len());
            for product in products {
                let instance = store.get_instance(&product.id, attribute_id).await?;
                pairs.push((product, instance));
            }
            let instances = plan_link_activated(family_id, attribute_id, &pairs);
            log::debug!(
                "linking attribute {} to family {}: {} creates, {} retargets",
                attribute_id,
                family.id,
                instances.creates.len(),
                instances.retargets.len()
            );
            store
                .apply_change_unit(ChangeUnit {
                    product: None,
                    link: Some(link),
                    instances,
                })
                .await?;
        } else {
            // unlinking a link that was never active is a no-op
            let Some(mut link) = existing.filter(|l| !l.deleted) else {
                return Ok(());
            };
            link.deleted = true;

            let doomed = store.list_instances_for_link(family_id, attribute_id).await?;
            let instances = InstanceChangeSet {
                deletes: doomed.into_iter().map(|i| i.id).collect(),
                ..Default::default()
            };
            store
                .apply_change_unit(ChangeUnit {
                    product: None,
                    link: Some(link),
                    instances,
                })
                .await?;
        }
        Ok(())
    }

    /// Persist a new product and materialize one instance per attribute
    /// currently linked to its family, as a single unit.
    pub async fn on_product_created<S: Store>(
        store: &S,
        product: Product,
    ) -> CatalogResult<Product> {
        let mut instances = InstanceChangeSet::default();
        if let Some(family_id) = &product.product_family_id {
            store
                .get_family(family_id)
                .await?
                .filter(|f| !f.deleted)
                .ok_or_else(|| CatalogError::NotFound(format!("product family {}", family_id)))?;
            let links = store.list_links_for_family(family_id).await?;
            instances = plan_product_created(&product, &links);
        }
        store
            .apply_change_unit(ChangeUnit {
                product: Some(product.clone()),
                link: None,
                instances,
            })
            .await?;
        Ok(product)
    }

    /// Reassign a product's family (including to none). Value-preserving
    /// retargets, deletions and creations execute as one atomic unit.
    pub async fn apply_product_family_change<S: Store>(
        store: &S,
        product_id: &Id,
        old_family_id: Option<&Id>,
        new_family_id: Option<&Id>,
    ) -> CatalogResult<()> {
        let mut product = store
            .get_product(product_id)
            .await?
            .filter(|p| !p.deleted)
            .ok_or_else(|| CatalogError::NotFound(format!("product {}", product_id)))?;

        if product.product_family_id.as_ref() != old_family_id {
            return Err(CatalogError::InvalidRequest(format!(
                "product {} family changed concurrently",
                product_id
            )));
        }
        if old_family_id == new_family_id {
            return Ok(());
        }

        let new_links = match new_family_id {
            Some(family_id) => {
                store
                    .get_family(family_id)
                    .await?
                    .filter(|f| !f.deleted)
                    .ok_or_else(|| {
                        CatalogError::NotFound(format!("product family {}", family_id))
                    })?;
                store.list_links_for_family(family_id).await?
            }
            None => Vec::new(),
        };
        let instances = store.list_instances_for_product(product_id).await?;
        let changes = plan_family_change(&product, new_family_id, &new_links, &instances);

        product.product_family_id = new_family_id.cloned();
        log::debug!(
            "family change for product {}: {} retargets, {} deletes, {} creates",
            product_id,
            changes.retargets.len(),
            changes.deletes.len(),
            changes.creates.len()
        );
        store
            .apply_change_unit(ChangeUnit {
                product: Some(product),
                link: None,
                instances: changes,
            })
            .await?;
        Ok(())
    }
}

/// Plan for an activated (or re-activated) link: one create per product of
/// the family, unless an instance already exists for that (product,
/// attribute) pair. A family-owned instance is retargeted to the family in
/// force instead; a custom instance is left alone.
pub fn plan_link_activated(
    family_id: &Id,
    attribute_id: &Id,
    products: &[(Product, Option<AttributeValueInstance>)],
) -> InstanceChangeSet {
    let mut changes = InstanceChangeSet::default();
    for (product, existing) in products {
        match existing {
            None => changes.creates.push(AttributeValueInstance::from_link(
                product.id.clone(),
                attribute_id.clone(),
                family_id.clone(),
            )),
            Some(instance) => match &instance.product_family_id {
                Some(owner) if owner != family_id => changes.retargets.push(Retarget {
                    instance_id: instance.id.clone(),
                    product_family_id: family_id.clone(),
                }),
                _ => {}
            },
        }
    }
    changes
}

/// Plan for a product created with a family: one default-valued instance per
/// active link. Insertion order across attributes is unspecified.
pub fn plan_product_created(
    product: &Product,
    links: &[FamilyAttributeLink],
) -> InstanceChangeSet {
    InstanceChangeSet {
        creates: links
            .iter()
            .map(|link| {
                AttributeValueInstance::from_link(
                    product.id.clone(),
                    link.attribute_id.clone(),
                    link.product_family_id.clone(),
                )
            })
            .collect(),
        ..Default::default()
    }
}

/// Plan for a family reassignment. With no new family, every family-owned
/// instance goes; otherwise instances whose attribute survives into the new
/// family are retargeted with their value preserved, the rest are deleted,
/// and newly linked attributes gain fresh instances.
pub fn plan_family_change(
    product: &Product,
    new_family_id: Option<&Id>,
    new_links: &[FamilyAttributeLink],
    instances: &[AttributeValueInstance],
) -> InstanceChangeSet {
    let mut changes = InstanceChangeSet::default();

    let Some(new_family_id) = new_family_id else {
        changes.deletes = instances
            .iter()
            .filter(|i| i.product_family_id.is_some())
            .map(|i| i.id.clone())
            .collect();
        return changes;
    };

    let new_attribute_ids: HashSet<&str> =
        new_links.iter().map(|l| l.attribute_id.as_str()).collect();

    for instance in instances {
        match &instance.product_family_id {
            // custom instances are never touched
            None => {}
            Some(owner) => {
                if new_attribute_ids.contains(instance.attribute_id.as_str()) {
                    if owner != new_family_id {
                        changes.retargets.push(Retarget {
                            instance_id: instance.id.clone(),
                            product_family_id: new_family_id.clone(),
                        });
                    }
                } else {
                    changes.deletes.push(instance.id.clone());
                }
            }
        }
    }

    let covered: HashSet<&str> = instances.iter().map(|i| i.attribute_id.as_str()).collect();
    for link in new_links {
        if !covered.contains(link.attribute_id.as_str()) {
            changes.creates.push(AttributeValueInstance::from_link(
                product.id.clone(),
                link.attribute_id.clone(),
                new_family_id.clone(),
            ));
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, family: Option<&str>) -> Product {
        Product {
            id: id.to_string(),
            name: id.to_string(),
            product_family_id: family.map(|f| f.to_string()),
            deleted: false,
        }
    }

    fn instance(id: &str, product: &str, attribute: &str, family: Option<&str>) -> AttributeValueInstance {
        let mut inst = AttributeValueInstance::from_link(
            product.to_string(),
            attribute.to_string(),
            family.unwrap_or_default().to_string(),
        );
        inst.id = id.to_string();
        inst.product_family_id = family.map(|f| f.to_string());
        inst
    }

    fn link(family: &str, attribute: &str) -> FamilyAttributeLink {
        FamilyAttributeLink::new(family.to_string(), attribute.to_string())
    }

    #[test]
    fn family_change_retargets_deletes_and_creates() {
        let p = product("p1", Some("f1"));
        let new_links = vec![link("f2", "a1"), link("f2", "a3")];
        let instances = vec![
            instance("i1", "p1", "a1", Some("f1")),
            instance("i2", "p1", "a2", Some("f1")),
        ];
        let f2 = "f2".to_string();
        let changes = plan_family_change(&p, Some(&f2), &new_links, &instances);

        assert_eq!(changes.retargets.len(), 1);
        assert_eq!(changes.retargets[0].instance_id, "i1");
        assert_eq!(changes.retargets[0].product_family_id, "f2");
        assert_eq!(changes.deletes, vec!["i2".to_string()]);
        assert_eq!(changes.creates.len(), 1);
        assert_eq!(changes.creates[0].attribute_id, "a3");
        assert_eq!(changes.creates[0].product_family_id.as_deref(), Some("f2"));
    }

    #[test]
    fn family_change_to_none_deletes_family_owned_only() {
        let p = product("p1", Some("f1"));
        let instances = vec![
            instance("i1", "p1", "a1", Some("f1")),
            instance("i2", "p1", "a9", None), // custom
        ];
        let changes = plan_family_change(&p, None, &[], &instances);
        assert_eq!(changes.deletes, vec!["i1".to_string()]);
        assert!(changes.creates.is_empty());
        assert!(changes.retargets.is_empty());
    }

    #[test]
    fn family_change_skips_retarget_when_already_owned_by_new_family() {
        let p = product("p1", Some("f1"));
        let new_links = vec![link("f2", "a1")];
        let instances = vec![instance("i1", "p1", "a1", Some("f2"))];
        let f2 = "f2".to_string();
        let changes = plan_family_change(&p, Some(&f2), &new_links, &instances);
        assert!(changes.is_empty());
    }

    #[test]
    fn custom_instance_blocks_duplicate_create_on_family_change() {
        let p = product("p1", Some("f1"));
        let new_links = vec![link("f2", "a1")];
        let instances = vec![instance("i1", "p1", "a1", None)];
        let f2 = "f2".to_string();
        let changes = plan_family_change(&p, Some(&f2), &new_links, &instances);
        // the custom row already occupies the (product, attribute) slot
        assert!(changes.creates.is_empty());
        assert!(changes.deletes.is_empty());
    }

    #[test]
    fn product_created_gets_one_instance_per_link() {
        let p = product("p1", Some("f1"));
        let changes = plan_product_created(&p, &[link("f1", "a1"), link("f1", "a2")]);
        assert_eq!(changes.creates.len(), 2);
        let attrs: Vec<&str> = changes.creates.iter().map(|i| i.attribute_id.as_str()).collect();
        assert!(attrs.contains(&"a1") && attrs.contains(&"a2"));
        assert!(changes
            .creates
            .iter()
            .all(|i| i.product_family_id.as_deref() == Some("f1") && i.value.is_none()));
        // every inserted instance gets a distinct identifier
        assert_ne!(changes.creates[0].id, changes.creates[1].id);
    }

    #[test]
    fn link_activated_retargets_stale_owner() {
        let f2 = "f2".to_string();
        let a1 = "a1".to_string();
        let pairs = vec![
            (product("p1", Some("f2")), Some(instance("i1", "p1", "a1", Some("f1")))),
            (product("p2", Some("f2")), None),
        ];
        let changes = plan_link_activated(&f2, &a1, &pairs);
        assert_eq!(changes.retargets.len(), 1);
        assert_eq!(changes.retargets[0].instance_id, "i1");
        assert_eq!(changes.creates.len(), 1);
        assert_eq!(changes.creates[0].product_id, "p2");
        assert_eq!(changes.creates[0].attribute_id, "a1");
    }

    #[test]
    fn link_activated_leaves_custom_instances_alone() {
        let f1 = "f1".to_string();
        let a1 = "a1".to_string();
        let pairs = vec![(product("p1", Some("f1")), Some(instance("i1", "p1", "a1", None)))];
        let changes = plan_link_activated(&f1, &a1, &pairs);
        assert!(changes.is_empty());
    }
}
