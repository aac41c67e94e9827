use crate::logic::access::{AccessChecker, Action};
use crate::model::{
    AssociatedProduct, AssociationChangeSet, CatalogError, CatalogResult, Id,
};
use crate::store::traits::Store;
use itertools::Itertools;
use std::collections::HashSet;

/// Maintains the symmetric pair of directed association rows for
/// bidirectional association types: forward and backward rows are one
/// logical edge, created and deleted together.
pub struct AssociationManager;

impl AssociationManager {
    /// Create a forward row for every (main, related) pair not already
    /// present under the association, plus the mirrored backward row when
    /// the association is bidirectional. Re-adding an existing pair is a
    /// no-op. Returns the number of edges created.
    pub async fn add_associated_products<S: Store>(
        store: &S,
        acl: &dyn AccessChecker,
        actor_id: &str,
        association_id: &Id,
        main_ids: &[Id],
        related_ids: &[Id],
    ) -> CatalogResult<usize> {
        if !acl.can_access(actor_id, "AssociatedProduct", Action::Edit) {
            return Err(CatalogError::Forbidden(
                "no rights to edit associated products".to_string(),
            ));
        }
        if main_ids.is_empty() || related_ids.is_empty() {
            return Err(CatalogError::InvalidRequest(
                "main and related product ids are required".to_string(),
            ));
        }
        let association = store
            .get_association(association_id)
            .await?
            .filter(|a| !a.deleted)
            .ok_or_else(|| CatalogError::NotFound(format!("association {}", association_id)))?;

        // existence check over the full (association, main, related) triple
        let existing: HashSet<(Id, Id)> = store
            .list_associated_products(association_id, Some(main_ids), Some(related_ids))
            .await?
            .into_iter()
            .map(|row| (row.main_product_id, row.related_product_id))
            .collect();

        let mut changes = AssociationChangeSet::default();
        let mut created = 0;
        for (main_id, related_id) in main_ids.iter().cartesian_product(related_ids.iter()) {
            if existing.contains(&(main_id.clone(), related_id.clone())) {
                continue;
            }
            let mut forward = AssociatedProduct::new(
                association_id.clone(),
                main_id.clone(),
                related_id.clone(),
            );
            if let Some(backward_id) = &association.backward_association_id {
                forward.backward_association_id = Some(backward_id.clone());
                changes.creates.push(AssociatedProduct::new(
                    backward_id.clone(),
                    related_id.clone(),
                    main_id.clone(),
                ));
            }
            changes.creates.push(forward);
            created += 1;
        }

        if !changes.is_empty() {
            store.apply_association_changes(changes).await?;
        }
        Ok(created)
    }

    /// Delete every forward row matching the M x R pairs, and for each, its
    /// exact backward mirror. Returns the number of forward rows removed.
    pub async fn remove_associated_products<S: Store>(
        store: &S,
        acl: &dyn AccessChecker,
        actor_id: &str,
        association_id: &Id,
        main_ids: &[Id],
        related_ids: &[Id],
    ) -> CatalogResult<usize> {
        if !acl.can_access(actor_id, "AssociatedProduct", Action::Delete) {
            return Err(CatalogError::Forbidden(
                "no rights to delete associated products".to_string(),
            ));
        }
        if main_ids.is_empty() || related_ids.is_empty() {
            return Err(CatalogError::InvalidRequest(
                "main and related product ids are required".to_string(),
            ));
        }
        store
            .get_association(association_id)
            .await?
            .filter(|a| !a.deleted)
            .ok_or_else(|| CatalogError::NotFound(format!("association {}", association_id)))?;

        let forwards = store
            .list_associated_products(association_id, Some(main_ids), Some(related_ids))
            .await?;

        let mut changes = AssociationChangeSet::default();
        let mut removed = 0;
        for forward in &forwards {
            if let Some(backward_id) = &forward.backward_association_id {
                let main = std::slice::from_ref(&forward.related_product_id);
                let related = std::slice::from_ref(&forward.main_product_id);
                for mirror in store
                    .list_associated_products(backward_id, Some(main), Some(related))
                    .await?
                {
                    changes.deletes.push(mirror.id);
                }
            }
            changes.deletes.push(forward.id.clone());
            removed += 1;
        }

        if !changes.is_empty() {
            store.apply_association_changes(changes).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::access::testing::Deny;
    use crate::logic::AllowAll;
    use crate::model::Association;
    use crate::store::traits::AssociationStore;
    use crate::store::MemoryStore;

    async fn bidirectional_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .upsert_association(Association {
                id: "fwd".to_string(),
                name: "Related".to_string(),
                backward_association_id: Some("bwd".to_string()),
                deleted: false,
            })
            .await
            .unwrap();
        store
            .upsert_association(Association {
                id: "bwd".to_string(),
                name: "Related (back)".to_string(),
                backward_association_id: None,
                deleted: false,
            })
            .await
            .unwrap();
        store
    }

    fn ids(values: &[&str]) -> Vec<Id> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn adding_creates_forward_and_mirror_rows() {
        let store = bidirectional_store().await;
        let created = AssociationManager::add_associated_products(
            &store,
            &AllowAll,
            "system",
            &"fwd".to_string(),
            &ids(&["m1", "m2"]),
            &ids(&["r1"]),
        )
        .await
        .unwrap();
        assert_eq!(created, 2);

        let forwards = store
            .list_associated_products(&"fwd".to_string(), None, None)
            .await
            .unwrap();
        assert_eq!(forwards.len(), 2);
        assert!(forwards
            .iter()
            .all(|row| row.backward_association_id.as_deref() == Some("bwd")));

        let mirrors = store
            .list_associated_products(&"bwd".to_string(), None, None)
            .await
            .unwrap();
        assert_eq!(mirrors.len(), 2);
        assert!(mirrors
            .iter()
            .all(|row| row.main_product_id == "r1" && row.backward_association_id.is_none()));
    }

    #[tokio::test]
    async fn re_adding_an_existing_pair_is_a_no_op() {
        let store = bidirectional_store().await;
        let fwd = "fwd".to_string();
        let main = ids(&["m1"]);
        let related = ids(&["r1"]);
        AssociationManager::add_associated_products(&store, &AllowAll, "system", &fwd, &main, &related)
            .await
            .unwrap();
        let created =
            AssociationManager::add_associated_products(&store, &AllowAll, "system", &fwd, &main, &related)
                .await
                .unwrap();
        assert_eq!(created, 0);
        assert_eq!(
            store
                .list_associated_products(&"bwd".to_string(), None, None)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn removing_deletes_the_mirror_with_the_forward_row() {
        let store = bidirectional_store().await;
        let fwd = "fwd".to_string();
        let main = ids(&["m1"]);
        let related = ids(&["r1"]);
        AssociationManager::add_associated_products(&store, &AllowAll, "system", &fwd, &main, &related)
            .await
            .unwrap();

        let removed =
            AssociationManager::remove_associated_products(&store, &AllowAll, "system", &fwd, &main, &related)
                .await
                .unwrap();
        assert_eq!(removed, 1);
        assert!(store
            .list_associated_products(&fwd, None, None)
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .list_associated_products(&"bwd".to_string(), None, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn empty_id_lists_are_rejected() {
        let store = bidirectional_store().await;
        let result = AssociationManager::add_associated_products(
            &store,
            &AllowAll,
            "system",
            &"fwd".to_string(),
            &[],
            &ids(&["r1"]),
        )
        .await;
        assert!(matches!(result, Err(CatalogError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn denied_actor_cannot_edit_edges() {
        let store = bidirectional_store().await;
        let result = AssociationManager::add_associated_products(
            &store,
            &Deny("AssociatedProduct"),
            "intruder",
            &"fwd".to_string(),
            &ids(&["m1"]),
            &ids(&["r1"]),
        )
        .await;
        assert!(matches!(result, Err(CatalogError::Forbidden(_))));
    }
}
