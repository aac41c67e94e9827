use crate::model::{CatalogError, CatalogResult, Id};
use crate::store::traits::Store;

/// Dense zero-based ranks for an explicit ordering: position in the
/// supplied list becomes the rank, regardless of prior ranks.
pub fn ranks_for(ids: &[Id]) -> Vec<(Id, i64)> {
    ids.iter()
        .enumerate()
        .map(|(position, id)| (id.clone(), position as i64))
        .collect()
}

pub struct Resequencer;

impl Resequencer {
    /// Re-sequence the display order of attributes within one group: the
    /// supplied order becomes the ranks `0..n-1`, written atomically.
    pub async fn update_attribute_order<S: Store>(
        store: &S,
        group_id: &Id,
        ordered_ids: &[Id],
    ) -> CatalogResult<()> {
        if ordered_ids.is_empty() {
            return Err(CatalogError::InvalidRequest(
                "attribute ids are required".to_string(),
            ));
        }
        for id in ordered_ids {
            let attribute = store
                .get_attribute(id)
                .await?
                .filter(|a| !a.deleted)
                .ok_or_else(|| CatalogError::NotFound(format!("attribute {}", id)))?;
            if attribute.attribute_group_id.as_ref() != Some(group_id) {
                return Err(CatalogError::InvalidRequest(format!(
                    "attribute {} does not belong to group {}",
                    id, group_id
                )));
            }
        }
        store.set_attribute_sort_orders(&ranks_for(ordered_ids)).await?;
        Ok(())
    }
}
