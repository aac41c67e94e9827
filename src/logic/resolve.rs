use crate::logic::access::{AccessChecker, Action, EventSink};
use crate::logic::coercion::ValueCodec;
use crate::model::{
    Attribute, AttributeValueInstance, CatalogError, CatalogResult, ChangeUnit,
    ChannelAttributeRecord, ChannelAttributes, FamilyAttributeLink, Id, InstanceChangeSet,
    LocaleSettings, ResolvedAttribute, NO_GROUP_ID, NO_GROUP_NAME, NO_GROUP_ORDER,
};
use crate::store::traits::Store;
use chrono::Utc;
use itertools::Itertools;
use serde_json::Value;

/// Read/write layer over attribute value instances and channel overrides:
/// decodes raw rows into typed, locale-expanded records and encodes update
/// payloads back into raw storage writes.
pub struct Resolver;

impl Resolver {
    /// All attribute records of a product, fully typed, ordered by group
    /// order, then sort order, then attribute id.
    pub async fn resolve_attributes<S: Store>(
        store: &S,
        acl: &dyn AccessChecker,
        locales: &LocaleSettings,
        actor_id: &str,
        product_id: &Id,
    ) -> CatalogResult<Vec<ResolvedAttribute>> {
        if !acl.can_access(actor_id, "ProductAttributeValue", Action::Read) {
            return Err(CatalogError::Forbidden(
                "no rights to read attribute values".to_string(),
            ));
        }
        store
            .get_product(product_id)
            .await?
            .filter(|p| !p.deleted)
            .ok_or_else(|| CatalogError::NotFound(format!("product {}", product_id)))?;

        let mut records = Vec::new();
        for instance in store.list_instances_for_product(product_id).await? {
            let Some(attribute) = store.get_attribute(&instance.attribute_id).await? else {
                continue;
            };
            let link = match &instance.product_family_id {
                Some(family_id) => store.get_link(family_id, &instance.attribute_id).await?,
                None => None,
            };
            records.push(build_record(&instance, &attribute, link.as_ref(), locales));
        }

        Ok(records
            .into_iter()
            .sorted_by(|a, b| {
                (a.attribute_group_order, a.sort_order, &a.attribute_id).cmp(&(
                    b.attribute_group_order,
                    b.sort_order,
                    &b.attribute_id,
                ))
            })
            .collect())
    }

    /// Channel-scoped records grouped per channel. Channels are returned
    /// even when they hold no overriding values yet; falling back to the
    /// base value for unset overrides is the consumer's job.
    pub async fn resolve_channel_attributes<S: Store>(
        store: &S,
        acl: &dyn AccessChecker,
        locales: &LocaleSettings,
        actor_id: &str,
        product_id: &Id,
    ) -> CatalogResult<Vec<ChannelAttributes>> {
        if !acl.can_access(actor_id, "ChannelProductAttributeValue", Action::Read) {
            return Err(CatalogError::Forbidden(
                "no rights to read channel attribute values".to_string(),
            ));
        }
        let product = store
            .get_product(product_id)
            .await?
            .filter(|p| !p.deleted)
            .ok_or_else(|| CatalogError::NotFound(format!("product {}", product_id)))?;

        let mut groups: Vec<ChannelAttributes> = store
            .list_channels()
            .await?
            .into_iter()
            .map(|channel| ChannelAttributes {
                channel_id: channel.id,
                channel_name: channel.name,
                locales: channel.locales,
                attributes: Vec::new(),
            })
            .collect();

        for row in store.list_channel_values_for_product(product_id).await? {
            let Some(attribute) = store.get_attribute(&row.attribute_id).await? else {
                continue;
            };
            let link = match &product.product_family_id {
                Some(family_id) => store.get_link(family_id, &row.attribute_id).await?,
                None => None,
            };
            let link = link.filter(|l| !l.deleted);
            let codec = ValueCodec::for_type(attribute.attribute_type);

            let mut locale_fields = serde_json::Map::new();
            for code in locales.active_locales() {
                let suffix = crate::model::locale_suffix(code);
                locale_fields.insert(
                    format!("attributeValue{}", suffix),
                    codec.decode_locale(row.locale_values.get(code).map(|v| v.as_str())),
                );
                locale_fields.insert(
                    format!("attributeTypeValue{}", suffix),
                    attribute
                        .locale_type_values
                        .get(code)
                        .map(|options| Value::from(options.clone()))
                        .unwrap_or(Value::Null),
                );
            }

            let record = ChannelAttributeRecord {
                channel_product_attribute_value_id: row.id.clone(),
                product_id: row.product_id.clone(),
                attribute_id: row.attribute_id.clone(),
                attribute_name: attribute.name.clone(),
                attribute_type: attribute.attribute_type,
                attribute_is_required: link.as_ref().map(|l| l.is_required).unwrap_or(false),
                attribute_is_multi_channel: link
                    .as_ref()
                    .map(|l| l.is_multi_channel)
                    .unwrap_or(false),
                attribute_group_id: attribute
                    .attribute_group_id
                    .clone()
                    .unwrap_or_else(|| NO_GROUP_ID.to_string()),
                attribute_group_name: attribute
                    .attribute_group_name
                    .clone()
                    .unwrap_or_else(|| NO_GROUP_NAME.to_string()),
                attribute_group_order: attribute.attribute_group_order.unwrap_or(NO_GROUP_ORDER),
                attribute_value: codec.decode(row.value.as_deref()),
                attribute_type_value: attribute.type_value.clone(),
                locale_fields,
            };
            if let Some(group) = groups.iter_mut().find(|g| g.channel_id == row.channel_id) {
                group.attributes.push(record);
            }
        }
        Ok(groups)
    }

    /// Encode an update payload back into raw instance writes. One call may
    /// touch many attributes of one product; all writes land in a single
    /// unit so a failure partway through leaves nothing half-updated. Every
    /// row must carry an `attributeId` or the whole request is rejected
    /// before any write. After the unit commits, one notification per
    /// attribute is emitted carrying the post-update value and the
    /// originating payload only.
    pub async fn update_attributes<S: Store>(
        store: &S,
        acl: &dyn AccessChecker,
        events: &dyn EventSink,
        locales: &LocaleSettings,
        actor_id: &str,
        product_id: &Id,
        updates: Vec<serde_json::Map<String, Value>>,
    ) -> CatalogResult<()> {
        if !acl.can_access(actor_id, "ProductAttributeValue", Action::Edit) {
            return Err(CatalogError::Forbidden(
                "no rights to edit attribute values".to_string(),
            ));
        }
        store
            .get_product(product_id)
            .await?
            .filter(|p| !p.deleted)
            .ok_or_else(|| CatalogError::NotFound(format!("product {}", product_id)))?;

        // reject malformed rows before any write
        for row in &updates {
            if row.get("attributeId").and_then(Value::as_str).is_none() {
                return Err(CatalogError::InvalidRequest(
                    "wrong attribute id".to_string(),
                ));
            }
        }

        let variants = locales.expand("value");
        let mut changes = InstanceChangeSet::default();
        let mut notifications = Vec::new();

        for row in &updates {
            let Some(attribute_id) = row.get("attributeId").and_then(Value::as_str) else {
                continue;
            };
            let attribute_id = attribute_id.to_string();
            let mut instance = store
                .get_instance(product_id, &attribute_id)
                .await?
                .ok_or_else(|| {
                    CatalogError::NotFound(format!(
                        "attribute value for product {} attribute {}",
                        product_id, attribute_id
                    ))
                })?;
            let codec = match store.get_attribute(&attribute_id).await? {
                Some(attribute) => ValueCodec::for_type(attribute.attribute_type),
                None => ValueCodec::for_type(crate::model::AttributeType::Unknown),
            };

            for (field, value) in row {
                if field == "attributeId" {
                    continue;
                }
                if let Some(variant) = variants.iter().find(|v| &v.field == field) {
                    let raw = codec.encode(value);
                    match &variant.locale {
                        None => instance.value = raw,
                        Some(code) => match raw {
                            Some(raw) => {
                                instance.locale_values.insert(code.clone(), raw);
                            }
                            None => {
                                instance.locale_values.remove(code);
                            }
                        },
                    }
                } else {
                    // any other field is auxiliary instance metadata;
                    // objects and arrays are stored JSON-encoded
                    let stored = match value {
                        Value::Array(_) | Value::Object(_) => {
                            Value::String(serde_json::to_string(value).unwrap_or_default())
                        }
                        other => other.clone(),
                    };
                    instance.data.insert(field.clone(), stored);
                }
            }
            instance.updated_at = Utc::now();

            notifications.push(serde_json::json!({
                "productId": product_id,
                "attributeId": attribute_id,
                "value": instance.value,
                "post": Value::Object(row.clone()),
            }));
            changes.updates.push(instance);
        }

        store
            .apply_change_unit(ChangeUnit::for_instances(changes))
            .await?;

        for payload in notifications {
            events.notify("product.attribute.updated", payload);
        }
        Ok(())
    }
}

/// Build one typed output record from a raw instance row.
fn build_record(
    instance: &AttributeValueInstance,
    attribute: &Attribute,
    link: Option<&FamilyAttributeLink>,
    locales: &LocaleSettings,
) -> ResolvedAttribute {
    let codec = ValueCodec::for_type(attribute.attribute_type);
    let link = link.filter(|l| !l.deleted);
    let ty = attribute.attribute_type;

    let type_value = if ty.base() == crate::model::AttributeType::Enum {
        Some(attribute.type_value.clone().unwrap_or_default())
    } else if ty.is_enumerated() {
        attribute.type_value.clone()
    } else {
        None
    };

    let mut locale_fields = serde_json::Map::new();
    if locales.is_multilang_active {
        for code in locales.active_locales() {
            let suffix = crate::model::locale_suffix(code);
            locale_fields.insert(
                format!("value{}", suffix),
                codec.decode_locale(instance.locale_values.get(code).map(|v| v.as_str())),
            );
            locale_fields.insert(
                format!("typeValue{}", suffix),
                attribute
                    .locale_type_values
                    .get(code)
                    .map(|options| Value::from(options.clone()))
                    .unwrap_or(Value::Null),
            );
            locale_fields.insert(
                format!("name{}", suffix),
                attribute
                    .locale_names
                    .get(code)
                    .map(|n| Value::String(n.clone()))
                    .unwrap_or(Value::Null),
            );
        }
    }

    ResolvedAttribute {
        product_attribute_value_id: instance.id.clone(),
        attribute_id: instance.attribute_id.clone(),
        name: attribute.name.clone(),
        // with locale support off, multilingual types surface as their base
        attribute_type: if locales.is_multilang_active {
            ty
        } else {
            ty.base()
        },
        is_required: link.map(|l| l.is_required).unwrap_or(false),
        is_custom: instance.is_custom(),
        attribute_group_id: attribute
            .attribute_group_id
            .clone()
            .unwrap_or_else(|| NO_GROUP_ID.to_string()),
        attribute_group_name: attribute
            .attribute_group_name
            .clone()
            .unwrap_or_else(|| NO_GROUP_NAME.to_string()),
        attribute_group_order: attribute.attribute_group_order.unwrap_or(NO_GROUP_ORDER),
        sort_order: attribute.sort_order,
        value: codec.decode(instance.value.as_deref()),
        type_value,
        data: instance.data.clone(),
        locale_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeType;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn attribute(id: &str, ty: AttributeType) -> Attribute {
        Attribute {
            id: id.to_string(),
            name: id.to_string(),
            attribute_type: ty,
            sort_order: 0,
            attribute_group_id: None,
            attribute_group_name: None,
            attribute_group_order: None,
            type_value: None,
            locale_type_values: BTreeMap::new(),
            locale_names: BTreeMap::new(),
            deleted: false,
        }
    }

    fn instance(attribute_id: &str, value: Option<&str>) -> AttributeValueInstance {
        let mut inst = AttributeValueInstance::from_link(
            "p1".to_string(),
            attribute_id.to_string(),
            "f1".to_string(),
        );
        inst.value = value.map(|v| v.to_string());
        inst
    }

    #[test]
    fn record_uses_group_fallback() {
        let attr = attribute("a1", AttributeType::Int);
        let inst = instance("a1", Some("7"));
        let record = build_record(&inst, &attr, None, &LocaleSettings::default());
        assert_eq!(record.attribute_group_id, NO_GROUP_ID);
        assert_eq!(record.attribute_group_name, NO_GROUP_NAME);
        assert_eq!(record.attribute_group_order, NO_GROUP_ORDER);
        assert_eq!(record.value, json!(7));
    }

    #[test]
    fn record_marks_custom_instances() {
        let attr = attribute("a1", AttributeType::String);
        let mut inst = instance("a1", None);
        inst.product_family_id = None;
        let record = build_record(&inst, &attr, None, &LocaleSettings::default());
        assert!(record.is_custom);
        assert!(!record.is_required);
    }

    #[test]
    fn required_flag_comes_from_the_link() {
        let attr = attribute("a1", AttributeType::String);
        let inst = instance("a1", None);
        let mut link = FamilyAttributeLink::new("f1".to_string(), "a1".to_string());
        link.is_required = true;
        let record = build_record(&inst, &attr, Some(&link), &LocaleSettings::default());
        assert!(record.is_required);

        // a soft-deleted link no longer marks the attribute required
        link.deleted = true;
        let record = build_record(&inst, &attr, Some(&link), &LocaleSettings::default());
        assert!(!record.is_required);
    }

    #[test]
    fn enum_type_value_defaults_to_empty_list() {
        let attr = attribute("a1", AttributeType::Enum);
        let inst = instance("a1", Some("red"));
        let record = build_record(&inst, &attr, None, &LocaleSettings::default());
        assert_eq!(record.type_value, Some(vec![]));
        assert_eq!(record.value, json!("red"));
    }

    #[test]
    fn locale_fields_are_expanded_when_multilang_active() {
        let mut attr = attribute("a1", AttributeType::ArrayMultiLang);
        attr.locale_type_values
            .insert("de_DE".to_string(), vec!["x".to_string()]);
        let mut inst = instance("a1", Some("[\"a\"]"));
        inst.locale_values
            .insert("de_DE".to_string(), "[\"b\"]".to_string());

        let locales = LocaleSettings::new(&["de_DE"]);
        let record = build_record(&inst, &attr, None, &locales);
        assert_eq!(record.locale_fields["valueDeDe"], json!(["b"]));
        assert_eq!(record.locale_fields["typeValueDeDe"], json!(["x"]));
        assert_eq!(record.value, json!(["a"]));
    }

    #[tokio::test]
    async fn updates_notify_with_post_state_only() {
        use crate::logic::access::testing::RecordingSink;
        use crate::logic::{AllowAll, Propagator};
        use crate::model::{LinkOptions, Product, ProductFamily};
        use crate::store::traits::{AttributeStore, FamilyStore};
        use crate::store::MemoryStore;

        let store = MemoryStore::new();
        store.upsert_attribute(attribute("a1", AttributeType::Int)).await.unwrap();
        store
            .upsert_family(ProductFamily {
                id: "f1".to_string(),
                name: "f1".to_string(),
                deleted: false,
            })
            .await
            .unwrap();
        Propagator::apply_family_link(
            &store,
            &"f1".to_string(),
            &"a1".to_string(),
            true,
            LinkOptions::default(),
        )
        .await
        .unwrap();
        Propagator::on_product_created(
            &store,
            Product {
                id: "p1".to_string(),
                name: "p1".to_string(),
                product_family_id: Some("f1".to_string()),
                deleted: false,
            },
        )
        .await
        .unwrap();

        let sink = RecordingSink::default();
        let row = json!({ "attributeId": "a1", "value": 5 })
            .as_object()
            .cloned()
            .unwrap();
        Resolver::update_attributes(
            &store,
            &AllowAll,
            &sink,
            &LocaleSettings::default(),
            "system",
            &"p1".to_string(),
            vec![row],
        )
        .await
        .unwrap();

        let events = sink.events.lock();
        assert_eq!(events.len(), 1);
        let (topic, payload) = &events[0];
        assert_eq!(topic, "product.attribute.updated");
        assert_eq!(payload["attributeId"], json!("a1"));
        assert_eq!(payload["value"], json!("5"));
        // listeners never see the prior value
        assert!(payload.get("previous").is_none());
    }

    #[test]
    fn multilang_type_downgrades_when_locale_support_disabled() {
        let attr = attribute("a1", AttributeType::MultiEnumMultiLang);
        let inst = instance("a1", None);
        let record = build_record(&inst, &attr, None, &LocaleSettings::default());
        assert_eq!(record.attribute_type, AttributeType::MultiEnum);
        assert!(record.locale_fields.is_empty());
        assert_eq!(record.value, json!([]));
    }
}
