use crate::logic::Propagator;
use crate::model::{
    Association, Attribute, AttributeType, Channel, Id, LinkOptions, Product, ProductFamily,
};
use crate::store::traits::Store;
use anyhow::Result;
use std::collections::BTreeMap;

fn attribute(
    id: &str,
    name: &str,
    ty: AttributeType,
    sort_order: i64,
    group: Option<(&str, &str, i64)>,
    type_value: Option<Vec<&str>>,
) -> Attribute {
    Attribute {
        id: id.to_string(),
        name: name.to_string(),
        attribute_type: ty,
        sort_order,
        attribute_group_id: group.map(|(id, _, _)| id.to_string()),
        attribute_group_name: group.map(|(_, name, _)| name.to_string()),
        attribute_group_order: group.map(|(_, _, order)| order),
        type_value: type_value.map(|v| v.iter().map(|s| s.to_string()).collect()),
        locale_type_values: BTreeMap::new(),
        locale_names: BTreeMap::new(),
        deleted: false,
    }
}

fn product(id: &str, name: &str, family_id: Option<&Id>) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        product_family_id: family_id.cloned(),
        deleted: false,
    }
}

/// Load a small demo catalog: one family of apparel attributes, a couple
/// of products with materialized values, a web channel and a symmetric
/// "similar products" association.
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    let general = ("group_general", "General", 10);
    let logistics = ("group_logistics", "Logistics", 20);

    store
        .upsert_attribute(attribute(
            "attr_color",
            "Color",
            AttributeType::Enum,
            10,
            Some(general),
            Some(vec!["Red", "Green", "Blue"]),
        ))
        .await?;
    store
        .upsert_attribute(attribute(
            "attr_material",
            "Material",
            AttributeType::String,
            20,
            Some(general),
            None,
        ))
        .await?;
    store
        .upsert_attribute(attribute(
            "attr_weight",
            "Weight",
            AttributeType::Float,
            10,
            Some(logistics),
            None,
        ))
        .await?;
    store
        .upsert_attribute(attribute(
            "attr_fragile",
            "Fragile",
            AttributeType::Bool,
            20,
            Some(logistics),
            None,
        ))
        .await?;

    store
        .upsert_family(ProductFamily {
            id: "family_apparel".to_string(),
            name: "Apparel".to_string(),
            deleted: false,
        })
        .await?;

    let family_id: Id = "family_apparel".to_string();
    for (attribute_id, required) in [
        ("attr_color", true),
        ("attr_material", false),
        ("attr_weight", false),
    ] {
        Propagator::apply_family_link(
            store,
            &family_id,
            &attribute_id.to_string(),
            true,
            LinkOptions {
                is_required: required,
                is_multi_channel: false,
            },
        )
        .await?;
    }

    Propagator::on_product_created(store, product("prod_tshirt", "T-Shirt", Some(&family_id)))
        .await?;
    Propagator::on_product_created(store, product("prod_hoodie", "Hoodie", Some(&family_id)))
        .await?;
    Propagator::on_product_created(store, product("prod_mug", "Mug", None)).await?;

    store
        .upsert_channel(Channel {
            id: "channel_web".to_string(),
            name: "Web Shop".to_string(),
            locales: vec!["de_DE".to_string()],
            deleted: false,
        })
        .await?;

    // symmetric association pointing at itself
    store
        .upsert_association(Association {
            id: "assoc_similar".to_string(),
            name: "Similar products".to_string(),
            backward_association_id: Some("assoc_similar".to_string()),
            deleted: false,
        })
        .await?;

    Ok(())
}
