use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::collections::BTreeMap;

use crate::model::{
    AssociatedProduct, Association, AssociationChangeSet, Attribute, AttributeType,
    AttributeValueInstance, ChangeUnit, Channel, ChannelAttributeValue, FamilyAttributeLink, Id,
    Product, ProductFamily,
};
use crate::store::traits::{
    AssociationStore, AttributeStore, ChannelStore, FamilyStore, InstanceStore, ProductStore,
    Store,
};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

// DDL is executed at startup so the binary never needs compile-time
// database access. All statements are idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS attribute (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        sort_order BIGINT NOT NULL DEFAULT 0,
        attribute_group_id TEXT,
        attribute_group_name TEXT,
        attribute_group_order BIGINT,
        type_value JSONB,
        locale_type_values JSONB NOT NULL DEFAULT '{}',
        locale_names JSONB NOT NULL DEFAULT '{}',
        deleted BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_family (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        deleted BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_family_attribute (
        id TEXT PRIMARY KEY,
        product_family_id TEXT NOT NULL,
        attribute_id TEXT NOT NULL,
        is_required BOOLEAN NOT NULL DEFAULT FALSE,
        is_multi_channel BOOLEAN NOT NULL DEFAULT FALSE,
        deleted BOOLEAN NOT NULL DEFAULT FALSE,
        UNIQUE (product_family_id, attribute_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        product_family_id TEXT,
        deleted BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_attribute_value (
        id TEXT PRIMARY KEY,
        product_id TEXT NOT NULL,
        attribute_id TEXT NOT NULL,
        product_family_id TEXT,
        value TEXT,
        locale_values JSONB NOT NULL DEFAULT '{}',
        data JSONB NOT NULL DEFAULT '{}',
        deleted BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS uq_product_attribute_value_active
        ON product_attribute_value (product_id, attribute_id)
        WHERE NOT deleted
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS channel (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        locales JSONB NOT NULL DEFAULT '[]',
        deleted BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS channel_product_attribute_value (
        id TEXT PRIMARY KEY,
        product_id TEXT NOT NULL,
        channel_id TEXT NOT NULL,
        attribute_id TEXT NOT NULL,
        value TEXT,
        locale_values JSONB NOT NULL DEFAULT '{}',
        deleted BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS uq_channel_product_attribute_value_active
        ON channel_product_attribute_value (product_id, channel_id, attribute_id)
        WHERE NOT deleted
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS association (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        backward_association_id TEXT,
        deleted BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS associated_product (
        id TEXT PRIMARY KEY,
        association_id TEXT NOT NULL,
        main_product_id TEXT NOT NULL,
        related_product_id TEXT NOT NULL,
        backward_association_id TEXT,
        deleted BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
];

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the schema if it does not exist yet
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to run schema migration")?;
        }
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn type_to_db(ty: &AttributeType) -> String {
    match serde_json::to_value(ty) {
        Ok(serde_json::Value::String(s)) => s,
        _ => "unknown".to_string(),
    }
}

fn type_from_db(raw: &str) -> AttributeType {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .unwrap_or(AttributeType::Unknown)
}

fn json_column<T: serde::de::DeserializeOwned>(
    row: &sqlx::postgres::PgRow,
    column: &str,
) -> Result<T> {
    let value: serde_json::Value = row.try_get(column)?;
    serde_json::from_value(value).with_context(|| format!("Malformed {} column", column))
}

fn attribute_from_row(row: &sqlx::postgres::PgRow) -> Result<Attribute> {
    let raw_type: String = row.try_get("type")?;
    let type_value: Option<serde_json::Value> = row.try_get("type_value")?;
    let type_value = match type_value {
        Some(value) => serde_json::from_value(value).context("Malformed type_value column")?,
        None => None,
    };
    Ok(Attribute {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        attribute_type: type_from_db(&raw_type),
        sort_order: row.try_get("sort_order")?,
        attribute_group_id: row.try_get("attribute_group_id")?,
        attribute_group_name: row.try_get("attribute_group_name")?,
        attribute_group_order: row.try_get("attribute_group_order")?,
        type_value,
        locale_type_values: json_column::<BTreeMap<String, Vec<String>>>(
            row,
            "locale_type_values",
        )?,
        locale_names: json_column::<BTreeMap<String, String>>(row, "locale_names")?,
        deleted: row.try_get("deleted")?,
    })
}

fn link_from_row(row: &sqlx::postgres::PgRow) -> Result<FamilyAttributeLink> {
    Ok(FamilyAttributeLink {
        id: row.try_get("id")?,
        product_family_id: row.try_get("product_family_id")?,
        attribute_id: row.try_get("attribute_id")?,
        is_required: row.try_get("is_required")?,
        is_multi_channel: row.try_get("is_multi_channel")?,
        deleted: row.try_get("deleted")?,
    })
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        product_family_id: row.try_get("product_family_id")?,
        deleted: row.try_get("deleted")?,
    })
}

fn instance_from_row(row: &sqlx::postgres::PgRow) -> Result<AttributeValueInstance> {
    Ok(AttributeValueInstance {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        attribute_id: row.try_get("attribute_id")?,
        product_family_id: row.try_get("product_family_id")?,
        value: row.try_get("value")?,
        locale_values: json_column::<BTreeMap<String, String>>(row, "locale_values")?,
        data: json_column::<serde_json::Map<String, serde_json::Value>>(row, "data")?,
        deleted: row.try_get("deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn channel_value_from_row(row: &sqlx::postgres::PgRow) -> Result<ChannelAttributeValue> {
    Ok(ChannelAttributeValue {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        channel_id: row.try_get("channel_id")?,
        attribute_id: row.try_get("attribute_id")?,
        value: row.try_get("value")?,
        locale_values: json_column::<BTreeMap<String, String>>(row, "locale_values")?,
        deleted: row.try_get("deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn associated_product_from_row(row: &sqlx::postgres::PgRow) -> Result<AssociatedProduct> {
    Ok(AssociatedProduct {
        id: row.try_get("id")?,
        association_id: row.try_get("association_id")?,
        main_product_id: row.try_get("main_product_id")?,
        related_product_id: row.try_get("related_product_id")?,
        backward_association_id: row.try_get("backward_association_id")?,
        deleted: row.try_get("deleted")?,
    })
}

async fn upsert_instance<'e, E>(executor: E, instance: &AttributeValueInstance) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO product_attribute_value
            (id, product_id, attribute_id, product_family_id, value, locale_values, data,
             deleted, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (id) DO UPDATE SET
            product_family_id = EXCLUDED.product_family_id,
            value = EXCLUDED.value,
            locale_values = EXCLUDED.locale_values,
            data = EXCLUDED.data,
            deleted = EXCLUDED.deleted,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&instance.id)
    .bind(&instance.product_id)
    .bind(&instance.attribute_id)
    .bind(&instance.product_family_id)
    .bind(&instance.value)
    .bind(serde_json::to_value(&instance.locale_values)?)
    .bind(serde_json::Value::Object(instance.data.clone()))
    .bind(instance.deleted)
    .bind(instance.created_at)
    .bind(instance.updated_at)
    .execute(executor)
    .await
    .context("Failed to upsert attribute value")?;
    Ok(())
}

#[async_trait::async_trait]
impl AttributeStore for PostgresStore {
    async fn get_attribute(&self, id: &Id) -> Result<Option<Attribute>> {
        let row = sqlx::query("SELECT * FROM attribute WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch attribute")?;

        row.as_ref().map(attribute_from_row).transpose()
    }

    async fn list_attributes(&self) -> Result<Vec<Attribute>> {
        let rows = sqlx::query("SELECT * FROM attribute WHERE NOT deleted ORDER BY sort_order, id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list attributes")?;

        rows.iter().map(attribute_from_row).collect()
    }

    async fn upsert_attribute(&self, attribute: Attribute) -> Result<()> {
        let type_value = attribute
            .type_value
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        sqlx::query(
            r#"
            INSERT INTO attribute
                (id, name, type, sort_order, attribute_group_id, attribute_group_name,
                 attribute_group_order, type_value, locale_type_values, locale_names, deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                type = EXCLUDED.type,
                sort_order = EXCLUDED.sort_order,
                attribute_group_id = EXCLUDED.attribute_group_id,
                attribute_group_name = EXCLUDED.attribute_group_name,
                attribute_group_order = EXCLUDED.attribute_group_order,
                type_value = EXCLUDED.type_value,
                locale_type_values = EXCLUDED.locale_type_values,
                locale_names = EXCLUDED.locale_names,
                deleted = EXCLUDED.deleted
            "#,
        )
        .bind(&attribute.id)
        .bind(&attribute.name)
        .bind(type_to_db(&attribute.attribute_type))
        .bind(attribute.sort_order)
        .bind(&attribute.attribute_group_id)
        .bind(&attribute.attribute_group_name)
        .bind(attribute.attribute_group_order)
        .bind(type_value)
        .bind(serde_json::to_value(&attribute.locale_type_values)?)
        .bind(serde_json::to_value(&attribute.locale_names)?)
        .bind(attribute.deleted)
        .execute(&self.pool)
        .await
        .context("Failed to upsert attribute")?;

        Ok(())
    }

    async fn set_attribute_sort_orders(&self, orders: &[(Id, i64)]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for (id, sort_order) in orders {
            sqlx::query("UPDATE attribute SET sort_order = $2 WHERE id = $1")
                .bind(id)
                .bind(sort_order)
                .execute(&mut *tx)
                .await
                .context("Failed to update attribute sort order")?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl FamilyStore for PostgresStore {
    async fn get_family(&self, id: &Id) -> Result<Option<ProductFamily>> {
        let row = sqlx::query("SELECT id, name, deleted FROM product_family WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product family")?;

        Ok(row.map(|row| ProductFamily {
            id: row.get("id"),
            name: row.get("name"),
            deleted: row.get("deleted"),
        }))
    }

    async fn list_families(&self) -> Result<Vec<ProductFamily>> {
        let rows =
            sqlx::query("SELECT id, name, deleted FROM product_family WHERE NOT deleted ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .context("Failed to list product families")?;

        Ok(rows
            .into_iter()
            .map(|row| ProductFamily {
                id: row.get("id"),
                name: row.get("name"),
                deleted: row.get("deleted"),
            })
            .collect())
    }

    async fn upsert_family(&self, family: ProductFamily) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_family (id, name, deleted)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                deleted = EXCLUDED.deleted
            "#,
        )
        .bind(&family.id)
        .bind(&family.name)
        .bind(family.deleted)
        .execute(&self.pool)
        .await
        .context("Failed to upsert product family")?;

        Ok(())
    }

    async fn get_link(
        &self,
        family_id: &Id,
        attribute_id: &Id,
    ) -> Result<Option<FamilyAttributeLink>> {
        let row = sqlx::query(
            "SELECT * FROM product_family_attribute WHERE product_family_id = $1 AND attribute_id = $2",
        )
        .bind(family_id)
        .bind(attribute_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch family attribute link")?;

        row.as_ref().map(link_from_row).transpose()
    }

    async fn list_links_for_family(&self, family_id: &Id) -> Result<Vec<FamilyAttributeLink>> {
        let rows = sqlx::query(
            "SELECT * FROM product_family_attribute WHERE product_family_id = $1 AND NOT deleted",
        )
        .bind(family_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list family attribute links")?;

        rows.iter().map(link_from_row).collect()
    }
}

#[async_trait::async_trait]
impl ProductStore for PostgresStore {
    async fn get_product(&self, id: &Id) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM product WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product")?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT * FROM product WHERE NOT deleted ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list products")?;

        rows.iter().map(product_from_row).collect()
    }

    async fn list_products_for_family(&self, family_id: &Id) -> Result<Vec<Product>> {
        let rows =
            sqlx::query("SELECT * FROM product WHERE product_family_id = $1 AND NOT deleted")
                .bind(family_id)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list products for family")?;

        rows.iter().map(product_from_row).collect()
    }

    async fn upsert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product (id, name, product_family_id, deleted)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                product_family_id = EXCLUDED.product_family_id,
                deleted = EXCLUDED.deleted
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.product_family_id)
        .bind(product.deleted)
        .execute(&self.pool)
        .await
        .context("Failed to upsert product")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl InstanceStore for PostgresStore {
    async fn get_instance(
        &self,
        product_id: &Id,
        attribute_id: &Id,
    ) -> Result<Option<AttributeValueInstance>> {
        let row = sqlx::query(
            "SELECT * FROM product_attribute_value WHERE product_id = $1 AND attribute_id = $2 AND NOT deleted",
        )
        .bind(product_id)
        .bind(attribute_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch attribute value")?;

        row.as_ref().map(instance_from_row).transpose()
    }

    async fn list_instances_for_product(
        &self,
        product_id: &Id,
    ) -> Result<Vec<AttributeValueInstance>> {
        let rows = sqlx::query(
            "SELECT * FROM product_attribute_value WHERE product_id = $1 AND NOT deleted",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list attribute values for product")?;

        rows.iter().map(instance_from_row).collect()
    }

    async fn list_instances_for_link(
        &self,
        family_id: &Id,
        attribute_id: &Id,
    ) -> Result<Vec<AttributeValueInstance>> {
        let rows = sqlx::query(
            "SELECT * FROM product_attribute_value WHERE product_family_id = $1 AND attribute_id = $2 AND NOT deleted",
        )
        .bind(family_id)
        .bind(attribute_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list attribute values for link")?;

        rows.iter().map(instance_from_row).collect()
    }

    async fn apply_change_unit(&self, unit: ChangeUnit) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        if let Some(product) = &unit.product {
            // serializes concurrent units touching the same product
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(&product.id)
                .execute(&mut *tx)
                .await
                .context("Failed to take product lock")?;

            sqlx::query(
                r#"
                INSERT INTO product (id, name, product_family_id, deleted)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    product_family_id = EXCLUDED.product_family_id,
                    deleted = EXCLUDED.deleted
                "#,
            )
            .bind(&product.id)
            .bind(&product.name)
            .bind(&product.product_family_id)
            .bind(product.deleted)
            .execute(&mut *tx)
            .await
            .context("Failed to upsert product")?;
        }

        if let Some(link) = &unit.link {
            sqlx::query(
                r#"
                INSERT INTO product_family_attribute
                    (id, product_family_id, attribute_id, is_required, is_multi_channel, deleted)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (product_family_id, attribute_id) DO UPDATE SET
                    is_required = EXCLUDED.is_required,
                    is_multi_channel = EXCLUDED.is_multi_channel,
                    deleted = EXCLUDED.deleted
                "#,
            )
            .bind(&link.id)
            .bind(&link.product_family_id)
            .bind(&link.attribute_id)
            .bind(link.is_required)
            .bind(link.is_multi_channel)
            .bind(link.deleted)
            .execute(&mut *tx)
            .await
            .context("Failed to upsert family attribute link")?;
        }

        for id in &unit.instances.deletes {
            sqlx::query(
                "UPDATE product_attribute_value SET deleted = TRUE, updated_at = NOW() WHERE id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete attribute value")?;
        }

        for retarget in &unit.instances.retargets {
            sqlx::query(
                "UPDATE product_attribute_value SET product_family_id = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(&retarget.instance_id)
            .bind(&retarget.product_family_id)
            .execute(&mut *tx)
            .await
            .context("Failed to retarget attribute value")?;
        }

        for update in &unit.instances.updates {
            upsert_instance(&mut *tx, update).await?;
        }

        for create in &unit.instances.creates {
            upsert_instance(&mut *tx, create).await?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChannelStore for PostgresStore {
    async fn get_channel(&self, id: &Id) -> Result<Option<Channel>> {
        let row = sqlx::query("SELECT id, name, locales, deleted FROM channel WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch channel")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Channel {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            locales: json_column::<Vec<String>>(&row, "locales")?,
            deleted: row.try_get("deleted")?,
        }))
    }

    async fn list_channels(&self) -> Result<Vec<Channel>> {
        let rows = sqlx::query(
            "SELECT id, name, locales, deleted FROM channel WHERE NOT deleted ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list channels")?;

        rows.iter()
            .map(|row| {
                Ok(Channel {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    locales: json_column::<Vec<String>>(row, "locales")?,
                    deleted: row.try_get("deleted")?,
                })
            })
            .collect()
    }

    async fn upsert_channel(&self, channel: Channel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO channel (id, name, locales, deleted)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                locales = EXCLUDED.locales,
                deleted = EXCLUDED.deleted
            "#,
        )
        .bind(&channel.id)
        .bind(&channel.name)
        .bind(serde_json::to_value(&channel.locales)?)
        .bind(channel.deleted)
        .execute(&self.pool)
        .await
        .context("Failed to upsert channel")?;

        Ok(())
    }

    async fn list_channel_values_for_product(
        &self,
        product_id: &Id,
    ) -> Result<Vec<ChannelAttributeValue>> {
        let rows = sqlx::query(
            "SELECT * FROM channel_product_attribute_value WHERE product_id = $1 AND NOT deleted",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list channel attribute values")?;

        rows.iter().map(channel_value_from_row).collect()
    }

    async fn upsert_channel_value(&self, value: ChannelAttributeValue) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE channel_product_attribute_value
            SET value = $4, locale_values = $5, updated_at = $6
            WHERE product_id = $1 AND channel_id = $2 AND attribute_id = $3 AND NOT deleted
            "#,
        )
        .bind(&value.product_id)
        .bind(&value.channel_id)
        .bind(&value.attribute_id)
        .bind(&value.value)
        .bind(serde_json::to_value(&value.locale_values)?)
        .bind(value.updated_at)
        .execute(&mut *tx)
        .await
        .context("Failed to update channel attribute value")?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                r#"
                INSERT INTO channel_product_attribute_value
                    (id, product_id, channel_id, attribute_id, value, locale_values,
                     deleted, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(&value.id)
            .bind(&value.product_id)
            .bind(&value.channel_id)
            .bind(&value.attribute_id)
            .bind(&value.value)
            .bind(serde_json::to_value(&value.locale_values)?)
            .bind(value.deleted)
            .bind(value.created_at)
            .bind(value.updated_at)
            .execute(&mut *tx)
            .await
            .context("Failed to insert channel attribute value")?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AssociationStore for PostgresStore {
    async fn get_association(&self, id: &Id) -> Result<Option<Association>> {
        let row = sqlx::query(
            "SELECT id, name, backward_association_id, deleted FROM association WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch association")?;

        Ok(row.map(|row| Association {
            id: row.get("id"),
            name: row.get("name"),
            backward_association_id: row.get("backward_association_id"),
            deleted: row.get("deleted"),
        }))
    }

    async fn upsert_association(&self, association: Association) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO association (id, name, backward_association_id, deleted)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                backward_association_id = EXCLUDED.backward_association_id,
                deleted = EXCLUDED.deleted
            "#,
        )
        .bind(&association.id)
        .bind(&association.name)
        .bind(&association.backward_association_id)
        .bind(association.deleted)
        .execute(&self.pool)
        .await
        .context("Failed to upsert association")?;

        Ok(())
    }

    async fn list_associated_products(
        &self,
        association_id: &Id,
        main_ids: Option<&[Id]>,
        related_ids: Option<&[Id]>,
    ) -> Result<Vec<AssociatedProduct>> {
        let main_ids = main_ids.map(|ids| ids.to_vec());
        let related_ids = related_ids.map(|ids| ids.to_vec());

        let rows = sqlx::query(
            r#"
            SELECT * FROM associated_product
            WHERE association_id = $1
              AND NOT deleted
              AND ($2::text[] IS NULL OR main_product_id = ANY($2))
              AND ($3::text[] IS NULL OR related_product_id = ANY($3))
            "#,
        )
        .bind(association_id)
        .bind(main_ids)
        .bind(related_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list associated products")?;

        rows.iter().map(associated_product_from_row).collect()
    }

    async fn apply_association_changes(&self, changes: AssociationChangeSet) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for id in &changes.deletes {
            sqlx::query("UPDATE associated_product SET deleted = TRUE WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete associated product")?;
        }

        for create in &changes.creates {
            sqlx::query(
                r#"
                INSERT INTO associated_product
                    (id, association_id, main_product_id, related_product_id,
                     backward_association_id, deleted)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&create.id)
            .bind(&create.association_id)
            .bind(&create.main_product_id)
            .bind(&create.related_product_id)
            .bind(&create.backward_association_id)
            .bind(create.deleted)
            .execute(&mut *tx)
            .await
            .context("Failed to insert associated product")?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }
}

impl Store for PostgresStore {}
