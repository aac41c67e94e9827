use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::actor::Actor;
use crate::logic::{
    AccessChecker, AssociationManager, EventSink, Propagator, Resequencer, Resolver,
};
use crate::model::{
    generate_id, Association, Attribute, CatalogError, Channel, ChannelAttributeValue,
    ChannelAttributes, FamilyAttributeLink, Id, LinkOptions, LocaleSettings, NewAttribute,
    NewProduct, Product, ProductFamily, ResolvedAttribute,
};
use crate::store::traits::Store;

/// Shared handler state: the store plus the permission and event seams.
pub struct AppState<S> {
    pub store: Arc<S>,
    pub acl: Arc<dyn AccessChecker>,
    pub events: Arc<dyn EventSink>,
    pub locales: LocaleSettings,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            acl: Arc::clone(&self.acl),
            events: Arc::clone(&self.events),
            locales: self.locales.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn catalog_error(err: CatalogError) -> HandlerError {
    let status = match &err {
        CatalogError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Forbidden(_) => StatusCode::FORBIDDEN,
        CatalogError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(&err.to_string())))
}

fn storage_error(err: anyhow::Error) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(&err.to_string())),
    )
}

fn not_found(what: &str, id: &Id) -> HandlerError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(&format!("{} {} not found", what, id))),
    )
}

// === Attributes ===

pub async fn create_attribute<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(payload): RequestJson<NewAttribute>,
) -> Result<(StatusCode, Json<Attribute>), HandlerError> {
    let attribute = payload.into_attribute();
    state
        .store
        .upsert_attribute(attribute.clone())
        .await
        .map_err(storage_error)?;
    Ok((StatusCode::CREATED, Json(attribute)))
}

pub async fn list_attributes<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<ListResponse<Attribute>>, HandlerError> {
    let attributes = state.store.list_attributes().await.map_err(storage_error)?;
    Ok(Json(ListResponse::new(attributes)))
}

pub async fn get_attribute<S: Store>(
    State(state): State<AppState<S>>,
    Path(attribute_id): Path<Id>,
) -> Result<Json<Attribute>, HandlerError> {
    state
        .store
        .get_attribute(&attribute_id)
        .await
        .map_err(storage_error)?
        .filter(|a| !a.deleted)
        .map(Json)
        .ok_or_else(|| not_found("attribute", &attribute_id))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeOrderRequest {
    pub attribute_ids: Vec<Id>,
}

pub async fn update_attribute_order<S: Store>(
    State(state): State<AppState<S>>,
    Path(group_id): Path<Id>,
    RequestJson(payload): RequestJson<AttributeOrderRequest>,
) -> Result<StatusCode, HandlerError> {
    Resequencer::update_attribute_order(state.store.as_ref(), &group_id, &payload.attribute_ids)
        .await
        .map_err(catalog_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// === Product families ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFamilyRequest {
    pub name: String,
}

pub async fn create_family<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(payload): RequestJson<NewFamilyRequest>,
) -> Result<(StatusCode, Json<ProductFamily>), HandlerError> {
    let family = ProductFamily {
        id: generate_id(),
        name: payload.name,
        deleted: false,
    };
    state
        .store
        .upsert_family(family.clone())
        .await
        .map_err(storage_error)?;
    Ok((StatusCode::CREATED, Json(family)))
}

pub async fn list_families<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<ListResponse<ProductFamily>>, HandlerError> {
    let families = state.store.list_families().await.map_err(storage_error)?;
    Ok(Json(ListResponse::new(families)))
}

pub async fn get_family<S: Store>(
    State(state): State<AppState<S>>,
    Path(family_id): Path<Id>,
) -> Result<Json<ProductFamily>, HandlerError> {
    state
        .store
        .get_family(&family_id)
        .await
        .map_err(storage_error)?
        .filter(|f| !f.deleted)
        .map(Json)
        .ok_or_else(|| not_found("product family", &family_id))
}

pub async fn list_family_attributes<S: Store>(
    State(state): State<AppState<S>>,
    Path(family_id): Path<Id>,
) -> Result<Json<ListResponse<FamilyAttributeLink>>, HandlerError> {
    state
        .store
        .get_family(&family_id)
        .await
        .map_err(storage_error)?
        .filter(|f| !f.deleted)
        .ok_or_else(|| not_found("product family", &family_id))?;
    let links = state
        .store
        .list_links_for_family(&family_id)
        .await
        .map_err(storage_error)?;
    Ok(Json(ListResponse::new(links)))
}

pub async fn link_family_attribute<S: Store>(
    State(state): State<AppState<S>>,
    Path((family_id, attribute_id)): Path<(Id, Id)>,
    payload: Option<RequestJson<LinkOptions>>,
) -> Result<StatusCode, HandlerError> {
    let options = payload.map(|RequestJson(o)| o).unwrap_or_default();
    Propagator::apply_family_link(state.store.as_ref(), &family_id, &attribute_id, true, options)
        .await
        .map_err(catalog_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlink_family_attribute<S: Store>(
    State(state): State<AppState<S>>,
    Path((family_id, attribute_id)): Path<(Id, Id)>,
) -> Result<StatusCode, HandlerError> {
    Propagator::apply_family_link(
        state.store.as_ref(),
        &family_id,
        &attribute_id,
        false,
        LinkOptions::default(),
    )
    .await
    .map_err(catalog_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// === Products ===

pub async fn create_product<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(payload): RequestJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>), HandlerError> {
    let product = Propagator::on_product_created(state.store.as_ref(), payload.into_product())
        .await
        .map_err(catalog_error)?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<ListResponse<Product>>, HandlerError> {
    let products = state.store.list_products().await.map_err(storage_error)?;
    Ok(Json(ListResponse::new(products)))
}

pub async fn get_product<S: Store>(
    State(state): State<AppState<S>>,
    Path(product_id): Path<Id>,
) -> Result<Json<Product>, HandlerError> {
    state
        .store
        .get_product(&product_id)
        .await
        .map_err(storage_error)?
        .filter(|p| !p.deleted)
        .map(Json)
        .ok_or_else(|| not_found("product", &product_id))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFamilyRequest {
    pub product_family_id: Option<Id>,
}

pub async fn change_product_family<S: Store>(
    State(state): State<AppState<S>>,
    Path(product_id): Path<Id>,
    RequestJson(payload): RequestJson<ChangeFamilyRequest>,
) -> Result<Json<Product>, HandlerError> {
    let product = state
        .store
        .get_product(&product_id)
        .await
        .map_err(storage_error)?
        .filter(|p| !p.deleted)
        .ok_or_else(|| not_found("product", &product_id))?;
    Propagator::apply_product_family_change(
        state.store.as_ref(),
        &product_id,
        product.product_family_id.as_ref(),
        payload.product_family_id.as_ref(),
    )
    .await
    .map_err(catalog_error)?;
    state
        .store
        .get_product(&product_id)
        .await
        .map_err(storage_error)?
        .map(Json)
        .ok_or_else(|| not_found("product", &product_id))
}

// === Attribute value resolution and updates ===

pub async fn resolve_product_attributes<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(product_id): Path<Id>,
) -> Result<Json<Vec<ResolvedAttribute>>, HandlerError> {
    let records = Resolver::resolve_attributes(
        state.store.as_ref(),
        state.acl.as_ref(),
        &state.locales,
        &actor.id,
        &product_id,
    )
    .await
    .map_err(catalog_error)?;
    Ok(Json(records))
}

pub async fn resolve_channel_attributes<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(product_id): Path<Id>,
) -> Result<Json<Vec<ChannelAttributes>>, HandlerError> {
    let channels = Resolver::resolve_channel_attributes(
        state.store.as_ref(),
        state.acl.as_ref(),
        &state.locales,
        &actor.id,
        &product_id,
    )
    .await
    .map_err(catalog_error)?;
    Ok(Json(channels))
}

pub async fn update_product_attributes<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(product_id): Path<Id>,
    RequestJson(payload): RequestJson<Vec<serde_json::Map<String, serde_json::Value>>>,
) -> Result<StatusCode, HandlerError> {
    Resolver::update_attributes(
        state.store.as_ref(),
        state.acl.as_ref(),
        state.events.as_ref(),
        &state.locales,
        &actor.id,
        &product_id,
        payload,
    )
    .await
    .map_err(catalog_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// === Channels ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChannelRequest {
    pub name: String,
    #[serde(default)]
    pub locales: Vec<String>,
}

pub async fn create_channel<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(payload): RequestJson<NewChannelRequest>,
) -> Result<(StatusCode, Json<Channel>), HandlerError> {
    let channel = Channel {
        id: generate_id(),
        name: payload.name,
        locales: payload.locales,
        deleted: false,
    };
    state
        .store
        .upsert_channel(channel.clone())
        .await
        .map_err(storage_error)?;
    Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn list_channels<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<ListResponse<Channel>>, HandlerError> {
    let channels = state.store.list_channels().await.map_err(storage_error)?;
    Ok(Json(ListResponse::new(channels)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelValueRequest {
    pub value: Option<String>,
    #[serde(default)]
    pub locale_values: std::collections::BTreeMap<String, String>,
}

pub async fn upsert_channel_value<S: Store>(
    State(state): State<AppState<S>>,
    Path((product_id, channel_id, attribute_id)): Path<(Id, Id, Id)>,
    RequestJson(payload): RequestJson<ChannelValueRequest>,
) -> Result<StatusCode, HandlerError> {
    state
        .store
        .get_product(&product_id)
        .await
        .map_err(storage_error)?
        .filter(|p| !p.deleted)
        .ok_or_else(|| not_found("product", &product_id))?;
    state
        .store
        .get_channel(&channel_id)
        .await
        .map_err(storage_error)?
        .filter(|c| !c.deleted)
        .ok_or_else(|| not_found("channel", &channel_id))?;
    state
        .store
        .get_attribute(&attribute_id)
        .await
        .map_err(storage_error)?
        .filter(|a| !a.deleted)
        .ok_or_else(|| not_found("attribute", &attribute_id))?;

    let now = chrono::Utc::now();
    state
        .store
        .upsert_channel_value(ChannelAttributeValue {
            id: generate_id(),
            product_id,
            channel_id,
            attribute_id,
            value: payload.value,
            locale_values: payload.locale_values,
            deleted: false,
            created_at: now,
            updated_at: now,
        })
        .await
        .map_err(storage_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// === Associations ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssociationRequest {
    pub name: String,
    #[serde(default)]
    pub backward_association_id: Option<Id>,
}

pub async fn create_association<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(payload): RequestJson<NewAssociationRequest>,
) -> Result<(StatusCode, Json<Association>), HandlerError> {
    let association = Association::new(payload.name, payload.backward_association_id);
    state
        .store
        .upsert_association(association.clone())
        .await
        .map_err(storage_error)?;
    Ok((StatusCode::CREATED, Json(association)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedProductsRequest {
    pub main_product_ids: Vec<Id>,
    pub related_product_ids: Vec<Id>,
}

#[derive(Debug, Serialize)]
pub struct RelatedProductsResponse {
    pub affected: usize,
}

pub async fn add_associated_products<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(association_id): Path<Id>,
    RequestJson(payload): RequestJson<RelatedProductsRequest>,
) -> Result<Json<RelatedProductsResponse>, HandlerError> {
    let affected = AssociationManager::add_associated_products(
        state.store.as_ref(),
        state.acl.as_ref(),
        &actor.id,
        &association_id,
        &payload.main_product_ids,
        &payload.related_product_ids,
    )
    .await
    .map_err(catalog_error)?;
    Ok(Json(RelatedProductsResponse { affected }))
}

pub async fn remove_associated_products<S: Store>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(association_id): Path<Id>,
    RequestJson(payload): RequestJson<RelatedProductsRequest>,
) -> Result<Json<RelatedProductsResponse>, HandlerError> {
    let affected = AssociationManager::remove_associated_products(
        state.store.as_ref(),
        state.acl.as_ref(),
        &actor.id,
        &association_id,
        &payload.main_product_ids,
        &payload.related_product_ids,
    )
    .await
    .map_err(catalog_error)?;
    Ok(Json(RelatedProductsResponse { affected }))
}
