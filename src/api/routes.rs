use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Attribute management
        .route("/attributes", post(handlers::create_attribute::<S>))
        .route("/attributes", get(handlers::list_attributes::<S>))
        .route("/attributes/:attribute_id", get(handlers::get_attribute::<S>))
        .route(
            "/attribute-groups/:group_id/order",
            put(handlers::update_attribute_order::<S>),
        )
        // Product families and their attribute links
        .route("/families", post(handlers::create_family::<S>))
        .route("/families", get(handlers::list_families::<S>))
        .route("/families/:family_id", get(handlers::get_family::<S>))
        .route(
            "/families/:family_id/attributes",
            get(handlers::list_family_attributes::<S>),
        )
        .route(
            "/families/:family_id/attributes/:attribute_id",
            post(handlers::link_family_attribute::<S>),
        )
        .route(
            "/families/:family_id/attributes/:attribute_id",
            delete(handlers::unlink_family_attribute::<S>),
        )
        // Products
        .route("/products", post(handlers::create_product::<S>))
        .route("/products", get(handlers::list_products::<S>))
        .route("/products/:product_id", get(handlers::get_product::<S>))
        .route(
            "/products/:product_id/family",
            patch(handlers::change_product_family::<S>),
        )
        // Attribute value resolution and updates
        .route(
            "/products/:product_id/attributes",
            get(handlers::resolve_product_attributes::<S>),
        )
        .route(
            "/products/:product_id/attributes",
            put(handlers::update_product_attributes::<S>),
        )
        .route(
            "/products/:product_id/channel-attributes",
            get(handlers::resolve_channel_attributes::<S>),
        )
        // Channels and channel-scoped values
        .route("/channels", post(handlers::create_channel::<S>))
        .route("/channels", get(handlers::list_channels::<S>))
        .route(
            "/products/:product_id/channels/:channel_id/attributes/:attribute_id",
            put(handlers::upsert_channel_value::<S>),
        )
        // Associations
        .route("/associations", post(handlers::create_association::<S>))
        .route(
            "/associations/:association_id/add-related",
            post(handlers::add_associated_products::<S>),
        )
        .route(
            "/associations/:association_id/remove-related",
            post(handlers::remove_associated_products::<S>),
        )
}
