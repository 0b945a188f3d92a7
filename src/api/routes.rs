use axum::{routing::get, Router};
use std::sync::Arc;

use crate::store::Store;

use super::handlers::{
    add_like, combined_badge, health_check, like_badge, like_button, promo_button, visit_badge,
    AppState,
};

pub fn create_router(store: Arc<Store>) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route("/health", get(health_check))
        .route("/v1/visit/{namespace}/{key}", get(visit_badge))
        .route("/v1/badge/{namespace}/{key}", get(combined_badge))
        .route("/v1/like/{namespace}/{key}", get(like_badge))
        .route("/v1/like/{namespace}/{key}/add", get(add_like))
        .route("/v1/button/{namespace}/{key}", get(like_button))
        .route("/v1/promo", get(promo_button))
        // Bare namespace/key defaults to the combined badge
        .route("/v1/{namespace}/{key}", get(combined_badge))
        .with_state(state)
}
