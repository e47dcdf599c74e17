// Route definitions

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;

mod api;
mod pages;

pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/filters", get(api::get_filters))
        .route("/filters/apply", post(api::apply_filters))
        .route("/filters/chips/remove", post(api::remove_filter_chip))
        .route("/lookups", get(api::get_lookups))
        .route("/makes", get(api::get_makes))
        .route("/models/:make", get(api::get_models))
        .route("/best-deals", get(api::get_best_deals))
        .route("/picker", post(api::picker_event))
        .route(
            "/preferences/:key",
            get(api::get_preference)
                .put(api::put_preference)
                .delete(api::delete_preference),
        )
        .with_state(app_state.clone());

    let listing_path = app_state.settings.listing_path.clone();
    let mut router = Router::new().route(&listing_path, get(pages::cars_page));
    // A listing served at the root needs no redirect
    if listing_path != "/" {
        router = router.route("/", get(pages::root));
    }
    router
        .nest("/api", api_router)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
