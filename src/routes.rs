use crate::{handlers, state::AppState};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::get,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Clips are capped at 15MB each; leave room for a handful per request plus
/// the cover image and form overhead.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Session cookies require a concrete allowed origin; an unparseable
    // frontend URL falls back to a no-CORS layer rather than a permissive
    // one.
    let cors = match state.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
        Err(_) => CorsLayer::new(),
    };

    Router::new()
        .route(
            "/soundboards",
            get(handlers::list_soundboards).post(handlers::create_soundboard),
        )
        .route(
            "/soundboards/{id}",
            get(handlers::get_soundboard)
                .put(handlers::edit_soundboard)
                .delete(handlers::delete_soundboard),
        )
        .route("/sounds/{unique_id}", get(handlers::get_sound))
        .route("/image/{id}", get(handlers::get_image))
        .route("/user", get(handlers::current_user))
        .route("/auth/login", get(handlers::login))
        .route("/auth/callback", get(handlers::auth_callback))
        .route("/logout", get(handlers::logout))
        // Middleware Layers
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
