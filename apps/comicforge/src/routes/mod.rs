pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::comic::handlers as comic;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/options", get(comic::handle_options))
        // Session lifecycle
        .route("/api/v1/sessions", post(session::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(session::handle_get_session).delete(session::handle_delete_session),
        )
        // Characters
        .route(
            "/api/v1/sessions/:id/characters",
            post(session::handle_add_character),
        )
        .route(
            "/api/v1/sessions/:id/characters/:idx",
            put(session::handle_update_character).delete(session::handle_remove_character),
        )
        // Reference image
        .route(
            "/api/v1/sessions/:id/reference",
            put(session::handle_upload_reference).delete(session::handle_clear_reference),
        )
        // Pages
        .route(
            "/api/v1/sessions/:id/pages",
            get(comic::handle_list_pages).post(comic::handle_generate_page),
        )
        .route(
            "/api/v1/sessions/:id/pages/:number",
            get(comic::handle_get_page),
        )
        .route("/api/v1/sessions/:id/edit", post(comic::handle_edit_last_page))
        .route("/api/v1/sessions/:id/next", post(comic::handle_next_page))
        .route("/api/v1/sessions/:id/pdf", get(comic::handle_download_pdf))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
