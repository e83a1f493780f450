pub mod admin;
pub mod auth;
pub mod extract;
pub mod folders;
pub mod health;
pub mod realtime;
pub mod shares;
pub mod snippets;
pub mod validation;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::AppState;

pub use extract::AuthUser;
pub use health::health_check;
pub use validation::{timestamp_to_rfc3339, validate_signed_request};

/// All HTTP routes, without the CORS and tracing layers
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/admin/stats", get(admin::admin_stats))
        .route("/api/auth/sign-up", post(auth::sign_up))
        .route("/api/auth/sign-in", post(auth::sign_in))
        .route("/api/auth/guest-sign-in", post(auth::guest_sign_in))
        .route("/api/auth/oauth/callback", post(auth::oauth_callback))
        .route("/api/auth/sign-out", post(auth::sign_out))
        .route("/api/auth/session", get(auth::session_status))
        .route("/api/me", get(auth::me))
        .route("/api/dashboard", get(snippets::dashboard))
        .route(
            "/api/folders",
            get(folders::list_folders).post(folders::create_folder),
        )
        .route(
            "/api/folders/:id",
            patch(folders::rename_folder).delete(folders::delete_folder),
        )
        .route(
            "/api/snippets",
            get(snippets::list_snippets).post(snippets::create_snippet),
        )
        .route(
            "/api/snippets/:id",
            get(snippets::get_snippet)
                .patch(snippets::update_snippet)
                .delete(snippets::delete_snippet),
        )
        .route("/api/snippets/:id/favorite", put(snippets::set_favorite))
        .route("/api/snippets/:id/folder", put(snippets::move_to_folder))
        .route(
            "/api/snippets/:id/folders/:folder_id",
            put(snippets::add_to_folder).delete(snippets::remove_from_folder),
        )
        .route("/api/snippets/:id/shares", post(shares::create_share))
        .route(
            "/api/snippets/:id/shares/:token",
            axum::routing::delete(shares::revoke_share),
        )
        .route("/api/shared/:token", get(shares::get_shared))
        .route("/api/realtime", get(realtime::realtime_feed))
        .with_state(state)
}
