use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes open to any authenticated principal. Every handler here receives the caller
/// as an `Identity` attached by the gate and scopes its data access to that identity.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // POST /api/inquiries
        // Files an inquiry owned by the caller.
        .route("/api/inquiries", post(handlers::create_inquiry))
        // GET /api/inquiries/me
        .route("/api/inquiries/me", get(handlers::list_my_inquiries))
        // GET /api/inquiries/{id}
        // Owner-Only read of one inquiry and its answer.
        .route("/api/inquiries/{id}", get(handlers::get_my_inquiry))
        // POST /api/stores/{id}/reviews
        .route("/api/stores/{id}/reviews", post(handlers::create_review))
}
