use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Routes restricted to tokens carrying role "admin". Mounted under `/api/admin` and
/// wrapped by the `AuthenticatedAdmin` gate, so handlers here never re-check the role.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/inquiries
        // The moderation queue: every inquiry, answered or not.
        .route("/inquiries", get(handlers::admin_list_inquiries))
        // POST /api/admin/inquiries/{id}/answer
        .route("/inquiries/{id}/answer", post(handlers::answer_inquiry))
        // GET/PUT/DELETE /api/admin/stores/{id}
        // Store maintenance from the admin console.
        .route(
            "/stores/{id}",
            get(handlers::get_store)
                .put(handlers::update_store)
                .delete(handlers::delete_store),
        )
}
