use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are **unauthenticated**: the health check, signup and the two login
/// entry points. The user and admin logins are separate paths because they consult disjoint
/// credential namespaces.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer health check. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // POST /login
        // Students and store owners. Issues an ordinary-principal token.
        .route("/login", post(handlers::login))
        // POST /admin_login
        // Site administrators. Issues a short-lived admin token.
        .route("/admin_login", post(handlers::admin_login))
        // POST /signup
        // Registers a student or a store owner in the user namespace.
        .route("/signup", post(handlers::signup))
}
