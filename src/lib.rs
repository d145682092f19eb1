use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::{Capability, TokenIssuer, TokenVerifier, gated};
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, ErrorKind};
pub use repository::{MockRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generated OpenAPI document, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::admin_login, handlers::signup, handlers::get_me,
        handlers::create_inquiry, handlers::list_my_inquiries, handlers::get_my_inquiry,
        handlers::create_review, handlers::admin_list_inquiries, handlers::answer_inquiry,
        handlers::get_store, handlers::update_store, handlers::delete_store
    ),
    components(
        schemas(
            models::LoginRequest, models::LoginResponse, models::SignupRequest,
            models::Identity, models::Role, models::Namespace,
            models::Inquiry, models::InquirySummary, models::CreateInquiryRequest,
            models::CreatedInquiry, models::AnswerInquiryRequest, models::Store,
            models::UpdateStoreRequest, models::Review, models::CreateReviewRequest,
            error::ErrorBody, error::ErrorKind,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "fooddb-gateway", description = "Authentication gateway for the campus food review service")
    )
)]
struct ApiDoc;

struct BearerSecurity;

impl utoipa::Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// Implements the **Unified State Pattern**: the single, immutable container of every
/// service and configuration value, shared by all requests. The issuer and verifier are
/// built from `config.jwt_secret` exactly once, in `AppState::new`.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: credential lookups and the wrapped operations' persistence.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Signs tokens at login.
    pub issuer: TokenIssuer,
    /// Verifies bearer tokens at every gated request.
    pub verifier: TokenVerifier,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            issuer: TokenIssuer::from_secret(&config.jwt_secret),
            verifier: TokenVerifier::from_secret(&config.jwt_secret),
            repo,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, wraps each route group in the authorization gate for
/// its capability, and applies the global observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: no gate.
        .merge(public::public_routes())
        // Any authenticated principal.
        .merge(gated(
            authenticated::authenticated_routes(),
            &state.verifier,
            Capability::AuthenticatedAny,
        ))
        // Admins only.
        .nest(
            "/api/admin",
            gated(
                admin::admin_routes(),
                &state.verifier,
                Capability::AuthenticatedAdmin,
            ),
        )
        // Set after every merge and nest: a gated group's layered fallback would
        // otherwise answer unknown paths with a token rejection.
        .fallback(handlers::route_not_found)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (outermost, answers browser preflights with CORS headers)
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span: method, URI and the `x-request-id` set above, so every
/// log line of one request is correlated. Never records the `Authorization` header.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
