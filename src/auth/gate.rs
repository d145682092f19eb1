use axum::{
    Router,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, Method, StatusCode, header, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use crate::{
    auth::tokens::TokenVerifier,
    error::{ApiError, TokenError},
    models::{Identity, Namespace, Role},
};

/// Capability
///
/// The minimum a gated operation demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    AuthenticatedAny,
    AuthenticatedAdmin,
}

impl Capability {
    /// Admin capability is granted on the exact admin role, issued in the admin namespace.
    pub fn permits(&self, identity: &Identity) -> bool {
        match self {
            Capability::AuthenticatedAny => true,
            Capability::AuthenticatedAdmin => {
                identity.role == Role::Admin && identity.namespace == Namespace::Admin
            }
        }
    }
}

/// Rejection
///
/// Why the gate refused a request. Not being authenticated and lacking the role are
/// separate classes and map to 401 and 403 respectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Unauthenticated(TokenError),
    InsufficientRole,
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Unauthenticated(err) => ApiError::Token(err),
            Rejection::InsufficientRole => ApiError::InsufficientRole,
        }
    }
}

/// AuthorizationDecision
///
/// The verdict for one request, computed fresh every time and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    /// Cross-origin preflight: answered before any token inspection.
    Preflight,
    Allow(Identity),
    Reject(Rejection),
}

/// Gate
///
/// The Authorization Gate for one capability requirement. Cheap to clone; holds the
/// read-only verifier and the capability, nothing else.
#[derive(Clone)]
pub struct Gate {
    verifier: TokenVerifier,
    capability: Capability,
}

impl Gate {
    pub fn new(verifier: TokenVerifier, capability: Capability) -> Self {
        Self {
            verifier,
            capability,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn decide(&self, method: &Method, headers: &HeaderMap) -> AuthorizationDecision {
        self.decide_at(method, headers, Utc::now())
    }

    /// decide_at
    ///
    /// 1. `OPTIONS` short-circuits to `Preflight`.
    /// 2. The bearer token is verified; any token error rejects as unauthenticated.
    /// 3. The capability is checked against the role claim; failure rejects as forbidden.
    /// 4. Otherwise the verified identity is allowed through.
    pub fn decide_at(
        &self,
        method: &Method,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> AuthorizationDecision {
        if method == Method::OPTIONS {
            return AuthorizationDecision::Preflight;
        }

        // A header that is not valid UTF-8 counts as absent.
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let claims = match self.verifier.verify_bearer_at(authorization, now) {
            Ok(claims) => claims,
            Err(err) => return AuthorizationDecision::Reject(Rejection::Unauthenticated(err)),
        };

        let identity = claims.identity();
        if !self.capability.permits(&identity) {
            return AuthorizationDecision::Reject(Rejection::InsufficientRole);
        }

        AuthorizationDecision::Allow(identity)
    }
}

/// authorize
///
/// Middleware form of the gate. On `Allow` the identity is attached to the request
/// extensions and the wrapped operation runs; its response is returned unchanged.
pub async fn authorize(State(gate): State<Gate>, mut request: Request, next: Next) -> Response {
    match gate.decide(request.method(), request.headers()) {
        AuthorizationDecision::Preflight => StatusCode::OK.into_response(),
        AuthorizationDecision::Reject(rejection) => {
            let err = ApiError::from(rejection);
            tracing::warn!(
                kind = ?err.kind(),
                capability = ?gate.capability(),
                "request rejected by authorization gate"
            );
            err.into_response()
        }
        AuthorizationDecision::Allow(identity) => {
            tracing::debug!(
                subject_id = identity.subject_id,
                role = %identity.role,
                namespace = ?identity.namespace,
                "request authorized"
            );
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
    }
}

/// gated
///
/// Wraps every route of `router` with the gate for `capability`.
///
/// Uses `Router::layer` rather than `route_layer` so that an `OPTIONS` request to a path
/// that only registers other methods still reaches the gate and gets its empty 200.
pub fn gated<S>(router: Router<S>, verifier: &TokenVerifier, capability: Capability) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let gate = Gate::new(verifier.clone(), capability);
    router.layer(middleware::from_fn_with_state(gate, authorize))
}

/// Identity Extractor Implementation
///
/// Reads the identity the gate attached to the request. Handlers take `Identity` as an
/// argument and never look at the `Authorization` header themselves. A handler mounted
/// outside a gate gets a `missing_token` rejection.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(ApiError::Token(TokenError::MissingToken))
    }
}
