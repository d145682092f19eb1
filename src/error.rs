use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// CredentialError
///
/// Failures of the login path. `Dependency` is storage trouble during the lookup and is
/// reported as its own kind, never as a credential problem.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("login_id and secret are required")]
    MissingCredential,
    #[error("no account matches this login_id")]
    UnknownPrincipal,
    #[error("secret does not match")]
    SecretMismatch,
    #[error("administrative accounts must use the admin login")]
    NamespaceMismatch,
    #[error(transparent)]
    Dependency(#[from] RepositoryError),
}

/// TokenError
///
/// Failures of bearer token verification, in the order the verifier checks them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("authorization header missing or not a bearer token")]
    MissingToken,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token claims are malformed")]
    MalformedClaims,
}

/// IssueError
///
/// Failures while minting a token. Neither is the caller's fault.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("token lifetime runs past the representable clock range")]
    TtlOverflow,
    #[error(transparent)]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// ErrorKind
///
/// The stable, machine-readable discriminator of every rejection the gateway emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredential,
    UnknownPrincipal,
    SecretMismatch,
    NamespaceMismatch,
    MissingToken,
    InvalidSignature,
    Expired,
    MalformedClaims,
    InsufficientRole,
    DependencyFailure,
    NotFound,
    Conflict,
    InvalidRequest,
    Internal,
}

/// ApiError
///
/// Everything a handler or the gate can answer with instead of a success.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("this operation requires the admin role")]
    InsufficientRole,
    #[error("this operation is only available to user accounts")]
    UserAccountRequired,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Dependency(#[from] RepositoryError),
    #[error("failed to issue token: {0}")]
    Issue(#[from] IssueError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Credential(err) => match err {
                CredentialError::MissingCredential => ErrorKind::MissingCredential,
                CredentialError::UnknownPrincipal => ErrorKind::UnknownPrincipal,
                CredentialError::SecretMismatch => ErrorKind::SecretMismatch,
                CredentialError::NamespaceMismatch => ErrorKind::NamespaceMismatch,
                CredentialError::Dependency(_) => ErrorKind::DependencyFailure,
            },
            ApiError::Token(err) => match err {
                TokenError::MissingToken => ErrorKind::MissingToken,
                TokenError::InvalidSignature => ErrorKind::InvalidSignature,
                TokenError::Expired => ErrorKind::Expired,
                TokenError::MalformedClaims => ErrorKind::MalformedClaims,
            },
            ApiError::InsufficientRole => ErrorKind::InsufficientRole,
            ApiError::UserAccountRequired => ErrorKind::NamespaceMismatch,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Conflict(_) => ErrorKind::Conflict,
            ApiError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ApiError::Dependency(_) => ErrorKind::DependencyFailure,
            ApiError::Issue(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::MissingCredential | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::UnknownPrincipal
            | ErrorKind::SecretMismatch
            | ErrorKind::MissingToken
            | ErrorKind::InvalidSignature
            | ErrorKind::Expired
            | ErrorKind::MalformedClaims => StatusCode::UNAUTHORIZED,
            ErrorKind::NamespaceMismatch | ErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::DependencyFailure => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// ErrorBody
///
/// The JSON shape of every rejection: `{"kind": "...", "message": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        // Internal details of storage and signing failures stay in the logs.
        let message = match &self {
            ApiError::Credential(CredentialError::Dependency(err)) | ApiError::Dependency(err) => {
                tracing::error!(error = %err, "storage dependency failed");
                "a backing service is unavailable".to_string()
            }
            ApiError::Issue(err) => {
                tracing::error!(error = %err, "token issue failed");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { kind, message })).into_response()
    }
}

// Body and path rejections from axum's own extractors keep the `{kind, message}` shape.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}
