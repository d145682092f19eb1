//! Request extractors whose rejections render as `ApiError`, so a malformed body or path
//! gets the same `{kind, message}` shape as every other rejection.

use axum::{
    Form, Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// ApiJson
///
/// `axum::Json` with its rejection mapped to `invalid_request`.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// ApiPath
///
/// `axum::extract::Path` with its rejection mapped to `invalid_request`.
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// JsonOrForm
///
/// Reads a body sent either as JSON or as an HTML form post, chosen by `Content-Type`.
///
/// - form-urlencoded → `Form`
/// - any other declared type → `Json` (a non-JSON type is an `invalid_request`)
/// - no `Content-Type` at all → nothing was submitted, and every field takes its default
pub struct JsonOrForm<T>(pub T);

impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| value.to_str().unwrap_or_default().to_ascii_lowercase());

        let value = match content_type.as_deref() {
            None => serde_json::from_value(Value::Object(Map::new()))
                .map_err(|err| ApiError::InvalidRequest(err.to_string()))?,
            Some(content_type) if content_type.starts_with(FORM_CONTENT_TYPE) => {
                Form::<T>::from_request(req, state).await?.0
            }
            Some(_) => Json::<T>::from_request(req, state).await?.0,
        };

        Ok(Self(value))
    }
}
