use crate::{
    AppState,
    auth::{user_identity, verify_credentials},
    error::{ApiError, ApiResult, CredentialError, ErrorBody},
    extract::{ApiJson, ApiPath, JsonOrForm},
    models::{
        AnswerInquiryRequest, CreateInquiryRequest, CreateReviewRequest, CreatedInquiry,
        Identity, Inquiry, InquirySummary, LoginRequest, LoginResponse, Namespace, NewUser,
        Review, SignupProfile, SignupRequest, Store, UpdateStoreRequest,
    },
};
use axum::{Json, extract::State, http::StatusCode};

// --- Login entry points ---

/// login
///
/// [Public Route] Login for ordinary principals (students and store owners).
/// Looks the credential up in the user namespace only and, on success, issues a token
/// with the ordinary-principal TTL. Accepts a JSON body or a form post.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing credential or unreadable body", body = ErrorBody),
        (status = 401, description = "Unknown principal or secret mismatch", body = ErrorBody),
        (status = 403, description = "Admin account used on the user login", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    login_in(&state, Namespace::User, payload).await
}

/// admin_login
///
/// [Public Route] Login for site administrators. Consults the admin namespace only;
/// tokens issued here carry role "admin" and the shorter admin TTL.
#[utoipa::path(
    post,
    path = "/admin_login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing credential", body = ErrorBody),
        (status = 401, description = "Unknown principal or secret mismatch", body = ErrorBody)
    )
)]
pub async fn admin_login(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    login_in(&state, Namespace::Admin, payload).await
}

async fn login_in(
    state: &AppState,
    namespace: Namespace,
    credential: LoginRequest,
) -> ApiResult<Json<LoginResponse>> {
    let verified = match verify_credentials(state.repo.as_ref(), namespace, &credential).await {
        Ok(verified) => verified,
        Err(err) => {
            tracing::warn!(?namespace, error = %err, "login rejected");
            return Err(err.into());
        }
    };

    let identity = Identity::from(&verified);
    let issued = state
        .issuer
        .issue(&identity, state.config.token_ttl(namespace))?;

    tracing::info!(
        subject_id = identity.subject_id,
        role = %identity.role,
        ?namespace,
        "login succeeded"
    );

    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
        identity,
    }))
}

/// signup
///
/// [Public Route] Registers a student or a store owner.
///
/// The profile row (`students` or `providers`) and the `users` row are written in one
/// transaction. A taken `login_id` or an already registered `student_id` is a 409.
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = Identity),
        (status = 400, description = "Missing or invalid field", body = ErrorBody),
        (status = 409, description = "login_id or student_id already registered", body = ErrorBody)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<SignupRequest>,
) -> ApiResult<(StatusCode, Json<Identity>)> {
    let new_user = validate_signup(payload)?;

    let created = state
        .repo
        .create_user(new_user)
        .await?
        .ok_or(ApiError::Conflict("login_id or student_id is already registered"))?;

    let identity = Identity::from(&user_identity(created)?);
    tracing::info!(
        subject_id = identity.subject_id,
        role = %identity.role,
        "account created"
    );

    Ok((StatusCode::CREATED, Json(identity)))
}

fn validate_signup(req: SignupRequest) -> ApiResult<NewUser> {
    let login_id = req
        .login_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(CredentialError::MissingCredential)?;
    let secret = req
        .secret
        .filter(|secret| !secret.trim().is_empty())
        .ok_or(CredentialError::MissingCredential)?;
    let display_name = required(req.name, "name")?;

    let profile = match req.account_type.as_deref().map(str::trim) {
        Some("student") => SignupProfile::Student {
            student_id: required(req.student_id, "student_id")?,
            school: required(req.school, "school")?,
        },
        Some("provider") => SignupProfile::Provider {
            store_name: required(req.store_name, "store_name")?,
            business_number: required(req.business_number, "business_number")?,
        },
        _ => {
            return Err(ApiError::InvalidRequest(
                "type must be \"student\" or \"provider\"".to_string(),
            ));
        }
    };

    Ok(NewUser {
        login_id,
        secret,
        display_name,
        profile,
    })
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest(format!("{field} is required")))
}

// --- Authenticated operations ---

/// user_subject
///
/// The `users.user_id` of the caller. Admin ids live in a separate table and may
/// coincide with a user id, so an admin-namespace identity never stands in for a user.
fn user_subject(identity: &Identity) -> ApiResult<i64> {
    match identity.namespace {
        Namespace::User => Ok(identity.subject_id),
        Namespace::Admin => Err(ApiError::UserAccountRequired),
    }
}

/// get_me
///
/// [Authenticated Route] Echoes the identity the gate attached to this request.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Caller identity", body = Identity),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn get_me(identity: Identity) -> Json<Identity> {
    Json(identity)
}

/// create_inquiry
///
/// [Authenticated Route] Files a new inquiry. The owner is always the caller.
#[utoipa::path(
    post,
    path = "/api/inquiries",
    request_body = CreateInquiryRequest,
    responses(
        (status = 201, description = "Created", body = CreatedInquiry),
        (status = 400, description = "title and content are required", body = ErrorBody),
        (status = 403, description = "Admin accounts cannot file inquiries", body = ErrorBody)
    )
)]
pub async fn create_inquiry(
    identity: Identity,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateInquiryRequest>,
) -> ApiResult<(StatusCode, Json<CreatedInquiry>)> {
    let user_id = user_subject(&identity)?;
    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(ApiError::InvalidRequest(
            "title and content are required".to_string(),
        ));
    }
    let inquiry_id = state.repo.create_inquiry(user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(CreatedInquiry { inquiry_id })))
}

/// list_my_inquiries
///
/// [Authenticated Route] The caller's own inquiries, newest first.
#[utoipa::path(
    get,
    path = "/api/inquiries/me",
    responses((status = 200, description = "My inquiries", body = [InquirySummary]))
)]
pub async fn list_my_inquiries(
    identity: Identity,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<InquirySummary>>> {
    let user_id = user_subject(&identity)?;
    let inquiries = state.repo.list_inquiries_for_user(user_id).await?;
    Ok(Json(inquiries))
}

/// get_my_inquiry
///
/// [Authenticated Route] One inquiry with its answer.
///
/// *Ownership*: someone else's inquiry is reported exactly like a missing one (404).
#[utoipa::path(
    get,
    path = "/api/inquiries/{id}",
    params(("id" = i64, Path, description = "Inquiry ID")),
    responses(
        (status = 200, description = "Found", body = Inquiry),
        (status = 404, description = "Not found or not yours", body = ErrorBody)
    )
)]
pub async fn get_my_inquiry(
    identity: Identity,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Inquiry>> {
    let user_id = user_subject(&identity)?;
    state
        .repo
        .get_inquiry_for_user(id, user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("inquiry"))
}

/// create_review
///
/// [Authenticated Route] Posts a review of a store on behalf of the caller.
#[utoipa::path(
    post,
    path = "/api/stores/{id}/reviews",
    params(("id" = i64, Path, description = "Store ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 400, description = "content required, rating 1-5", body = ErrorBody),
        (status = 404, description = "No such store", body = ErrorBody)
    )
)]
pub async fn create_review(
    identity: Identity,
    State(state): State<AppState>,
    ApiPath(store_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let user_id = user_subject(&identity)?;
    if payload.content.trim().is_empty() {
        return Err(ApiError::InvalidRequest("content is required".to_string()));
    }
    if !(1..=5).contains(&payload.rating) {
        return Err(ApiError::InvalidRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    let review = state
        .repo
        .create_review(store_id, user_id, payload)
        .await?
        .ok_or(ApiError::NotFound("store"))?;
    Ok((StatusCode::CREATED, Json(review)))
}

// --- Admin operations ---

/// admin_list_inquiries
///
/// [Admin Route] Every inquiry in the system, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/inquiries",
    responses(
        (status = 200, description = "All inquiries", body = [InquirySummary]),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn admin_list_inquiries(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<InquirySummary>>> {
    Ok(Json(state.repo.list_inquiries().await?))
}

/// answer_inquiry
///
/// [Admin Route] Sets or replaces the answer to an inquiry.
#[utoipa::path(
    post,
    path = "/api/admin/inquiries/{id}/answer",
    params(("id" = i64, Path, description = "Inquiry ID")),
    request_body = AnswerInquiryRequest,
    responses(
        (status = 204, description = "Answer stored"),
        (status = 400, description = "answer is required", body = ErrorBody),
        (status = 404, description = "No such inquiry", body = ErrorBody)
    )
)]
pub async fn answer_inquiry(
    identity: Identity,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<AnswerInquiryRequest>,
) -> ApiResult<StatusCode> {
    let answer = payload
        .answer
        .ok_or_else(|| ApiError::InvalidRequest("answer is required".to_string()))?;
    if !state.repo.answer_inquiry(id, answer).await? {
        return Err(ApiError::NotFound("inquiry"));
    }
    tracing::info!(inquiry_id = id, admin_id = identity.subject_id, "inquiry answered");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/admin/stores/{id}",
    params(("id" = i64, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Found", body = Store),
        (status = 404, description = "No such store", body = ErrorBody)
    )
)]
pub async fn get_store(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Store>> {
    state
        .repo
        .get_store(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("store"))
}

/// update_store
///
/// [Admin Route] Edits a store. `name` and `address` are mandatory; optional fields
/// that are omitted keep their stored value.
#[utoipa::path(
    put,
    path = "/api/admin/stores/{id}",
    params(("id" = i64, Path, description = "Store ID")),
    request_body = UpdateStoreRequest,
    responses(
        (status = 200, description = "Updated", body = Store),
        (status = 400, description = "name and address are required", body = ErrorBody),
        (status = 404, description = "No such store", body = ErrorBody)
    )
)]
pub async fn update_store(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateStoreRequest>,
) -> ApiResult<Json<Store>> {
    if payload.name.trim().is_empty() || payload.address.trim().is_empty() {
        return Err(ApiError::InvalidRequest(
            "name and address are required".to_string(),
        ));
    }
    state
        .repo
        .update_store(id, payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("store"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/stores/{id}",
    params(("id" = i64, Path, description = "Store ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such store", body = ErrorBody)
    )
)]
pub async fn delete_store(
    identity: Identity,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    if !state.repo.delete_store(id).await? {
        return Err(ApiError::NotFound("store"));
    }
    tracing::info!(store_id = id, admin_id = identity.subject_id, "store deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// route_not_found
///
/// Fallback for paths no route claims.
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("route")
}
