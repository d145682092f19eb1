use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Principals (Credential Store rows) ---

/// Namespace
///
/// The login entry point a credential was submitted through. The two namespaces are
/// disjoint: a lookup consults exactly one of the `users` or `site_admins` tables, and the
/// namespace travels with every token so the two id spaces never mix downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Namespace {
    User,
    Admin,
}

/// Role
///
/// The role claim carried by a token. Only `Admin` satisfies an admin capability,
/// and it is produced only from the exact string "admin".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Student,
    Provider,
    Admin,
    #[serde(rename = "")]
    Unset,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Provider => "provider",
            Role::Admin => "admin",
            Role::Unset => "",
        }
    }

    /// from_claim
    ///
    /// Maps a raw role claim back to a Role. Matching is exact and case-sensitive;
    /// anything unrecognised is treated as unset rather than rejected.
    pub fn from_claim(raw: &str) -> Self {
        match raw {
            "admin" => Role::Admin,
            "student" => Role::Student,
            "provider" => Role::Provider,
            _ => Role::Unset,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UserRecord
///
/// A row of the `users` table. Students carry a `student_id`, store owners a `provider_id`;
/// a row with neither is an administrative account that must log in through the admin namespace.
#[derive(Clone, FromRow)]
pub struct UserRecord {
    pub user_id: i64,
    pub login_id: String,
    #[sqlx(rename = "name")]
    pub display_name: String,
    // Stored in plaintext by the legacy schema. Compared, never returned.
    #[sqlx(rename = "pw")]
    pub stored_secret: String,
    pub student_id: Option<String>,
    pub provider_id: Option<i64>,
}

/// AdminRecord
///
/// A row of the `site_admins` table.
#[derive(Clone, FromRow)]
pub struct AdminRecord {
    pub admin_id: i64,
    pub login_id: String,
    #[sqlx(rename = "admin_name")]
    pub display_name: String,
    #[sqlx(rename = "pw")]
    pub stored_secret: String,
}

// Debug output of principal rows must never contain the stored secret.
impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("user_id", &self.user_id)
            .field("login_id", &self.login_id)
            .field("display_name", &self.display_name)
            .field("stored_secret", &"<redacted>")
            .field("student_id", &self.student_id)
            .field("provider_id", &self.provider_id)
            .finish()
    }
}

impl fmt::Debug for AdminRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminRecord")
            .field("admin_id", &self.admin_id)
            .field("login_id", &self.login_id)
            .field("display_name", &self.display_name)
            .field("stored_secret", &"<redacted>")
            .finish()
    }
}

/// Principal
///
/// An identity subject to authentication. The variants are disjoint.
#[derive(Debug, Clone)]
pub enum Principal {
    User(UserRecord),
    Admin(AdminRecord),
}

impl Principal {
    pub fn stored_secret(&self) -> &str {
        match self {
            Principal::User(user) => &user.stored_secret,
            Principal::Admin(admin) => &admin.stored_secret,
        }
    }
}

// --- Authentication payloads ---

/// LoginRequest
///
/// The credential pair submitted to either login entry point. Fields are optional on the
/// wire so that an absent value is reported as a missing credential rather than a parse error.
/// `pw` is accepted as an alias for `secret` to match the legacy login form.
#[derive(Debug, Clone, Default, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub login_id: Option<String>,
    #[serde(default, alias = "pw")]
    pub secret: Option<String>,
}

/// VerifiedIdentity
///
/// The public identity fields of a principal whose secret matched. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject_id: i64,
    pub login_id: String,
    pub display_name: String,
    pub role: Role,
    pub namespace: Namespace,
}

/// Identity
///
/// The verified caller attached to the request context by the authorization gate.
/// Wrapped operations read who is calling from here and nowhere else.
///
/// `subject_id` is only unique within `namespace`: user 42 and admin 42 are different
/// principals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Identity {
    pub subject_id: i64,
    pub display_name: String,
    pub role: Role,
    pub namespace: Namespace,
}

impl From<&VerifiedIdentity> for Identity {
    fn from(verified: &VerifiedIdentity) -> Self {
        Self {
            subject_id: verified.subject_id,
            display_name: verified.display_name.clone(),
            role: verified.role,
            namespace: verified.namespace,
        }
    }
}

/// LoginResponse
///
/// Returned by both login entry points on success.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
    pub identity: Identity,
}

// --- Signup ---

/// SignupRequest
///
/// The signup form. Every field is optional on the wire so that the handler can report
/// exactly which one is missing. `type` selects the account kind (`student` or `provider`)
/// and decides which of the profile fields are required.
#[derive(Debug, Clone, Default, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignupRequest {
    #[serde(default)]
    pub login_id: Option<String>,
    #[serde(default, alias = "pw")]
    pub secret: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub account_type: Option<String>,
    // Students
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    // Store owners
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub business_number: Option<String>,
}

/// The profile row created alongside the `users` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupProfile {
    Student {
        student_id: String,
        school: String,
    },
    Provider {
        store_name: String,
        business_number: String,
    },
}

/// NewUser
///
/// A validated signup, ready to be written.
#[derive(Clone)]
pub struct NewUser {
    pub login_id: String,
    pub secret: String,
    pub display_name: String,
    pub profile: SignupProfile,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("login_id", &self.login_id)
            .field("secret", &"<redacted>")
            .field("display_name", &self.display_name)
            .field("profile", &self.profile)
            .finish()
    }
}

// --- Inquiries ---

/// Inquiry
///
/// A customer inquiry with its (optional) administrator answer.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Inquiry {
    pub inquiry_id: i64,
    pub user_id: i64,
    pub title: String,
    pub writer: Option<String>,
    pub field: Option<String>,
    pub content: String,
    pub answer: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// InquirySummary
///
/// The list view of an inquiry (no body text).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct InquirySummary {
    pub inquiry_id: i64,
    pub title: String,
    pub writer: Option<String>,
    pub field: Option<String>,
    pub answer: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<&Inquiry> for InquirySummary {
    fn from(inquiry: &Inquiry) -> Self {
        Self {
            inquiry_id: inquiry.inquiry_id,
            title: inquiry.title.clone(),
            writer: inquiry.writer.clone(),
            field: inquiry.field.clone(),
            answer: inquiry.answer.clone(),
            created_at: inquiry.created_at,
        }
    }
}

/// CreateInquiryRequest
///
/// Input payload for POST /api/inquiries. The owner is taken from the caller's identity;
/// there is no `user_id` field.
#[derive(Debug, Clone, Default, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateInquiryRequest {
    #[serde(default)]
    pub title: String,
    pub writer: Option<String>,
    pub field: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatedInquiry {
    pub inquiry_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AnswerInquiryRequest {
    pub answer: Option<String>,
}

// --- Stores & Reviews ---

/// Store
///
/// A row of the `stores` table as edited from the admin console.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Store {
    pub store_id: i64,
    pub name: String,
    pub address: String,
    #[serde(rename = "open")]
    #[ts(type = "string | null")]
    pub open_time: Option<NaiveTime>,
    #[serde(rename = "close")]
    #[ts(type = "string | null")]
    pub close_time: Option<NaiveTime>,
    pub phone: Option<String>,
    #[serde(rename = "distance")]
    pub distance_km: Option<f64>,
}

/// UpdateStoreRequest
///
/// Input payload for PUT /api/admin/stores/{id}. `name` and `address` are required;
/// omitted optional fields keep their stored value. Wire names match the admin console
/// (`open`, `close`, `distance`).
#[derive(Debug, Clone, Default, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateStoreRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, rename = "open")]
    #[ts(type = "string | null")]
    pub open_time: Option<NaiveTime>,
    #[serde(default, rename = "close")]
    #[ts(type = "string | null")]
    pub close_time: Option<NaiveTime>,
    pub phone: Option<String>,
    #[serde(default, rename = "distance")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Review {
    pub review_id: i64,
    pub store_id: i64,
    pub user_id: i64,
    pub content: String,
    pub rating: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateReviewRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub rating: i32,
}
