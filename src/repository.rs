use crate::models::{
    AdminRecord, CreateInquiryRequest, CreateReviewRequest, Inquiry, InquirySummary, NewUser,
    Review, SignupProfile, Store, UpdateStoreRequest, UserRecord,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// RepositoryError
///
/// Any failure to reach or query the backing store. Surfaced to callers as a
/// dependency failure, never as a credential or token problem.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// CredentialStore
///
/// The Credential Store Adapter: looks up a principal by login identifier in exactly one
/// namespace. Pure reads, no logic of its own.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user(&self, login_id: &str) -> RepoResult<Option<UserRecord>>;
    async fn find_admin(&self, login_id: &str) -> RepoResult<Option<AdminRecord>>;
}

/// Repository Trait
///
/// Persistence contract of the wrapped operations. Identity always arrives as an argument
/// taken from the verified request context; the repository never inspects headers.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: CredentialStore {
    // --- Signup ---
    // Writes the profile row and the users row together. None when the login_id or the
    // student_id is already registered; nothing is written in that case.
    async fn create_user(&self, user: NewUser) -> RepoResult<Option<UserRecord>>;

    // --- Inquiries ---
    async fn create_inquiry(&self, user_id: i64, req: CreateInquiryRequest) -> RepoResult<i64>;
    // Newest first.
    async fn list_inquiries_for_user(&self, user_id: i64) -> RepoResult<Vec<InquirySummary>>;
    // Owner-Only: None when the inquiry does not exist or belongs to someone else.
    async fn get_inquiry_for_user(&self, inquiry_id: i64, user_id: i64)
    -> RepoResult<Option<Inquiry>>;
    async fn list_inquiries(&self) -> RepoResult<Vec<InquirySummary>>;
    // Returns false when no inquiry has this id.
    async fn answer_inquiry(&self, inquiry_id: i64, answer: String) -> RepoResult<bool>;

    // --- Reviews ---
    // None when the store does not exist.
    async fn create_review(
        &self,
        store_id: i64,
        user_id: i64,
        req: CreateReviewRequest,
    ) -> RepoResult<Option<Review>>;

    // --- Store administration ---
    async fn get_store(&self, store_id: i64) -> RepoResult<Option<Store>>;
    // Uses COALESCE so omitted optional fields keep their value.
    async fn update_store(&self, store_id: i64, req: UpdateStoreRequest)
    -> RepoResult<Option<Store>>;
    async fn delete_store(&self, store_id: i64) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation backed by PostgreSQL (see `migrations/`).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PostgresRepository {
    async fn find_user(&self, login_id: &str) -> RepoResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"SELECT user_id, login_id, name, pw, student_id, provider_id
               FROM users
               WHERE login_id = $1"#,
        )
        .bind(login_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_admin(&self, login_id: &str) -> RepoResult<Option<AdminRecord>> {
        let admin = sqlx::query_as::<_, AdminRecord>(
            r#"SELECT admin_id, login_id, admin_name, pw
               FROM site_admins
               WHERE login_id = $1"#,
        )
        .bind(login_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<Option<UserRecord>> {
        // Every early return drops `tx`, which rolls the transaction back.
        let mut tx = self.pool.begin().await?;

        let student_id = match &user.profile {
            SignupProfile::Student { student_id, .. } => Some(student_id.as_str()),
            SignupProfile::Provider { .. } => None,
        };
        let taken = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (
                   SELECT 1 FROM users
                   WHERE login_id = $1 OR ($2::TEXT IS NOT NULL AND student_id = $2)
               )"#,
        )
        .bind(&user.login_id)
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await?;
        if taken {
            return Ok(None);
        }

        let provider_id = match &user.profile {
            SignupProfile::Student { student_id, school } => {
                let inserted = sqlx::query(
                    r#"INSERT INTO students (student_id, school)
                       VALUES ($1, $2)
                       ON CONFLICT (student_id) DO NOTHING"#,
                )
                .bind(student_id)
                .bind(school)
                .execute(&mut *tx)
                .await?;
                if inserted.rows_affected() == 0 {
                    return Ok(None);
                }
                None
            }
            SignupProfile::Provider {
                store_name,
                business_number,
            } => {
                let provider_id = sqlx::query_scalar::<_, i64>(
                    r#"INSERT INTO providers (store_name, business_number)
                       VALUES ($1, $2)
                       RETURNING provider_id"#,
                )
                .bind(store_name)
                .bind(business_number)
                .fetch_one(&mut *tx)
                .await?;
                Some(provider_id)
            }
        };

        // ON CONFLICT covers a concurrent signup that took the login_id after the check.
        let created = sqlx::query_as::<_, UserRecord>(
            r#"INSERT INTO users (login_id, pw, name, student_id, provider_id)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (login_id) DO NOTHING
               RETURNING user_id, login_id, name, pw, student_id, provider_id"#,
        )
        .bind(&user.login_id)
        .bind(&user.secret)
        .bind(&user.display_name)
        .bind(student_id)
        .bind(provider_id)
        .fetch_optional(&mut *tx)
        .await?;

        if created.is_some() {
            tx.commit().await?;
        }
        Ok(created)
    }

    async fn create_inquiry(&self, user_id: i64, req: CreateInquiryRequest) -> RepoResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO inquiries (user_id, title, writer, field, content)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING inquiry_id"#,
        )
        .bind(user_id)
        .bind(req.title)
        .bind(req.writer)
        .bind(req.field)
        .bind(req.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list_inquiries_for_user(&self, user_id: i64) -> RepoResult<Vec<InquirySummary>> {
        let rows = sqlx::query_as::<_, InquirySummary>(
            r#"SELECT inquiry_id, title, writer, field, answer, created_at
               FROM inquiries
               WHERE user_id = $1
               ORDER BY created_at DESC, inquiry_id DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_inquiry_for_user(
        &self,
        inquiry_id: i64,
        user_id: i64,
    ) -> RepoResult<Option<Inquiry>> {
        let row = sqlx::query_as::<_, Inquiry>(
            r#"SELECT inquiry_id, user_id, title, writer, field, content, answer, created_at
               FROM inquiries
               WHERE inquiry_id = $1 AND user_id = $2"#,
        )
        .bind(inquiry_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_inquiries(&self) -> RepoResult<Vec<InquirySummary>> {
        let rows = sqlx::query_as::<_, InquirySummary>(
            r#"SELECT inquiry_id, title, writer, field, answer, created_at
               FROM inquiries
               ORDER BY created_at DESC, inquiry_id DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn answer_inquiry(&self, inquiry_id: i64, answer: String) -> RepoResult<bool> {
        let result = sqlx::query(r#"UPDATE inquiries SET answer = $1 WHERE inquiry_id = $2"#)
            .bind(answer)
            .bind(inquiry_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_review(
        &self,
        store_id: i64,
        user_id: i64,
        req: CreateReviewRequest,
    ) -> RepoResult<Option<Review>> {
        // The EXISTS guard turns a missing store into "no row" instead of an FK violation.
        let review = sqlx::query_as::<_, Review>(
            r#"INSERT INTO reviews (store_id, user_id, content, rating)
               SELECT $1, $2, $3, $4
               WHERE EXISTS (SELECT 1 FROM stores WHERE store_id = $1)
               RETURNING review_id, store_id, user_id, content, rating, created_at"#,
        )
        .bind(store_id)
        .bind(user_id)
        .bind(req.content)
        .bind(req.rating)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    async fn get_store(&self, store_id: i64) -> RepoResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>(
            r#"SELECT store_id, name, address, open_time, close_time, phone, distance_km
               FROM stores
               WHERE store_id = $1"#,
        )
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(store)
    }

    async fn update_store(
        &self,
        store_id: i64,
        req: UpdateStoreRequest,
    ) -> RepoResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>(
            r#"UPDATE stores
               SET name = $2,
                   address = $3,
                   open_time = COALESCE($4, open_time),
                   close_time = COALESCE($5, close_time),
                   phone = COALESCE($6, phone),
                   distance_km = COALESCE($7, distance_km)
               WHERE store_id = $1
               RETURNING store_id, name, address, open_time, close_time, phone, distance_km"#,
        )
        .bind(store_id)
        .bind(req.name)
        .bind(req.address)
        .bind(req.open_time)
        .bind(req.close_time)
        .bind(req.phone)
        .bind(req.distance_km)
        .fetch_optional(&self.pool)
        .await?;
        Ok(store)
    }

    async fn delete_store(&self, store_id: i64) -> RepoResult<bool> {
        let result = sqlx::query(r#"DELETE FROM stores WHERE store_id = $1"#)
            .bind(store_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- The Mock Implementation (For Tests) ---

#[derive(Default)]
struct MockTables {
    users: Vec<UserRecord>,
    admins: Vec<AdminRecord>,
    inquiries: Vec<Inquiry>,
    reviews: Vec<Review>,
    stores: Vec<Store>,
    next_id: i64,
}

impl MockTables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// MockRepository
///
/// In-memory implementation used by the test suites, so that login, the gate and the
/// wrapped operations can be exercised without a Postgres instance.
#[derive(Default)]
pub struct MockRepository {
    /// When true, every operation fails as if the database were unreachable.
    pub should_fail: bool,
    tables: Mutex<MockTables>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.tables.get_mut().users.push(user);
        self
    }

    pub fn with_admin(mut self, admin: AdminRecord) -> Self {
        self.tables.get_mut().admins.push(admin);
        self
    }

    pub fn with_store(mut self, store: Store) -> Self {
        self.tables.get_mut().stores.push(store);
        self
    }

    fn check(&self) -> RepoResult<()> {
        if self.should_fail {
            return Err(RepositoryError::Unavailable(
                "mock repository: simulated outage".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MockRepository {
    async fn find_user(&self, login_id: &str) -> RepoResult<Option<UserRecord>> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.login_id == login_id).cloned())
    }

    async fn find_admin(&self, login_id: &str) -> RepoResult<Option<AdminRecord>> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.admins.iter().find(|a| a.login_id == login_id).cloned())
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<Option<UserRecord>> {
        self.check()?;
        let mut tables = self.tables.lock().await;

        let student_id = match &user.profile {
            SignupProfile::Student { student_id, .. } => Some(student_id.clone()),
            SignupProfile::Provider { .. } => None,
        };
        let taken = tables.users.iter().any(|u| {
            u.login_id == user.login_id || (student_id.is_some() && u.student_id == student_id)
        });
        if taken {
            return Ok(None);
        }

        let provider_id = match user.profile {
            SignupProfile::Student { .. } => None,
            SignupProfile::Provider { .. } => Some(
                tables.users.iter().filter_map(|u| u.provider_id).max().unwrap_or(0) + 1,
            ),
        };
        let created = UserRecord {
            user_id: tables.users.iter().map(|u| u.user_id).max().unwrap_or(0) + 1,
            login_id: user.login_id,
            display_name: user.display_name,
            stored_secret: user.secret,
            student_id,
            provider_id,
        };
        tables.users.push(created.clone());
        Ok(Some(created))
    }

    async fn create_inquiry(&self, user_id: i64, req: CreateInquiryRequest) -> RepoResult<i64> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let inquiry_id = tables.next_id();
        tables.inquiries.push(Inquiry {
            inquiry_id,
            user_id,
            title: req.title,
            writer: req.writer,
            field: req.field,
            content: req.content,
            answer: None,
            created_at: Utc::now(),
        });
        Ok(inquiry_id)
    }

    async fn list_inquiries_for_user(&self, user_id: i64) -> RepoResult<Vec<InquirySummary>> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .inquiries
            .iter()
            .rev()
            .filter(|i| i.user_id == user_id)
            .map(InquirySummary::from)
            .collect())
    }

    async fn get_inquiry_for_user(
        &self,
        inquiry_id: i64,
        user_id: i64,
    ) -> RepoResult<Option<Inquiry>> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .inquiries
            .iter()
            .find(|i| i.inquiry_id == inquiry_id && i.user_id == user_id)
            .cloned())
    }

    async fn list_inquiries(&self) -> RepoResult<Vec<InquirySummary>> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.inquiries.iter().rev().map(InquirySummary::from).collect())
    }

    async fn answer_inquiry(&self, inquiry_id: i64, answer: String) -> RepoResult<bool> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        match tables.inquiries.iter_mut().find(|i| i.inquiry_id == inquiry_id) {
            Some(inquiry) => {
                inquiry.answer = Some(answer);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_review(
        &self,
        store_id: i64,
        user_id: i64,
        req: CreateReviewRequest,
    ) -> RepoResult<Option<Review>> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        if !tables.stores.iter().any(|s| s.store_id == store_id) {
            return Ok(None);
        }
        let review = Review {
            review_id: tables.next_id(),
            store_id,
            user_id,
            content: req.content,
            rating: req.rating,
            created_at: Utc::now(),
        };
        tables.reviews.push(review.clone());
        Ok(Some(review))
    }

    async fn get_store(&self, store_id: i64) -> RepoResult<Option<Store>> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.stores.iter().find(|s| s.store_id == store_id).cloned())
    }

    async fn update_store(
        &self,
        store_id: i64,
        req: UpdateStoreRequest,
    ) -> RepoResult<Option<Store>> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let Some(store) = tables.stores.iter_mut().find(|s| s.store_id == store_id) else {
            return Ok(None);
        };
        store.name = req.name;
        store.address = req.address;
        store.open_time = req.open_time.or(store.open_time);
        store.close_time = req.close_time.or(store.close_time);
        store.phone = req.phone.or(store.phone.take());
        store.distance_km = req.distance_km.or(store.distance_km);
        Ok(Some(store.clone()))
    }

    async fn delete_store(&self, store_id: i64) -> RepoResult<bool> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let before = tables.stores.len();
        tables.stores.retain(|s| s.store_id != store_id);
        Ok(tables.stores.len() < before)
    }
}
