use crate::{
    error::AppError,
    models::{Feedback, NewUser, User},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

/// Repository Trait
///
/// The persistence contract shared by the credential store and the feedback store.
/// Handlers and the auth service only ever see `Arc<dyn Repository>`, so the Postgres
/// backend and the in-memory backend are interchangeable.
///
/// Every method is one atomic store mutation or read.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError>;
    // Fails with `DuplicateKey` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    // Cascades to every feedback row owned by the user. False if no such user.
    async fn delete_user(&self, username: &str) -> Result<bool, AppError>;

    // --- Feedback Store ---
    async fn get_feedback(&self, id: i64) -> Result<Option<Feedback>, AppError>;
    // Ascending id order.
    async fn get_user_feedback(&self, username: &str) -> Result<Vec<Feedback>, AppError>;
    // Fails with `NotFound` when the owner does not exist.
    async fn create_feedback(
        &self,
        username: &str,
        title: &str,
        content: &str,
    ) -> Result<Feedback, AppError>;
    async fn update_feedback(
        &self,
        id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<Feedback>, AppError>;
    async fn delete_feedback(&self, id: i64) -> Result<bool, AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Referential integrity and
/// the cascade live in the schema (see `migrations/`).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Translates constraint violations into domain errors; everything else stays a
/// database error.
fn map_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let field = match db.constraint() {
                Some("users_email_key") => "email",
                _ => "username",
            };
            return AppError::DuplicateKey { field };
        }
        if db.is_foreign_key_violation() {
            return AppError::NotFound;
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT username, password, email, first_name, last_name FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// A single INSERT; the primary key and the `users_email_key` constraint decide
    /// uniqueness so two concurrent registrations can't both succeed.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password, email, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING username, password, email, first_name, last_name
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn delete_user(&self, username: &str) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_feedback(&self, id: i64) -> Result<Option<Feedback>, AppError> {
        let feedback = sqlx::query_as::<_, Feedback>(
            "SELECT id, title, content, username FROM feedback WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feedback)
    }

    async fn get_user_feedback(&self, username: &str) -> Result<Vec<Feedback>, AppError> {
        let feedback = sqlx::query_as::<_, Feedback>(
            "SELECT id, title, content, username FROM feedback WHERE username = $1 ORDER BY id ASC",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(feedback)
    }

    async fn create_feedback(
        &self,
        username: &str,
        title: &str,
        content: &str,
    ) -> Result<Feedback, AppError> {
        sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (title, content, username)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, username
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_feedback(
        &self,
        id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<Feedback>, AppError> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            UPDATE feedback SET title = $2, content = $3
            WHERE id = $1
            RETURNING id, title, content, username
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feedback)
    }

    async fn delete_feedback(&self, id: i64) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM feedback WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

// --- In-Memory Implementation ---

#[derive(Default)]
struct Tables {
    users: BTreeMap<String, User>,
    feedback: BTreeMap<i64, Feedback>,
    next_feedback_id: i64,
}

/// InMemoryRepository
///
/// A `Repository` kept in process memory, used for local runs without `DATABASE_URL`
/// and by the test suite. Both tables sit behind one lock, which gives every method
/// the same all-or-nothing behaviour as a single SQL statement, including the
/// username/email uniqueness and the cascade on user deletion.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // Every mutation below is a single insert/remove pass, so a poisoned lock
        // still guards consistent maps.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.get(username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.lock();

        if tables.users.contains_key(&user.username) {
            return Err(AppError::DuplicateKey { field: "username" });
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::DuplicateKey { field: "email" });
        }

        let created = User {
            username: user.username,
            password: user.password_hash,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        };
        tables.users.insert(created.username.clone(), created.clone());
        Ok(created)
    }

    async fn delete_user(&self, username: &str) -> Result<bool, AppError> {
        let mut tables = self.lock();
        if tables.users.remove(username).is_none() {
            return Ok(false);
        }
        tables.feedback.retain(|_, f| f.username != username);
        Ok(true)
    }

    async fn get_feedback(&self, id: i64) -> Result<Option<Feedback>, AppError> {
        Ok(self.lock().feedback.get(&id).cloned())
    }

    async fn get_user_feedback(&self, username: &str) -> Result<Vec<Feedback>, AppError> {
        Ok(self
            .lock()
            .feedback
            .values()
            .filter(|f| f.username == username)
            .cloned()
            .collect())
    }

    async fn create_feedback(
        &self,
        username: &str,
        title: &str,
        content: &str,
    ) -> Result<Feedback, AppError> {
        let mut tables = self.lock();
        if !tables.users.contains_key(username) {
            return Err(AppError::NotFound);
        }

        tables.next_feedback_id += 1;
        let feedback = Feedback {
            id: tables.next_feedback_id,
            title: title.to_string(),
            content: content.to_string(),
            username: username.to_string(),
        };
        tables.feedback.insert(feedback.id, feedback.clone());
        Ok(feedback)
    }

    async fn update_feedback(
        &self,
        id: i64,
        title: &str,
        content: &str,
    ) -> Result<Option<Feedback>, AppError> {
        let mut tables = self.lock();
        Ok(tables.feedback.get_mut(&id).map(|f| {
            f.title = title.to_string();
            f.content = content.to_string();
            f.clone()
        }))
    }

    async fn delete_feedback(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.lock().feedback.remove(&id).is_some())
    }
}
