use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::error::StoreError;

/// Unique partial index that allows a single admin row.
pub const SINGLE_ADMIN_INDEX: &str = "users_single_admin";

/// Persistent credential store.
///
/// `insert` is the authority for both the unique email and the single-admin
/// rule; callers may pre-check for a friendlier message but must not rely on it.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn admin_exists(&self) -> Result<bool, StoreError>;
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, role, first_name, last_name, phone_number, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn admin_exists(&self) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')"#)
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, role, first_name, last_name, phone_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, password_hash, role, first_name, last_name, phone_number, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .fetch_one(&self.db)
        .await
        .map_err(classify_insert_error)?;
        Ok(created)
    }
}

fn classify_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return if db_err.constraint() == Some(SINGLE_ADMIN_INDEX) {
                StoreError::AdminExists
            } else {
                StoreError::DuplicateEmail
            };
        }
    }
    StoreError::Database(err)
}
