use sqlx::PgPool;
use uuid::Uuid;

use crate::identity::repo_types::{NewUser, User};

impl User {
    /// Find a user by login identifier.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, credential, has_voted, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, credential, has_voted, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Insert a new user. A taken identifier surfaces as a unique violation.
    pub async fn create(db: &PgPool, new: &NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, credential, has_voted)
            VALUES ($1, $2, $3, FALSE)
            RETURNING id, name, email, credential, has_voted, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.credential)
        .fetch_one(db)
        .await
    }

    pub async fn list(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, credential, has_voted, created_at
            FROM users
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(db)
        .await
    }
}
