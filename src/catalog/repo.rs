use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::repo_types::{Candidate, Catalog, Position};

pub async fn load_catalog(db: &PgPool) -> Result<Catalog, sqlx::Error> {
    // Both reads see one snapshot so candidates never reference a position
    // the first read missed.
    let mut tx = db.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let positions = sqlx::query_as::<_, Position>(
        r#"
        SELECT id, name, category, created_at
          FROM positions
         ORDER BY created_at ASC, id ASC
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;

    let candidates = sqlx::query_as::<_, Candidate>(
        r#"
        SELECT id, position_id, name, image, created_at
          FROM candidates
         ORDER BY created_at ASC, id ASC
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Catalog {
        positions,
        candidates,
    })
}

pub async fn insert_position(
    db: &PgPool,
    name: &str,
    category: &str,
) -> Result<Position, sqlx::Error> {
    sqlx::query_as::<_, Position>(
        r#"
        INSERT INTO positions (name, category)
        VALUES ($1, $2)
        RETURNING id, name, category, created_at
        "#,
    )
    .bind(name)
    .bind(category)
    .fetch_one(db)
    .await
}

pub async fn insert_candidate(
    db: &PgPool,
    position_id: Uuid,
    name: &str,
    image: Option<&str>,
) -> Result<Candidate, sqlx::Error> {
    sqlx::query_as::<_, Candidate>(
        r#"
        INSERT INTO candidates (position_id, name, image)
        VALUES ($1, $2, $3)
        RETURNING id, position_id, name, image, created_at
        "#,
    )
    .bind(position_id)
    .bind(name)
    .bind(image) // Option<&str> -> NULL allowed
    .fetch_one(db)
    .await
}
