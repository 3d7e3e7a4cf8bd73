use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::ballot::repo_types::Vote;

/// Insert the (user, position) vote, or point the existing row at a new
/// candidate and refresh its timestamp. The row keeps its id.
pub async fn upsert_vote_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    position_id: Uuid,
    candidate_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO votes (user_id, position_id, candidate_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, position_id)
        DO UPDATE SET candidate_id = EXCLUDED.candidate_id,
                      voted_at = now()
        "#,
    )
    .bind(user_id)
    .bind(position_id)
    .bind(candidate_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Flip `has_voted`. Returns false when the user row is gone.
pub async fn mark_voted_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        r#"
        UPDATE users
           SET has_voted = TRUE
         WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(res.rows_affected() == 1)
}

// ---- Queries ----

pub async fn list_votes_by_user(db: &PgPool, user_id: Uuid) -> Result<Vec<Vote>, sqlx::Error> {
    sqlx::query_as::<_, Vote>(
        r#"
        SELECT id, user_id, position_id, candidate_id, voted_at
          FROM votes
         WHERE user_id = $1
         ORDER BY position_id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Every vote row. Used to audit the one-row-per-slot rule.
pub async fn list_all_votes(db: &PgPool) -> Result<Vec<Vote>, sqlx::Error> {
    sqlx::query_as::<_, Vote>(
        r#"
        SELECT id, user_id, position_id, candidate_id, voted_at
          FROM votes
         ORDER BY user_id ASC, position_id ASC
        "#,
    )
    .fetch_all(db)
    .await
}
