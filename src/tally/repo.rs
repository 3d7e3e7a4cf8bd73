use sqlx::PgPool;

use crate::tally::repo_types::TallyRow;

/// One statement, so the counts come from a single committed snapshot.
/// Candidates without votes come back with 0 through the LEFT JOIN.
pub async fn count_votes(db: &PgPool) -> Result<Vec<TallyRow>, sqlx::Error> {
    sqlx::query_as::<_, TallyRow>(
        r#"
        SELECT p.id   AS position_id,
               p.name AS position_name,
               c.id   AS candidate_id,
               c.name AS candidate_name,
               COUNT(v.id) AS votes
          FROM positions p
          JOIN candidates c ON c.position_id = p.id
          LEFT JOIN votes v ON v.position_id = p.id AND v.candidate_id = c.id
         GROUP BY p.id, p.name, p.created_at, c.id, c.name, c.created_at
         ORDER BY p.created_at ASC, p.id ASC, c.created_at ASC, c.id ASC
        "#,
    )
    .fetch_all(db)
    .await
}
