use chrono::Utc;

use crate::{db::DbPool, error::AppError, models::visit::Visit};

pub async fn log(db: &DbPool, page: &str) -> Result<Visit, AppError> {
    let visit = sqlx::query_as::<_, Visit>(
        r#"
        INSERT INTO visits (page, created_at)
        VALUES (?1, ?2)
        RETURNING id, page, created_at
        "#,
    )
    .bind(page)
    .bind(Utc::now())
    .fetch_one(db)
    .await?;
    Ok(visit)
}

pub async fn count(db: &DbPool) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM visits")
        .fetch_one(db)
        .await?;
    Ok(count)
}

pub async fn recent(db: &DbPool, limit: i64) -> Result<Vec<Visit>, AppError> {
    let visits = sqlx::query_as::<_, Visit>(
        r#"
        SELECT id, page, created_at
        FROM visits
        ORDER BY created_at DESC, id DESC
        LIMIT ?1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(visits)
}
