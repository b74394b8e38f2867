use chrono::Utc;

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{ProfilePatch, User},
};

pub async fn find_by_username(db: &DbPool, username: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, email, bio, avatar, last_login, created_at, updated_at
        FROM users
        WHERE username = ?1
        "#,
    )
    .bind(username)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_id(db: &DbPool, id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, email, bio, avatar, last_login, created_at, updated_at
        FROM users
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Usernames are unique; a duplicate surfaces as Conflict here rather than
/// as a raw database error.
pub async fn create(db: &DbPool, username: &str, password_hash: &str) -> Result<User, AppError> {
    let now = Utc::now();
    let result = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password_hash, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        RETURNING id, username, password_hash, email, bio, avatar, last_login, created_at, updated_at
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(now)
    .fetch_one(db)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(AppError::Conflict(
            format!("username '{username}' is already taken"),
        )),
        Err(err) => Err(err.into()),
    }
}

pub async fn touch_last_login(db: &DbPool, user_id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET last_login = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn update_profile(
    db: &DbPool,
    user_id: i64,
    patch: &ProfilePatch,
) -> Result<User, AppError> {
    let Some(mut user) = find_by_id(db, user_id).await? else {
        return Err(AppError::NotFound("user"));
    };
    patch.apply(&mut user);
    user.updated_at = Utc::now();

    sqlx::query("UPDATE users SET email = ?1, bio = ?2, avatar = ?3, updated_at = ?4 WHERE id = ?5")
        .bind(&user.email)
        .bind(&user.bio)
        .bind(&user.avatar)
        .bind(user.updated_at)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(user)
}

pub async fn set_password_hash(
    db: &DbPool,
    user_id: i64,
    password_hash: &str,
) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user"));
    }
    Ok(())
}
