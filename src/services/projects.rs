use chrono::Utc;

use crate::{
    db::DbPool,
    error::AppError,
    models::project::{
        NewProject, Project, ProjectPatch, DEFAULT_CATEGORY, DEFAULT_IMAGE, DEFAULT_LINK,
    },
};

pub async fn list_all(db: &DbPool) -> Result<Vec<Project>, AppError> {
    let projects = sqlx::query_as::<_, Project>(
        r#"
        SELECT id, title, description, link, image, category, created_at, updated_at
        FROM projects
        ORDER BY id
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(projects)
}

pub async fn get(db: &DbPool, id: i64) -> Result<Option<Project>, AppError> {
    let project = sqlx::query_as::<_, Project>(
        r#"
        SELECT id, title, description, link, image, category, created_at, updated_at
        FROM projects
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(project)
}

pub async fn create(db: &DbPool, new: &NewProject) -> Result<Project, AppError> {
    let title = new.title.trim();
    let description = new.description.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }
    if description.is_empty() {
        return Err(AppError::Validation("description is required".into()));
    }

    let link = new.link.as_deref().unwrap_or(DEFAULT_LINK);
    let image = new.image.as_deref().unwrap_or(DEFAULT_IMAGE);
    let category = new.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
    let now = Utc::now();

    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (title, description, link, image, category, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        RETURNING id, title, description, link, image, category, created_at, updated_at
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(link)
    .bind(image)
    .bind(category)
    .bind(now)
    .fetch_one(db)
    .await?;
    Ok(project)
}

pub async fn update(db: &DbPool, id: i64, patch: &ProjectPatch) -> Result<Project, AppError> {
    let Some(mut project) = get(db, id).await? else {
        return Err(AppError::NotFound("project"));
    };
    patch.apply(&mut project);
    project.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE projects
        SET title = ?1, description = ?2, link = ?3, image = ?4, category = ?5, updated_at = ?6
        WHERE id = ?7
        "#,
    )
    .bind(&project.title)
    .bind(&project.description)
    .bind(&project.link)
    .bind(&project.image)
    .bind(&project.category)
    .bind(project.updated_at)
    .bind(id)
    .execute(db)
    .await?;
    Ok(project)
}

pub async fn delete(db: &DbPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("project"));
    }
    Ok(())
}

pub async fn count(db: &DbPool) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
        .fetch_one(db)
        .await?;
    Ok(count)
}
