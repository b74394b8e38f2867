use tracing::info;

use crate::{
    auth,
    db::DbPool,
    error::AppError,
    models::project::NewProject,
    services::{projects, users},
};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "li201338";

/// No migration tooling here; the schema is small enough to create in place.
pub async fn ensure_schema(db: &DbPool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            email TEXT,
            bio TEXT,
            avatar TEXT,
            last_login TIMESTAMP,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            link TEXT NOT NULL,
            image TEXT NOT NULL,
            category TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS visits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            page TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(db)
    .await?;

    Ok(())
}

/// Idempotent: existing rows are checked before anything is inserted.
pub async fn seed(db: &DbPool) -> Result<(), AppError> {
    if users::find_by_username(db, DEFAULT_ADMIN_USERNAME)
        .await?
        .is_none()
    {
        let hash = auth::hash_password(DEFAULT_ADMIN_PASSWORD)?;
        users::create(db, DEFAULT_ADMIN_USERNAME, &hash).await?;
        info!("seeded default admin account");
    }

    if projects::count(db).await? == 0 {
        for seed in example_projects() {
            projects::create(db, &seed).await?;
        }
        info!("seeded example projects");
    }

    Ok(())
}

fn example_projects() -> Vec<NewProject> {
    vec![
        NewProject {
            title: "Personal Blog".into(),
            description: "A personal publishing and showcase platform".into(),
            link: None,
            image: Some("https://picsum.photos/seed/project1/300/200".into()),
            category: Some("web".into()),
        },
        NewProject {
            title: "Task Manager".into(),
            description: "A small tool for keeping track of daily tasks".into(),
            link: None,
            image: Some("https://picsum.photos/seed/project2/300/200".into()),
            category: Some("tools".into()),
        },
        NewProject {
            title: "Photo Gallery".into(),
            description: "An image gallery with albums and tags".into(),
            link: None,
            image: Some("https://picsum.photos/seed/project3/300/200".into()),
            category: Some("web".into()),
        },
    ]
}
