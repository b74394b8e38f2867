use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_LINK: &str = "#";
pub const DEFAULT_IMAGE: &str = "https://picsum.photos/seed/project/300/200";
pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub link: String,
    pub image: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a project. Optional ones fall back to
/// placeholder values.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub link: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
}

/// Partial project update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
}

impl ProjectPatch {
    pub fn apply(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(link) = &self.link {
            project.link = link.clone();
        }
        if let Some(image) = &self.image {
            project.image = image.clone();
        }
        if let Some(category) = &self.category {
            project.category = category.clone();
        }
    }
}
