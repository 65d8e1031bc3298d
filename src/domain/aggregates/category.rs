//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::slugify;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub icon: Option<String>,
    pub image: Option<String>,
    pub banner_image: Option<String>,
    pub status: CategoryStatus,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus { #[default] Active, Inactive }

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub parent_id: Option<Uuid>,
    pub icon: Option<String>,
    pub image: Option<String>,
    pub banner_image: Option<String>,
    pub status: Option<CategoryStatus>,
    #[serde(default)]
    pub sort_order: i32,
}

impl CategoryDraft {
    fn resolved_slug(&self) -> Result<String, CategoryError> {
        let slug = match self.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => slugify(s),
            None => slugify(&self.name),
        };
        if slug.is_empty() { Err(CategoryError::MissingName) } else { Ok(slug) }
    }
}

impl Category {
    pub fn create(draft: CategoryDraft) -> Result<Self, CategoryError> {
        if draft.name.trim().is_empty() { return Err(CategoryError::MissingName); }
        let slug = draft.resolved_slug()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), name: draft.name.trim().to_string(), description: draft.description, slug,
            parent_id: draft.parent_id, icon: draft.icon, image: draft.image, banner_image: draft.banner_image,
            status: draft.status.unwrap_or_default(), sort_order: draft.sort_order, created_at: now, updated_at: now,
        })
    }

    pub fn update(&mut self, draft: CategoryDraft) -> Result<(), CategoryError> {
        if draft.name.trim().is_empty() { return Err(CategoryError::MissingName); }
        if draft.parent_id == Some(self.id) { return Err(CategoryError::SelfParent); }
        self.slug = draft.resolved_slug()?;
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        self.parent_id = draft.parent_id;
        self.icon = draft.icon;
        self.image = draft.image;
        self.banner_image = draft.banner_image;
        if let Some(status) = draft.status { self.status = status; }
        self.sort_order = draft.sort_order;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    #[error("Category name is required")]
    MissingName,
    #[error("A category cannot be its own parent")]
    SelfParent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_defaults_to_name() {
        let c = Category::create(CategoryDraft { name: "Home Decor".into(), ..Default::default() }).unwrap();
        assert_eq!(c.slug, "home-decor");
        assert_eq!(c.status, CategoryStatus::Active);
    }

    #[test]
    fn test_self_parent_rejected() {
        let mut c = Category::create(CategoryDraft { name: "Toys".into(), ..Default::default() }).unwrap();
        let draft = CategoryDraft { name: "Toys".into(), parent_id: Some(c.id), ..Default::default() };
        assert_eq!(c.update(draft), Err(CategoryError::SelfParent));
    }
}
