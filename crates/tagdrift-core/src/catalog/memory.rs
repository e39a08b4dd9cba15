//! In-memory tag catalog.
//!
//! # Purpose
//! Implements [`TagCatalog`] over plain vectors guarded by
//! `tokio::sync::RwLock`. It backs tests and the `memory` catalog backend used
//! for local development, where it is seeded from a [`CatalogFixture`].
//!
//! # Ordering
//! Categories, tags and attachments keep insertion order, which makes
//! first-match resolution deterministic for fixtures and tests.
use super::{CatalogError, CatalogResult, TagCatalog};
use crate::event::ObjectRef;
use crate::tag::Tag;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CategoryEntry {
    id: String,
    name: String,
    tags: Vec<Tag>,
}

/// Declarative catalog contents, typically loaded from YAML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub categories: Vec<FixtureCategory>,
    #[serde(default)]
    pub attachments: Vec<FixtureAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<FixtureTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureTag {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAttachment {
    pub object: ObjectRef,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    categories: Arc<RwLock<Vec<CategoryEntry>>>,
    attachments: Arc<RwLock<HashMap<ObjectRef, Vec<String>>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: CatalogFixture) -> Self {
        let categories = fixture
            .categories
            .into_iter()
            .map(|category| CategoryEntry {
                tags: category
                    .tags
                    .into_iter()
                    .map(|tag| Tag::new(tag.id, tag.name, category.id.clone()))
                    .collect(),
                id: category.id,
                name: category.name,
            })
            .collect();
        let mut attachments: HashMap<ObjectRef, Vec<String>> = HashMap::new();
        for attachment in fixture.attachments {
            attachments
                .entry(attachment.object)
                .or_default()
                .extend(attachment.tags);
        }
        Self {
            categories: Arc::new(RwLock::new(categories)),
            attachments: Arc::new(RwLock::new(attachments)),
        }
    }

    pub async fn add_category(&self, id: impl Into<String>, name: impl Into<String>) {
        self.categories.write().await.push(CategoryEntry {
            id: id.into(),
            name: name.into(),
            tags: Vec::new(),
        });
    }

    /// Add `tag` to the category named by its `category_id`.
    pub async fn add_tag(&self, tag: Tag) -> CatalogResult<()> {
        let mut categories = self.categories.write().await;
        let category = categories
            .iter_mut()
            .find(|entry| entry.id == tag.category_id)
            .ok_or_else(|| CatalogError::CategoryNotFound(tag.category_id.clone()))?;
        category.tags.push(tag);
        Ok(())
    }

    pub async fn attach(&self, object: ObjectRef, tag_id: impl Into<String>) {
        self.attachments
            .write()
            .await
            .entry(object)
            .or_default()
            .push(tag_id.into());
    }
}

#[async_trait]
impl TagCatalog for InMemoryCatalog {
    async fn tags_for_category(&self, category: &str) -> CatalogResult<Vec<Tag>> {
        let categories = self.categories.read().await;
        categories
            .iter()
            .find(|entry| entry.id == category || entry.name == category)
            .map(|entry| entry.tags.clone())
            .ok_or_else(|| CatalogError::CategoryNotFound(category.to_string()))
    }

    async fn attached_tags(&self, object: &ObjectRef) -> CatalogResult<Vec<String>> {
        let attachments = self.attachments.read().await;
        Ok(attachments.get(object).cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
