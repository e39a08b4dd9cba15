//! Tag model shared by the catalog, resolver and detector.
use serde::{Deserialize, Serialize};

/// A tag as owned by the external tagging service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub category_id: String,
}

impl Tag {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category_id: category_id.into(),
        }
    }
}
