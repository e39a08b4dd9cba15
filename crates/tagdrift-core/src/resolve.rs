//! Zone resolution.
//!
//! # Resolution rule
//! Attached tag ids are walked in the order the catalog returned them; the
//! first id that belongs to the category wins. When more than one category tag
//! is attached, the result is [`ZoneAssignment::Ambiguous`] so callers can
//! surface the conflict instead of silently picking one.
use crate::tag::Tag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneAssignment {
    Unassigned,
    Assigned(Tag),
    /// `selected` is `candidates[0]`; candidates are de-duplicated and in
    /// attachment order.
    Ambiguous { selected: Tag, candidates: Vec<Tag> },
}

impl ZoneAssignment {
    pub fn tag(&self) -> Option<&Tag> {
        match self {
            ZoneAssignment::Unassigned => None,
            ZoneAssignment::Assigned(tag) => Some(tag),
            ZoneAssignment::Ambiguous { selected, .. } => Some(selected),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ZoneAssignment::Ambiguous { .. })
    }
}

pub fn resolve_zone(category_tags: &[Tag], attached_ids: &[String]) -> ZoneAssignment {
    let mut candidates: Vec<Tag> = Vec::new();
    for id in attached_ids {
        if candidates.iter().any(|tag| &tag.id == id) {
            continue;
        }
        if let Some(tag) = category_tags.iter().find(|tag| &tag.id == id) {
            candidates.push(tag.clone());
        }
    }

    match candidates.len() {
        0 => ZoneAssignment::Unassigned,
        1 => ZoneAssignment::Assigned(candidates.remove(0)),
        _ => ZoneAssignment::Ambiguous {
            selected: candidates[0].clone(),
            candidates,
        },
    }
}
