use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

pub const ELEMENT: &str = "Element";
pub const PERSON: &str = "Person";
pub const SOFTWARE_SYSTEM: &str = "Software System";
pub const CONTAINER: &str = "Container";
pub const COMPONENT: &str = "Component";
pub const RELATIONSHIP: &str = "Relationship";
pub const DEPLOYMENT_NODE: &str = "Deployment Node";
pub const SOFTWARE_SYSTEM_INSTANCE: &str = "Software System Instance";
pub const CONTAINER_INSTANCE: &str = "Container Instance";
pub const COMPONENT_INSTANCE: &str = "Component Instance";
pub const PERSON_INSTANCE: &str = "Person Instance";

/// Tags the model attaches on its own. They describe what an item is, so
/// they never take part in tag propagation.
pub const BUILT_IN: &[&str] = &[
    ELEMENT,
    PERSON,
    SOFTWARE_SYSTEM,
    CONTAINER,
    COMPONENT,
    RELATIONSHIP,
    DEPLOYMENT_NODE,
    SOFTWARE_SYSTEM_INSTANCE,
    CONTAINER_INSTANCE,
    COMPONENT_INSTANCE,
    PERSON_INSTANCE,
];

pub fn is_built_in(tag: &str) -> bool {
    BUILT_IN.contains(&tag)
}

/// Append-only tag set. Iteration follows insertion order so documents are
/// stable, but equality and lookups only care about membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(IndexSet<String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(initial: &[&str]) -> Self {
        let mut tags = Self::new();
        for tag in initial {
            tags.add(tag);
        }
        tags
    }

    /// Returns `false` when the tag was already present.
    pub fn add(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.0.contains(tag) {
            return false;
        }
        self.0.insert(tag.to_string())
    }

    /// Looks the tag up the same way [`Tags::add`] stores it.
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag.trim())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Tags added by callers, without the built-in kind tags.
    pub fn user_tags(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|t| !is_built_in(t))
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<'a> FromIterator<&'a str> for Tags {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.add(tag);
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_twice_keeps_size() {
        let mut tags = Tags::new();
        assert!(tags.add("Database"));
        assert!(!tags.add("Database"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn blank_tags_are_ignored() {
        let mut tags = Tags::new();
        assert!(!tags.add("  "));
        assert!(tags.is_empty());
    }

    #[test]
    fn lookups_trim_like_add() {
        let mut tags = Tags::new();
        tags.add("  Database ");
        assert!(tags.contains("Database"));
        assert!(tags.contains(" Database  "));
        assert!(!tags.contains("   "));
    }

    #[test]
    fn user_tags_skip_built_ins() {
        let mut tags = Tags::with(&[ELEMENT, CONTAINER]);
        tags.add("Failover");
        assert_eq!(tags.user_tags().collect::<Vec<_>>(), vec!["Failover"]);
    }

    #[test]
    fn membership_equality_ignores_order() {
        let a: Tags = ["A", "B"].into_iter().collect();
        let b: Tags = ["B", "A"].into_iter().collect();
        assert_eq!(a, b);
    }
}
