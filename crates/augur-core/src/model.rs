use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::deployment::Deployment;
use crate::error::{ModelError, Result};
use crate::tags::{self, Tags};
use crate::Id;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    Person,
    SoftwareSystem,
    Container,
    Component,
}

impl ElementKind {
    /// Human readable name, used in error messages and outlines.
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Person => "person",
            ElementKind::SoftwareSystem => "software system",
            ElementKind::Container => "container",
            ElementKind::Component => "component",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Person => tags::PERSON,
            ElementKind::SoftwareSystem => tags::SOFTWARE_SYSTEM,
            ElementKind::Container => tags::CONTAINER,
            ElementKind::Component => tags::COMPONENT,
        }
    }

    pub(crate) fn instance_tag(self) -> &'static str {
        match self {
            ElementKind::Person => tags::PERSON_INSTANCE,
            ElementKind::SoftwareSystem => tags::SOFTWARE_SYSTEM_INSTANCE,
            ElementKind::Container => tags::CONTAINER_INSTANCE,
            ElementKind::Component => tags::COMPONENT_INSTANCE,
        }
    }

    /// The kind an element of this kind must be nested in, if any.
    pub fn parent_kind(self) -> Option<ElementKind> {
        match self {
            ElementKind::Person | ElementKind::SoftwareSystem => None,
            ElementKind::Container => Some(ElementKind::SoftwareSystem),
            ElementKind::Component => Some(ElementKind::Container),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Location {
    #[default]
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: Id,
    pub kind: ElementKind,
    pub name: String,
    pub description: String,
    pub location: Location,
    pub technology: Option<String>,
    pub tags: Tags,
    pub parent: Option<Id>,
}

/// A directed edge. Model relationships connect elements; the deployment
/// topology keeps its own relationships of the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: Id,
    pub source: Id,
    pub destination: Id,
    pub description: String,
    pub technology: Option<String>,
    pub tags: Tags,
    /// Model relationship this one was replicated from (instance relationships only).
    pub linked: Option<Id>,
}

impl Relationship {
    pub(crate) fn new(
        id: Id,
        source: Id,
        destination: Id,
        description: &str,
        technology: Option<&str>,
    ) -> Self {
        Relationship {
            id,
            source,
            destination,
            description: description.to_string(),
            technology: non_empty(technology),
            tags: Tags::with(&[tags::RELATIONSHIP]),
            linked: None,
        }
    }
}

/// The architecture graph: elements in their containment hierarchy, the
/// relationships between them and the deployment topology hosting them.
#[derive(Debug, Default)]
pub struct Model {
    /// Last id handed out.
    next_id: u32,
    elements: IndexMap<Id, Element>,
    relationships: IndexMap<Id, Relationship>,
    pub(crate) deployment: Deployment,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Elements ---

    pub fn add_person(&mut self, name: &str, description: &str, location: Location) -> Result<Id> {
        self.insert_element(None, ElementKind::Person, None, name, description, location, None)
    }

    pub fn add_software_system(
        &mut self,
        name: &str,
        description: &str,
        location: Location,
    ) -> Result<Id> {
        self.insert_element(
            None,
            ElementKind::SoftwareSystem,
            None,
            name,
            description,
            location,
            None,
        )
    }

    pub fn add_container(
        &mut self,
        system: Id,
        name: &str,
        description: &str,
        technology: &str,
    ) -> Result<Id> {
        self.insert_element(
            None,
            ElementKind::Container,
            Some(system),
            name,
            description,
            Location::Internal,
            Some(technology),
        )
    }

    pub fn add_component(
        &mut self,
        container: Id,
        name: &str,
        description: &str,
        technology: &str,
    ) -> Result<Id> {
        self.insert_element(
            None,
            ElementKind::Component,
            Some(container),
            name,
            description,
            Location::Internal,
            Some(technology),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn insert_element(
        &mut self,
        id: Option<Id>,
        kind: ElementKind,
        parent: Option<Id>,
        name: &str,
        description: &str,
        location: Location,
        technology: Option<&str>,
    ) -> Result<Id> {
        let location = match (kind.parent_kind(), parent) {
            (None, None) => location,
            (None, Some(pid)) => return Err(ModelError::UnknownParent(pid)),
            (Some(_), None) => return Err(ModelError::UnknownParent(Id::new(0))),
            (Some(expected), Some(pid)) => {
                let parent = self
                    .elements
                    .get(&pid)
                    .filter(|p| p.kind == expected)
                    .ok_or(ModelError::UnknownParent(pid))?;
                // Children live inside their system's boundary.
                parent.location
            }
        };

        if self.find_element(kind, parent, name).is_some() {
            return Err(ModelError::DuplicateName {
                kind: kind.label(),
                name: name.to_string(),
            });
        }

        let id = self.claim_id(id)?;
        debug!(%id, kind = kind.label(), name, "add element");
        self.elements.insert(
            id,
            Element {
                id,
                kind,
                name: name.to_string(),
                description: description.to_string(),
                location,
                technology: non_empty(technology),
                tags: Tags::with(&[tags::ELEMENT, kind.tag()]),
                parent,
            },
        );
        Ok(id)
    }

    pub fn element(&self, id: Id) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// All elements in creation order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = &Element> {
        self.elements.values().filter(move |e| e.kind == kind)
    }

    pub fn find_element(&self, kind: ElementKind, parent: Option<Id>, name: &str) -> Option<&Element> {
        self.elements
            .values()
            .find(|e| e.kind == kind && e.parent == parent && e.name == name)
    }

    /// Direct children of a system or container.
    pub fn children(&self, parent: Id) -> impl Iterator<Item = &Element> {
        self.elements
            .values()
            .filter(move |e| e.parent == Some(parent))
    }

    // --- Relationships ---

    pub fn relate(
        &mut self,
        source: Id,
        destination: Id,
        description: &str,
        technology: Option<&str>,
    ) -> Result<Id> {
        self.insert_relationship(None, source, destination, description, technology)
    }

    pub(crate) fn insert_relationship(
        &mut self,
        id: Option<Id>,
        source: Id,
        destination: Id,
        description: &str,
        technology: Option<&str>,
    ) -> Result<Id> {
        if source == destination {
            return Err(ModelError::SelfRelationship(source));
        }
        for endpoint in [source, destination] {
            if !self.elements.contains_key(&endpoint) {
                return Err(ModelError::UnknownElement(endpoint));
            }
        }
        check_unique_relationship(self.relationships.values(), source, destination, description)?;

        let id = self.claim_id(id)?;
        debug!(%id, %source, %destination, description, "add relationship");
        self.relationships.insert(
            id,
            Relationship::new(id, source, destination, description, technology),
        );
        Ok(id)
    }

    pub fn relationship(&self, id: Id) -> Option<&Relationship> {
        self.relationships.get(&id)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    /// Relationships between elements whose endpoints both satisfy `keep`.
    pub fn relationships_within<'a>(
        &'a self,
        keep: impl Fn(Id) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Relationship> {
        self.relationships
            .values()
            .filter(move |r| keep(r.source) && keep(r.destination))
    }

    /// Every element with a direct relationship to or from `id`. Always
    /// computed from the current relationships.
    pub fn nearest_neighbours(&self, id: Id) -> Result<BTreeSet<Id>> {
        if !self.elements.contains_key(&id) {
            return Err(ModelError::UnknownElement(id));
        }
        Ok(self
            .relationships
            .values()
            .filter_map(|r| {
                if r.source == id {
                    Some(r.destination)
                } else if r.destination == id {
                    Some(r.source)
                } else {
                    None
                }
            })
            .collect())
    }

    // --- Tags ---

    /// Tags any element, relationship, deployment node or instance.
    /// Idempotent; returns `false` when the tag was already there. Tagging a
    /// deployment node or instance also tags the relationships pointing at it.
    pub fn add_tag(&mut self, id: Id, tag: &str) -> Result<bool> {
        if let Some(element) = self.elements.get_mut(&id) {
            return Ok(element.tags.add(tag));
        }
        if let Some(relationship) = self.relationships.get_mut(&id) {
            return Ok(relationship.tags.add(tag));
        }
        self.tag_deployment_item(id, tag)
    }

    pub fn tags(&self, id: Id) -> Option<&Tags> {
        if let Some(element) = self.elements.get(&id) {
            return Some(&element.tags);
        }
        if let Some(relationship) = self.relationships.get(&id) {
            return Some(&relationship.tags);
        }
        self.deployment.tags(id)
    }

    /// Raw tag access for rebuilding a workspace from a document.
    pub(crate) fn tags_mut(&mut self, id: Id) -> Option<&mut Tags> {
        if let Some(element) = self.elements.get_mut(&id) {
            return Some(&mut element.tags);
        }
        if let Some(relationship) = self.relationships.get_mut(&id) {
            return Some(&mut relationship.tags);
        }
        self.deployment.tags_mut(id)
    }

    // --- Ids ---

    pub(crate) fn contains_id(&self, id: Id) -> bool {
        self.elements.contains_key(&id)
            || self.relationships.contains_key(&id)
            || self.deployment.contains_id(id)
    }

    /// Hands out the next id, or reserves `requested` when importing.
    pub(crate) fn claim_id(&mut self, requested: Option<Id>) -> Result<Id> {
        match requested {
            Some(id) => {
                if self.contains_id(id) {
                    return Err(ModelError::DuplicateId(id));
                }
                self.next_id = self.next_id.max(id.get());
                Ok(id)
            }
            None => {
                self.next_id += 1;
                // Ids start at 1; 0 never names anything.
                while self.contains_id(Id::new(self.next_id)) {
                    self.next_id += 1;
                }
                Ok(Id::new(self.next_id))
            }
        }
    }
}

pub(crate) fn check_unique_relationship<'a>(
    mut existing: impl Iterator<Item = &'a Relationship>,
    source: Id,
    destination: Id,
    description: &str,
) -> Result<()> {
    if existing.any(|r| r.source == source && r.destination == destination && r.description == description) {
        return Err(ModelError::DuplicateRelationship {
            from: source,
            to: destination,
            description: description.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_system() -> (Model, Id) {
        let mut model = Model::new();
        let system = model
            .add_software_system("Accounting", "Bookkeeping for small businesses", Location::Internal)
            .unwrap();
        (model, system)
    }

    #[test]
    fn elements_get_kind_tags() {
        let (mut model, system) = model_with_system();
        let api = model.add_container(system, "API", "REST API", "Rust").unwrap();
        let tags = &model.element(api).unwrap().tags;
        assert!(tags.contains("Element"));
        assert!(tags.contains("Container"));
        assert_eq!(model.element(api).unwrap().technology.as_deref(), Some("Rust"));
    }

    #[test]
    fn duplicate_system_name_is_rejected() {
        let (mut model, _) = model_with_system();
        let err = model
            .add_software_system("Accounting", "again", Location::Internal)
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateName { .. }));
        assert_eq!(model.elements_of(ElementKind::SoftwareSystem).count(), 1);
    }

    #[test]
    fn same_name_allowed_for_different_kinds_and_parents() {
        let (mut model, system) = model_with_system();
        model.add_person("Accounting", "a person", Location::External).unwrap();
        let other = model.add_software_system("CRM", "", Location::Internal).unwrap();
        model.add_container(system, "Database", "", "SQL").unwrap();
        model.add_container(other, "Database", "", "SQL").unwrap();
        assert!(model.add_container(other, "Database", "", "SQL").is_err());
    }

    #[test]
    fn component_needs_existing_container() {
        let (mut model, system) = model_with_system();
        let err = model.add_component(Id::new(99), "Logic", "", "Rust").unwrap_err();
        assert_eq!(err, ModelError::UnknownParent(Id::new(99)));
        // A system is not a valid container parent either.
        let err = model.add_component(system, "Logic", "", "Rust").unwrap_err();
        assert_eq!(err, ModelError::UnknownParent(system));
    }

    #[test]
    fn containers_inherit_system_location() {
        let mut model = Model::new();
        let bank = model.add_software_system("Bank", "", Location::External).unwrap();
        let gateway = model.add_container(bank, "Gateway", "", "").unwrap();
        let gateway = model.element(gateway).unwrap();
        assert_eq!(gateway.location, Location::External);
        assert_eq!(gateway.technology, None);
    }

    #[test]
    fn self_relationship_is_rejected() {
        let (mut model, system) = model_with_system();
        let err = model.relate(system, system, "calls", None).unwrap_err();
        assert_eq!(err, ModelError::SelfRelationship(system));
    }

    #[test]
    fn relationship_to_unknown_element_is_rejected() {
        let (mut model, system) = model_with_system();
        let err = model.relate(system, Id::new(42), "calls", None).unwrap_err();
        assert_eq!(err, ModelError::UnknownElement(Id::new(42)));
    }

    #[test]
    fn parallel_relationships_need_distinct_labels() {
        let (mut model, system) = model_with_system();
        let user = model.add_person("User", "", Location::External).unwrap();
        model.relate(user, system, "uses", None).unwrap();
        model.relate(user, system, "configures", Some("HTTPS")).unwrap();
        let err = model.relate(user, system, "uses", None).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateRelationship { .. }));
        assert_eq!(model.relationships().count(), 2);
    }

    #[test]
    fn nearest_neighbours_is_recomputed() {
        let (mut model, system) = model_with_system();
        let user = model.add_person("User", "", Location::External).unwrap();
        let bank = model.add_software_system("Bank", "", Location::External).unwrap();
        model.relate(user, system, "uses", None).unwrap();

        assert_eq!(model.nearest_neighbours(system).unwrap(), BTreeSet::from([user]));

        model.relate(system, bank, "imports statements from", None).unwrap();
        assert_eq!(
            model.nearest_neighbours(system).unwrap(),
            BTreeSet::from([user, bank])
        );
    }

    #[test]
    fn add_tag_is_idempotent_for_relationships() {
        let (mut model, system) = model_with_system();
        let user = model.add_person("User", "", Location::External).unwrap();
        let uses = model.relate(user, system, "uses", None).unwrap();
        assert!(model.add_tag(uses, "Async").unwrap());
        assert!(!model.add_tag(uses, "Async").unwrap());
        assert_eq!(model.tags(uses).unwrap().len(), 2);
        assert!(model.add_tag(Id::new(1000), "Async").is_err());
    }

    #[test]
    fn ids_are_shared_across_tables() {
        let (mut model, system) = model_with_system();
        let user = model.add_person("User", "", Location::External).unwrap();
        let uses = model.relate(user, system, "uses", None).unwrap();
        assert!(system < user && user < uses);
        assert_eq!(
            model.claim_id(Some(user)).unwrap_err(),
            ModelError::DuplicateId(user)
        );
    }
}
