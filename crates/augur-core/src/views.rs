use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{ModelError, Result};
use crate::model::{ElementKind, Model};
use crate::Id;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ViewKind {
    SystemLandscape,
    SystemContext,
    Container,
    Component,
    Deployment,
}

/// Membership decided when the view is resolved rather than when the view
/// is edited, so elements added later still show up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Inclusion {
    AllElements,
    AllContainers,
    AllComponents,
}

impl Inclusion {
    fn label(self) -> &'static str {
        match self {
            Inclusion::AllElements => "all elements",
            Inclusion::AllContainers => "all containers",
            Inclusion::AllComponents => "all components",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    key: String,
    kind: ViewKind,
    subject: Option<Id>,
    description: String,
    environment: Option<String>,
    automatic_layout: bool,
    inclusion: Option<Inclusion>,
    explicit: IndexSet<Id>,
}

/// Membership of a view evaluated against the model at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedView {
    pub elements: Vec<Id>,
    pub relationships: Vec<Id>,
}

impl View {
    pub(crate) fn new(kind: ViewKind, key: &str, subject: Option<Id>, description: &str) -> Self {
        View {
            key: key.to_string(),
            kind,
            subject,
            description: description.to_string(),
            environment: None,
            automatic_layout: false,
            inclusion: None,
            explicit: IndexSet::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn subject(&self) -> Option<Id> {
        self.subject
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn automatic_layout(&self) -> bool {
        self.automatic_layout
    }

    pub fn inclusion(&self) -> Option<Inclusion> {
        self.inclusion
    }

    /// Ids added one by one, in the order they were added.
    pub fn explicit(&self) -> impl Iterator<Item = Id> + '_ {
        self.explicit.iter().copied()
    }

    /// Forwarded to the renderer; nothing is laid out here.
    pub fn enable_automatic_layout(&mut self) -> &mut Self {
        self.automatic_layout = true;
        self
    }

    pub(crate) fn set_automatic_layout(&mut self, enabled: bool) {
        self.automatic_layout = enabled;
    }

    pub(crate) fn set_environment(&mut self, environment: Option<String>) {
        self.environment = environment;
    }

    /// Landscape views: every element present when the view is resolved.
    pub fn include_all(&mut self) -> Result<&mut Self> {
        self.set_inclusion(Inclusion::AllElements)
    }

    /// Container views: every container of the subject system at resolve time.
    pub fn add_all_containers(&mut self) -> Result<&mut Self> {
        self.set_inclusion(Inclusion::AllContainers)
    }

    /// Component views: every component of the subject container at resolve time.
    pub fn add_all_components(&mut self) -> Result<&mut Self> {
        self.set_inclusion(Inclusion::AllComponents)
    }

    pub(crate) fn set_inclusion(&mut self, inclusion: Inclusion) -> Result<&mut Self> {
        let supported = matches!(
            (self.kind, inclusion),
            (ViewKind::SystemLandscape, Inclusion::AllElements)
                | (ViewKind::Container, Inclusion::AllContainers)
                | (ViewKind::Component, Inclusion::AllComponents)
        );
        if !supported {
            return Err(ModelError::UnsupportedInclusion {
                view: self.key.clone(),
                inclusion: inclusion.label(),
            });
        }
        self.inclusion = Some(inclusion);
        Ok(self)
    }

    /// Snapshots the current neighbours of `id` into the explicit list.
    pub fn add_nearest_neighbours(&mut self, model: &Model, id: Id) -> Result<&mut Self> {
        if self.kind == ViewKind::Deployment {
            return Err(ModelError::UnsupportedInclusion {
                view: self.key.clone(),
                inclusion: "nearest neighbours",
            });
        }
        self.explicit.extend(model.nearest_neighbours(id)?);
        Ok(self)
    }

    /// Adds one item. Static views take model elements; deployment views take
    /// deployment nodes and relationships of their own environment.
    pub fn add(&mut self, model: &Model, id: Id) -> Result<&mut Self> {
        if self.kind == ViewKind::Deployment {
            self.check_environment(model, id)?;
        } else if model.element(id).is_none() {
            return Err(ModelError::UnknownElement(id));
        }
        self.explicit.insert(id);
        Ok(self)
    }

    fn check_environment(&self, model: &Model, id: Id) -> Result<()> {
        let endpoints = match (model.deployment_node(id), model.deployment_relationship(id)) {
            (Some(_), _) => vec![id],
            (None, Some(r)) => vec![r.source, r.destination],
            (None, None) => return Err(ModelError::UnknownElement(id)),
        };
        let environment = self.environment.as_deref().unwrap_or_default();
        if endpoints
            .into_iter()
            .all(|e| model.deployment_environment(e) == Some(environment))
        {
            Ok(())
        } else {
            Err(ModelError::WrongEnvironment {
                id,
                environment: environment.to_string(),
            })
        }
    }

    /// Evaluates the view against the model as it is now.
    pub fn resolve(&self, model: &Model) -> ResolvedView {
        match self.kind {
            ViewKind::Deployment => self.resolve_deployment(model),
            _ => self.resolve_static(model),
        }
    }

    fn resolve_static(&self, model: &Model) -> ResolvedView {
        let mut elements: BTreeSet<Id> = BTreeSet::new();
        if self.kind == ViewKind::SystemContext {
            elements.extend(self.subject);
        }
        match (self.inclusion, self.subject) {
            (Some(Inclusion::AllElements), _) => elements.extend(model.elements().map(|e| e.id)),
            (Some(Inclusion::AllContainers), Some(system)) => elements.extend(
                model
                    .children(system)
                    .filter(|e| e.kind == ElementKind::Container)
                    .map(|e| e.id),
            ),
            (Some(Inclusion::AllComponents), Some(container)) => elements.extend(
                model
                    .children(container)
                    .filter(|e| e.kind == ElementKind::Component)
                    .map(|e| e.id),
            ),
            _ => {}
        }
        elements.extend(self.explicit.iter().copied());

        let relationships = model
            .relationships_within(|id| elements.contains(&id))
            .map(|r| r.id)
            .collect();
        ResolvedView {
            elements: elements.into_iter().collect(),
            relationships,
        }
    }

    fn resolve_deployment(&self, model: &Model) -> ResolvedView {
        let environment = self.environment.as_deref().unwrap_or_default();
        let mut members: BTreeSet<Id> = BTreeSet::new();

        let mut pending: Vec<Id> = self
            .explicit
            .iter()
            .copied()
            .filter(|id| {
                model
                    .deployment_node(*id)
                    .is_some_and(|n| n.environment == environment)
            })
            .collect();
        while let Some(node) = pending.pop() {
            if !members.insert(node) {
                continue;
            }
            pending.extend(
                model
                    .child_deployment_nodes(node)
                    .filter(|n| n.environment == environment)
                    .map(|n| n.id),
            );
            members.extend(
                model
                    .instances_on(node)
                    .filter(|i| i.environment == environment)
                    .filter(|i| self.hosts_subject(model, i.element))
                    .map(|i| i.id),
            );
        }

        let in_environment = |id: Id| model.deployment_environment(id) == Some(environment);
        let relationships = model
            .deployment_relationships()
            .filter(|r| {
                (members.contains(&r.source) && members.contains(&r.destination))
                    || (self.explicit.contains(&r.id)
                        && in_environment(r.source)
                        && in_environment(r.destination))
            })
            .map(|r| r.id)
            .collect();
        ResolvedView {
            elements: members.into_iter().collect(),
            relationships,
        }
    }

    /// Whether an instanced element belongs to the view's software system.
    fn hosts_subject(&self, model: &Model, element: Id) -> bool {
        let Some(system) = self.subject else {
            return true;
        };
        let mut current = Some(element);
        while let Some(id) = current {
            if id == system {
                return true;
            }
            current = model.element(id).and_then(|e| e.parent);
        }
        false
    }
}

/// All views of a workspace, keyed by a unique name.
#[derive(Debug, Default)]
pub struct ViewSet {
    views: Vec<View>,
}

impl ViewSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_landscape_view(&mut self, key: &str, description: &str) -> Result<&mut View> {
        self.insert(View::new(ViewKind::SystemLandscape, key, None, description))
    }

    pub fn create_context_view(
        &mut self,
        model: &Model,
        system: Id,
        key: &str,
        description: &str,
    ) -> Result<&mut View> {
        require_kind(model, system, ElementKind::SoftwareSystem)?;
        self.insert(View::new(ViewKind::SystemContext, key, Some(system), description))
    }

    pub fn create_container_view(
        &mut self,
        model: &Model,
        system: Id,
        key: &str,
        description: &str,
    ) -> Result<&mut View> {
        require_kind(model, system, ElementKind::SoftwareSystem)?;
        self.insert(View::new(ViewKind::Container, key, Some(system), description))
    }

    pub fn create_component_view(
        &mut self,
        model: &Model,
        container: Id,
        key: &str,
        description: &str,
    ) -> Result<&mut View> {
        require_kind(model, container, ElementKind::Container)?;
        self.insert(View::new(ViewKind::Component, key, Some(container), description))
    }

    /// The view is keyed by its environment name and only ever shows nodes
    /// and instances of that environment.
    pub fn create_deployment_view(
        &mut self,
        model: &Model,
        system: Option<Id>,
        environment: &str,
        description: &str,
    ) -> Result<&mut View> {
        if let Some(system) = system {
            require_kind(model, system, ElementKind::SoftwareSystem)?;
        }
        let mut view = View::new(ViewKind::Deployment, environment, system, description);
        view.environment = Some(environment.to_string());
        self.insert(view)
    }

    pub(crate) fn insert(&mut self, view: View) -> Result<&mut View> {
        if self.get(&view.key).is_some() {
            return Err(ModelError::DuplicateViewName(view.key));
        }
        self.views.push(view);
        let last = self.views.len() - 1;
        Ok(&mut self.views[last])
    }

    pub fn get(&self, key: &str) -> Option<&View> {
        self.views.iter().find(|v| v.key == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut View> {
        self.views.iter_mut().find(|v| v.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.iter()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

fn require_kind(model: &Model, id: Id, kind: ElementKind) -> Result<()> {
    match model.element(id) {
        Some(e) if e.kind == kind => Ok(()),
        _ => Err(ModelError::UnknownElement(id)),
    }
}
