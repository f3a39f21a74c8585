use indexmap::IndexMap;
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::model::{check_unique_relationship, non_empty, Model, Relationship};
use crate::tags::{self, Tags};
use crate::Id;

/// Free-form node properties, kept in the order they were given.
pub type Properties = IndexMap<String, String>;

/// Parse `key=value` strings into properties. An entry without `=` becomes
/// a key with an empty value.
pub fn properties_from_pairs(pairs: &[&str]) -> Properties {
    pairs
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (pair.trim().to_string(), String::new()),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentNode {
    pub id: Id,
    pub environment: String,
    pub name: String,
    pub description: String,
    pub technology: Option<String>,
    pub instances: u32,
    pub properties: Properties,
    pub tags: Tags,
    pub parent: Option<Id>,
}

/// A model element running on a deployment node.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: Id,
    pub element: Id,
    pub node: Id,
    pub environment: String,
    pub tags: Tags,
}

/// What to create with [`Model::add_deployment_node`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    name: String,
    description: String,
    technology: String,
    instances: u32,
    properties: Properties,
}

impl NodeSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        technology: impl Into<String>,
    ) -> Self {
        NodeSpec {
            name: name.into(),
            description: description.into(),
            technology: technology.into(),
            instances: 1,
            properties: Properties::new(),
        }
    }

    pub fn instances(mut self, count: u32) -> Self {
        self.instances = count;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }
}

#[derive(Debug, Default)]
pub(crate) struct Deployment {
    nodes: IndexMap<Id, DeploymentNode>,
    instances: IndexMap<Id, Instance>,
    relationships: IndexMap<Id, Relationship>,
}

impl Deployment {
    pub(crate) fn contains_id(&self, id: Id) -> bool {
        self.nodes.contains_key(&id)
            || self.instances.contains_key(&id)
            || self.relationships.contains_key(&id)
    }

    pub(crate) fn tags(&self, id: Id) -> Option<&Tags> {
        self.nodes
            .get(&id)
            .map(|n| &n.tags)
            .or_else(|| self.instances.get(&id).map(|i| &i.tags))
            .or_else(|| self.relationships.get(&id).map(|r| &r.tags))
    }

    pub(crate) fn tags_mut(&mut self, id: Id) -> Option<&mut Tags> {
        if let Some(node) = self.nodes.get_mut(&id) {
            return Some(&mut node.tags);
        }
        if let Some(instance) = self.instances.get_mut(&id) {
            return Some(&mut instance.tags);
        }
        self.relationships.get_mut(&id).map(|r| &mut r.tags)
    }

    /// Tags every relationship pointing at `destination`. Returns how many
    /// relationships gained the tag.
    fn tag_inbound(&mut self, destination: Id, tag: &str) -> usize {
        self.relationships
            .values_mut()
            .filter(|r| r.destination == destination)
            .map(|r| r.tags.add(tag))
            .filter(|added| *added)
            .count()
    }

    /// Destinations affected by a tag on `id`: the item itself and, for a
    /// node, the instances it hosts.
    fn propagation_targets(&self, id: Id) -> Vec<Id> {
        let mut targets = vec![id];
        if self.nodes.contains_key(&id) {
            targets.extend(
                self.instances
                    .values()
                    .filter(|i| i.node == id)
                    .map(|i| i.id),
            );
        }
        targets
    }
}

impl Model {
    // --- Nodes ---

    pub fn add_deployment_node(&mut self, environment: &str, spec: NodeSpec) -> Result<Id> {
        self.insert_node(None, environment, None, spec)
    }

    /// Nests a node under `parent`; the child lives in the parent's environment.
    pub fn add_child_deployment_node(&mut self, parent: Id, spec: NodeSpec) -> Result<Id> {
        let environment = self
            .deployment
            .nodes
            .get(&parent)
            .map(|p| p.environment.clone())
            .ok_or(ModelError::UnknownParent(parent))?;
        self.insert_node(None, &environment, Some(parent), spec)
    }

    pub(crate) fn insert_node(
        &mut self,
        id: Option<Id>,
        environment: &str,
        parent: Option<Id>,
        spec: NodeSpec,
    ) -> Result<Id> {
        if let Some(pid) = parent {
            match self.deployment.nodes.get(&pid) {
                Some(p) if p.environment == environment => {}
                _ => return Err(ModelError::UnknownParent(pid)),
            }
        }
        let clash = self.deployment.nodes.values().any(|n| {
            n.environment == environment && n.parent == parent && n.name == spec.name
        });
        if clash {
            return Err(ModelError::DuplicateName {
                kind: "deployment node",
                name: spec.name,
            });
        }

        let id = self.claim_id(id)?;
        debug!(%id, environment, name = %spec.name, "add deployment node");
        self.deployment.nodes.insert(
            id,
            DeploymentNode {
                id,
                environment: environment.to_string(),
                name: spec.name,
                description: spec.description,
                technology: non_empty(Some(spec.technology.as_str())),
                instances: spec.instances,
                properties: spec.properties,
                tags: Tags::with(&[tags::ELEMENT, tags::DEPLOYMENT_NODE]),
                parent,
            },
        );
        Ok(id)
    }

    pub fn deployment_node(&self, id: Id) -> Option<&DeploymentNode> {
        self.deployment.nodes.get(&id)
    }

    pub fn deployment_nodes(&self) -> impl Iterator<Item = &DeploymentNode> {
        self.deployment.nodes.values()
    }

    pub fn child_deployment_nodes(&self, parent: Id) -> impl Iterator<Item = &DeploymentNode> {
        self.deployment
            .nodes
            .values()
            .filter(move |n| n.parent == Some(parent))
    }

    /// Environment names in the order they were first used.
    pub fn environments(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for node in self.deployment.nodes.values() {
            if !seen.contains(&node.environment.as_str()) {
                seen.push(&node.environment);
            }
        }
        seen
    }

    // --- Instances ---

    /// Records that `element` runs on `node`. Relationships between this
    /// element and elements already instanced in the same environment are
    /// replicated between the instances.
    pub fn instantiate(&mut self, node: Id, element: Id) -> Result<Id> {
        self.insert_instance(None, node, element, true)
    }

    pub(crate) fn insert_instance(
        &mut self,
        id: Option<Id>,
        node: Id,
        element: Id,
        replicate: bool,
    ) -> Result<Id> {
        let kind = self
            .element(element)
            .map(|e| e.kind)
            .ok_or(ModelError::UnknownElement(element))?;
        let environment = self
            .deployment
            .nodes
            .get(&node)
            .map(|n| n.environment.clone())
            .ok_or(ModelError::UnknownParent(node))?;

        let id = self.claim_id(id)?;
        debug!(%id, %node, %element, "add instance");
        self.deployment.instances.insert(
            id,
            Instance {
                id,
                element,
                node,
                environment,
                tags: Tags::with(&[kind.instance_tag()]),
            },
        );
        if replicate {
            self.replicate_relationships(id)?;
        }
        Ok(id)
    }

    fn replicate_relationships(&mut self, instance: Id) -> Result<()> {
        let Some(new) = self.deployment.instances.get(&instance).cloned() else {
            return Ok(());
        };
        let peers: Vec<(Id, Id)> = self
            .deployment
            .instances
            .values()
            .filter(|i| i.id != new.id && i.environment == new.environment)
            .map(|i| (i.id, i.element))
            .collect();

        let mut copies = Vec::new();
        for (peer, peer_element) in peers {
            for r in self.relationships() {
                if r.source == new.element && r.destination == peer_element {
                    copies.push((new.id, peer, r.clone()));
                } else if r.source == peer_element && r.destination == new.element {
                    copies.push((peer, new.id, r.clone()));
                }
            }
        }
        for (source, destination, original) in copies {
            let id = self.insert_deployment_relationship(
                None,
                source,
                destination,
                &original.description,
                original.technology.as_deref(),
                Some(original.id),
            )?;
            self.inherit_destination_tags(id);
        }
        Ok(())
    }

    pub fn instance(&self, id: Id) -> Option<&Instance> {
        self.deployment.instances.get(&id)
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.deployment.instances.values()
    }

    pub fn instances_on(&self, node: Id) -> impl Iterator<Item = &Instance> {
        self.deployment
            .instances
            .values()
            .filter(move |i| i.node == node)
    }

    // --- Deployment relationships ---

    /// Relates two deployment nodes, e.g. a replication link between servers.
    pub fn deployment_relate(
        &mut self,
        source: Id,
        destination: Id,
        description: &str,
        technology: Option<&str>,
    ) -> Result<Id> {
        for endpoint in [source, destination] {
            if !self.deployment.nodes.contains_key(&endpoint) {
                return Err(ModelError::UnknownElement(endpoint));
            }
        }
        let id = self.insert_deployment_relationship(
            None,
            source,
            destination,
            description,
            technology,
            None,
        )?;
        self.inherit_destination_tags(id);
        Ok(id)
    }

    pub(crate) fn insert_deployment_relationship(
        &mut self,
        id: Option<Id>,
        source: Id,
        destination: Id,
        description: &str,
        technology: Option<&str>,
        linked: Option<Id>,
    ) -> Result<Id> {
        if source == destination {
            return Err(ModelError::SelfRelationship(source));
        }
        for endpoint in [source, destination] {
            let known = self.deployment.nodes.contains_key(&endpoint)
                || self.deployment.instances.contains_key(&endpoint);
            if !known {
                return Err(ModelError::UnknownElement(endpoint));
            }
        }
        check_unique_relationship(
            self.deployment.relationships.values(),
            source,
            destination,
            description,
        )?;

        let id = self.claim_id(id)?;
        debug!(%id, %source, %destination, description, "add deployment relationship");
        let mut relationship = Relationship::new(id, source, destination, description, technology);
        relationship.linked = linked;
        self.deployment.relationships.insert(id, relationship);
        Ok(id)
    }

    /// A new relationship carries the user tags already on its destination
    /// and, for an instance, on the node hosting it.
    fn inherit_destination_tags(&mut self, relationship: Id) {
        let Some(destination) = self
            .deployment
            .relationships
            .get(&relationship)
            .map(|r| r.destination)
        else {
            return;
        };
        let mut sources = vec![destination];
        if let Some(instance) = self.deployment.instances.get(&destination) {
            sources.push(instance.node);
        }
        let inherited: Vec<String> = sources
            .into_iter()
            .filter_map(|id| self.deployment.tags(id))
            .flat_map(|t| t.user_tags().map(str::to_string).collect::<Vec<_>>())
            .collect();
        if let Some(r) = self.deployment.relationships.get_mut(&relationship) {
            for tag in &inherited {
                r.tags.add(tag);
            }
        }
    }

    /// Environment of a deployment node or instance.
    pub(crate) fn deployment_environment(&self, id: Id) -> Option<&str> {
        self.deployment
            .nodes
            .get(&id)
            .map(|n| n.environment.as_str())
            .or_else(|| {
                self.deployment
                    .instances
                    .get(&id)
                    .map(|i| i.environment.as_str())
            })
    }

    pub fn deployment_relationship(&self, id: Id) -> Option<&Relationship> {
        self.deployment.relationships.get(&id)
    }

    pub fn deployment_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.deployment.relationships.values()
    }

    // --- Tag propagation ---

    pub(crate) fn tag_deployment_item(&mut self, id: Id, tag: &str) -> Result<bool> {
        let added = if let Some(node) = self.deployment.nodes.get_mut(&id) {
            node.tags.add(tag)
        } else if let Some(instance) = self.deployment.instances.get_mut(&id) {
            instance.tags.add(tag)
        } else if let Some(relationship) = self.deployment.relationships.get_mut(&id) {
            return Ok(relationship.tags.add(tag));
        } else {
            return Err(ModelError::UnknownElement(id));
        };

        for target in self.deployment.propagation_targets(id) {
            self.deployment.tag_inbound(target, tag);
        }
        Ok(added)
    }

    /// Re-applies every user tag of every deployment node and instance to
    /// the relationships pointing at it. Only relationships loaded without
    /// those tags gain anything. Returns the number of tags added.
    pub fn propagate_tags(&mut self) -> usize {
        let tagged: Vec<(Id, Vec<String>)> = self
            .deployment
            .nodes
            .values()
            .map(|n| (n.id, &n.tags))
            .chain(self.deployment.instances.values().map(|i| (i.id, &i.tags)))
            .map(|(id, tags)| (id, tags.user_tags().map(str::to_string).collect()))
            .collect();

        let mut added = 0;
        for (id, user_tags) in tagged {
            for target in self.deployment.propagation_targets(id) {
                for tag in &user_tags {
                    added += self.deployment.tag_inbound(target, tag);
                }
            }
        }
        if added > 0 {
            debug!(added, "propagated deployment tags");
        }
        added
    }
}
