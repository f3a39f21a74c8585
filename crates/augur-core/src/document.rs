//! The workspace document: the structure handed to the modeling service and
//! read back from it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::deployment::{DeploymentNode, NodeSpec};
use crate::error::{ModelError, Result};
use crate::model::{ElementKind, Location, Model, Relationship};
use crate::styles::{StyleRule, Styles};
use crate::views::{Inclusion, View, ViewKind, ViewSet};
use crate::workspace::Workspace;
use crate::Id;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Workspace id on the service; only present on fetched documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub model: ModelDocument,
    #[serde(default)]
    pub views: Vec<ViewDocument>,
    #[serde(default)]
    pub styles: Vec<StyleRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<String>,
    #[serde(default)]
    pub elements: Vec<ElementDocument>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDocument>,
    #[serde(default)]
    pub deployment_nodes: Vec<DeploymentNodeDocument>,
    #[serde(default)]
    pub deployment_relationships: Vec<RelationshipDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ElementDocument {
    pub id: Id,
    pub kind: ElementKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default)]
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDocument {
    pub id: Id,
    pub source_id: Id,
    pub destination_id: Id,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_relationship_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentNodeDocument {
    pub id: Id,
    pub environment: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default = "default_instances")]
    pub instances: u32,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DeploymentNodeDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub element_instances: Vec<InstanceDocument>,
}

fn default_instances() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDocument {
    pub id: Id,
    pub element_id: Id,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewDocument {
    pub key: String,
    pub kind: ViewKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<Id>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion: Option<Inclusion>,
    #[serde(default)]
    pub explicit: Vec<Id>,
    #[serde(default)]
    pub automatic_layout: bool,
    /// Resolved membership at the time the document was produced.
    #[serde(default)]
    pub elements: Vec<Id>,
    #[serde(default)]
    pub relationships: Vec<Id>,
}

impl Document {
    /// Snapshot a workspace. Late-bound view inclusions are resolved here.
    pub fn from_workspace(workspace: &Workspace) -> Self {
        let model = &workspace.model;
        Document {
            id: None,
            name: workspace.name.clone(),
            description: workspace.description.clone(),
            model: ModelDocument {
                enterprise: workspace.enterprise.clone(),
                elements: model
                    .elements()
                    .map(|e| ElementDocument {
                        id: e.id,
                        kind: e.kind,
                        name: e.name.clone(),
                        description: e.description.clone(),
                        tags: e.tags.to_vec(),
                        technology: e.technology.clone(),
                        location: e.location,
                        parent_id: e.parent,
                    })
                    .collect(),
                relationships: model.relationships().map(relationship_document).collect(),
                deployment_nodes: model
                    .deployment_nodes()
                    .filter(|n| n.parent.is_none())
                    .map(|n| node_document(model, n))
                    .collect(),
                deployment_relationships: model
                    .deployment_relationships()
                    .map(relationship_document)
                    .collect(),
            },
            views: workspace
                .views
                .iter()
                .map(|v| view_document(model, v))
                .collect(),
            styles: workspace.styles.rules().to_vec(),
        }
    }

    /// Rebuild a workspace, re-checking every invariant on the way.
    pub fn into_workspace(self) -> Result<Workspace> {
        let mut workspace = Workspace::new(&self.name, &self.description);
        workspace.enterprise = self.model.enterprise;
        let model = &mut workspace.model;

        // Children listed before their parent wait for a later pass.
        let mut pending: Vec<&ElementDocument> = self.model.elements.iter().collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for e in pending {
                if e.parent_id.is_some_and(|p| model.element(p).is_none()) {
                    deferred.push(e);
                } else {
                    import_element(model, e)?;
                }
            }
            if deferred.len() == before {
                // No progress: the parent is missing altogether.
                import_element(model, deferred[0])?;
                deferred.remove(0);
            }
            pending = deferred;
        }

        for r in &self.model.relationships {
            model.insert_relationship(
                Some(r.id),
                r.source_id,
                r.destination_id,
                &r.description,
                r.technology.as_deref(),
            )?;
            apply_tags(model, r.id, &r.tags);
        }

        for node in &self.model.deployment_nodes {
            import_node(model, node, None)?;
        }

        for r in &self.model.deployment_relationships {
            model.insert_deployment_relationship(
                Some(r.id),
                r.source_id,
                r.destination_id,
                &r.description,
                r.technology.as_deref(),
                r.linked_relationship_id,
            )?;
            apply_tags(model, r.id, &r.tags);
        }

        for v in &self.views {
            import_view(&mut workspace.views, &workspace.model, v)?;
        }

        let mut styles = Styles::new();
        for rule in self.styles {
            styles.add(rule.target, &rule.tag, rule.attributes);
        }
        workspace.styles = styles;
        Ok(workspace)
    }

    /// JSON schema of the document format.
    pub fn json_schema() -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(schemars::schema_for!(Document))
    }
}

impl Workspace {
    pub fn to_document(&self) -> Document {
        Document::from_workspace(self)
    }
}

fn relationship_document(r: &Relationship) -> RelationshipDocument {
    RelationshipDocument {
        id: r.id,
        source_id: r.source,
        destination_id: r.destination,
        description: r.description.clone(),
        technology: r.technology.clone(),
        tags: r.tags.to_vec(),
        linked_relationship_id: r.linked,
    }
}

fn node_document(model: &Model, node: &DeploymentNode) -> DeploymentNodeDocument {
    DeploymentNodeDocument {
        id: node.id,
        environment: node.environment.clone(),
        name: node.name.clone(),
        description: node.description.clone(),
        technology: node.technology.clone(),
        instances: node.instances,
        properties: node.properties.clone(),
        tags: node.tags.to_vec(),
        children: model
            .child_deployment_nodes(node.id)
            .map(|child| node_document(model, child))
            .collect(),
        element_instances: model
            .instances_on(node.id)
            .map(|i| InstanceDocument {
                id: i.id,
                element_id: i.element,
                tags: i.tags.to_vec(),
            })
            .collect(),
    }
}

fn view_document(model: &Model, view: &View) -> ViewDocument {
    let resolved = view.resolve(model);
    ViewDocument {
        key: view.key().to_string(),
        kind: view.kind(),
        subject_id: view.subject(),
        description: view.description().to_string(),
        environment: view.environment().map(str::to_string),
        inclusion: view.inclusion(),
        explicit: view.explicit().collect(),
        automatic_layout: view.automatic_layout(),
        elements: resolved.elements,
        relationships: resolved.relationships,
    }
}

fn import_element(model: &mut Model, e: &ElementDocument) -> Result<()> {
    model.insert_element(
        Some(e.id),
        e.kind,
        e.parent_id,
        &e.name,
        &e.description,
        e.location,
        e.technology.as_deref(),
    )?;
    apply_tags(model, e.id, &e.tags);
    Ok(())
}

fn apply_tags(model: &mut Model, id: Id, tags: &[String]) {
    if let Some(existing) = model.tags_mut(id) {
        for tag in tags {
            existing.add(tag);
        }
    }
}

fn import_node(model: &mut Model, node: &DeploymentNodeDocument, parent: Option<Id>) -> Result<()> {
    let mut spec = NodeSpec::new(
        node.name.as_str(),
        node.description.as_str(),
        node.technology.clone().unwrap_or_default(),
    )
    .instances(node.instances);
    spec = spec.properties(node.properties.clone());
    model.insert_node(Some(node.id), &node.environment, parent, spec)?;
    apply_tags(model, node.id, &node.tags);

    for instance in &node.element_instances {
        model.insert_instance(Some(instance.id), node.id, instance.element_id, false)?;
        apply_tags(model, instance.id, &instance.tags);
    }
    for child in &node.children {
        import_node(model, child, Some(node.id))?;
    }
    Ok(())
}

fn import_view(views: &mut ViewSet, model: &Model, doc: &ViewDocument) -> Result<()> {
    let view = match (doc.kind, doc.subject_id) {
        (ViewKind::SystemLandscape, _) => views.create_landscape_view(&doc.key, &doc.description)?,
        (ViewKind::Deployment, subject) => {
            let environment = doc.environment.as_deref().unwrap_or(&doc.key);
            let view = views.create_deployment_view(model, subject, environment, &doc.description)?;
            view.set_environment(Some(environment.to_string()));
            view
        }
        (ViewKind::SystemContext, Some(system)) => {
            views.create_context_view(model, system, &doc.key, &doc.description)?
        }
        (ViewKind::Container, Some(system)) => {
            views.create_container_view(model, system, &doc.key, &doc.description)?
        }
        (ViewKind::Component, Some(container)) => {
            views.create_component_view(model, container, &doc.key, &doc.description)?
        }
        (_, None) => return Err(ModelError::MissingSubject(doc.key.clone())),
    };
    if let Some(inclusion) = doc.inclusion {
        view.set_inclusion(inclusion)?;
    }
    for id in &doc.explicit {
        view.add(model, *id)?;
    }
    view.set_automatic_layout(doc.automatic_layout);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::StyleAttributes;

    fn sample() -> Workspace {
        let mut ws = Workspace::new("Sample", "A small workspace").with_enterprise("Acme");
        let m = &mut ws.model;
        let system = m.add_software_system("S", "", Location::Internal).unwrap();
        let user = m.add_person("U", "", Location::External).unwrap();
        m.relate(user, system, "uses", None).unwrap();
        let api = m.add_container(system, "API", "", "Rust").unwrap();
        m.add_tag(api, "Service").unwrap();
        let node = m
            .add_deployment_node("Production", NodeSpec::new("web01", "", "Linux").property("Location", "Amsterdam"))
            .unwrap();
        m.instantiate(node, api).unwrap();

        ws.views
            .create_context_view(&ws.model, system, "Context", "")
            .unwrap()
            .add_nearest_neighbours(&ws.model, system)
            .unwrap();
        ws.views
            .create_deployment_view(&ws.model, Some(system), "Production", "")
            .unwrap()
            .add(&ws.model, node)
            .unwrap();
        ws.styles
            .add_element_style("Service", StyleAttributes::new().background("#438dd5"));
        ws
    }

    #[test]
    fn document_lists_every_part() {
        let doc = sample().to_document();
        assert_eq!(doc.model.enterprise.as_deref(), Some("Acme"));
        assert_eq!(doc.model.elements.len(), 3);
        assert_eq!(doc.model.relationships.len(), 1);
        assert_eq!(doc.model.deployment_nodes[0].element_instances.len(), 1);
        assert_eq!(doc.model.deployment_nodes[0].properties["Location"], "Amsterdam");
        assert_eq!(doc.views.len(), 2);
        assert_eq!(doc.styles.len(), 1);
    }

    #[test]
    fn round_trip_preserves_ids_and_tags() {
        let original = sample();
        let doc = original.to_document();
        let json = serde_json::to_string(&doc).unwrap();
        let restored: Document = serde_json::from_str(&json).unwrap();
        let workspace = restored.into_workspace().unwrap();

        assert_eq!(workspace.to_document(), doc);
        let api = workspace
            .model
            .find_element(ElementKind::Container, Some(Id::new(1)), "API")
            .unwrap();
        assert!(api.tags.contains("Service"));
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let mut doc = sample().to_document();
        doc.model.relationships[0].destination_id = Id::new(999);
        assert!(doc.into_workspace().is_err());
    }

    #[test]
    fn schema_mentions_document_parts() {
        let schema = Document::json_schema().unwrap().to_string();
        assert!(schema.contains("deploymentNodes"));
        assert!(schema.contains("automaticLayout"));
    }
}
