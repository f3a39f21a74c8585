//! Compact plain-text rendering of a workspace, for terminals and diffs.

use crate::model::{ElementKind, Location, Model, Relationship};
use crate::workspace::Workspace;
use crate::Id;

const MAX_DESCRIPTION: usize = 80;

pub fn render(workspace: &Workspace) -> String {
    let model = &workspace.model;
    let mut out = String::with_capacity(2048);

    out.push_str("WORKSPACE \"");
    out.push_str(&workspace.name);
    out.push('"');
    if let Some(enterprise) = &workspace.enterprise {
        out.push_str(" enterprise=\"");
        out.push_str(enterprise);
        out.push('"');
    }
    out.push('\n');

    out.push_str("ELEMENTS:\n");
    for e in model.elements() {
        let prefix = match (e.kind, e.location) {
            (ElementKind::Person, _) => "[P]",
            (ElementKind::SoftwareSystem, Location::External) => "[S!]",
            (ElementKind::SoftwareSystem, Location::Internal) => "[S]",
            (ElementKind::Container, _) => "[C]",
            (ElementKind::Component, _) => "[K]",
        };
        out.push_str(prefix);
        out.push(' ');
        out.push_str(&e.id.to_string());
        out.push_str(" \"");
        out.push_str(&e.name);
        out.push_str("\" (");
        out.push_str(e.kind.label());
        if e.location == Location::External {
            out.push_str(",external");
        }
        if let Some(parent) = e.parent {
            out.push_str(",parent=");
            out.push_str(name_of(model, parent));
        }
        out.push(')');
        if let Some(tech) = &e.technology {
            out.push_str(" tech=");
            out.push_str(tech);
        }
        push_user_tags(&mut out, e.tags.user_tags());
        push_description(&mut out, &e.description);
        out.push('\n');
    }

    out.push_str("RELATIONSHIPS:\n");
    for r in model.relationships() {
        push_edge(&mut out, model, r);
    }

    let roots: Vec<_> = model.deployment_nodes().filter(|n| n.parent.is_none()).collect();
    if !roots.is_empty() {
        out.push_str("DEPLOYMENT:\n");
        for environment in model.environments() {
            out.push_str("  ");
            out.push_str(environment);
            out.push_str(":\n");
            for node in roots.iter().filter(|n| n.environment == environment) {
                push_node(&mut out, model, node.id, 2);
            }
        }
        if model.deployment_relationships().next().is_some() {
            out.push_str("DEPLOYMENT RELATIONSHIPS:\n");
            for r in model.deployment_relationships() {
                push_edge(&mut out, model, r);
            }
        }
    }

    if !workspace.views.is_empty() {
        out.push_str("VIEWS:\n");
        for view in workspace.views.iter() {
            let resolved = view.resolve(model);
            out.push_str(&format!(
                "{} ({:?}) elements={} relationships={}",
                view.key(),
                view.kind(),
                resolved.elements.len(),
                resolved.relationships.len()
            ));
            if let Some(subject) = view.subject() {
                out.push_str(" subject=");
                out.push_str(name_of(model, subject));
            }
            if view.automatic_layout() {
                out.push_str(" autolayout");
            }
            out.push('\n');
        }
    }

    out
}

fn push_node(out: &mut String, model: &Model, id: Id, depth: usize) {
    let Some(node) = model.deployment_node(id) else {
        return;
    };
    out.push_str(&"  ".repeat(depth));
    out.push_str("[N] ");
    out.push_str(&node.id.to_string());
    out.push_str(" \"");
    out.push_str(&node.name);
    out.push('"');
    if let Some(tech) = &node.technology {
        out.push_str(" tech=");
        out.push_str(tech);
    }
    if node.instances != 1 {
        out.push_str(&format!(" x{}", node.instances));
    }
    for (key, value) in &node.properties {
        out.push(' ');
        out.push_str(key);
        if !value.is_empty() {
            out.push('=');
            out.push_str(value);
        }
    }
    push_user_tags(out, node.tags.user_tags());
    out.push('\n');

    for instance in model.instances_on(id) {
        out.push_str(&"  ".repeat(depth + 1));
        out.push_str("[I] ");
        out.push_str(&instance.id.to_string());
        out.push_str(" \"");
        out.push_str(name_of(model, instance.element));
        out.push('"');
        push_user_tags(out, instance.tags.user_tags());
        out.push('\n');
    }
    for child in model.child_deployment_nodes(id) {
        push_node(out, model, child.id, depth + 1);
    }
}

fn push_edge(out: &mut String, model: &Model, r: &Relationship) {
    out.push_str(&r.source.to_string());
    out.push_str(" \"");
    out.push_str(name_of(model, r.source));
    out.push_str("\" --[");
    out.push_str(&r.description);
    if let Some(tech) = &r.technology {
        out.push('/');
        out.push_str(tech);
    }
    out.push_str("]--> ");
    out.push_str(&r.destination.to_string());
    out.push_str(" \"");
    out.push_str(name_of(model, r.destination));
    out.push('"');
    push_user_tags(out, r.tags.user_tags());
    out.push('\n');
}

fn push_user_tags<'a>(out: &mut String, tags: impl Iterator<Item = &'a str>) {
    let tags: Vec<&str> = tags.collect();
    if !tags.is_empty() {
        out.push_str(" #");
        out.push_str(&tags.join(",#"));
    }
}

fn push_description(out: &mut String, description: &str) {
    if description.is_empty() {
        return;
    }
    out.push_str(" | \"");
    if description.chars().count() > MAX_DESCRIPTION {
        out.extend(description.chars().take(MAX_DESCRIPTION));
        out.push_str("...");
    } else {
        out.push_str(description);
    }
    out.push('"');
}

/// Display name of an element, deployment node or instance.
fn name_of(model: &Model, id: Id) -> &str {
    if let Some(e) = model.element(id) {
        return &e.name;
    }
    if let Some(n) = model.deployment_node(id) {
        return &n.name;
    }
    model
        .instance(id)
        .and_then(|i| model.element(i.element))
        .map(|e| e.name.as_str())
        .unwrap_or("?")
}
