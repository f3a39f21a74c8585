use augur_core::{
    ElementKind, Location, ModelError, NodeSpec, StyleAttributes, ViewKind, Workspace,
};

#[test]
fn context_view_document_contains_subject_and_user() {
    let mut ws = Workspace::new("Scenario", "");
    let system = ws.model.add_software_system("S", "", Location::Internal).unwrap();
    let user = ws.model.add_person("U", "", Location::External).unwrap();
    ws.model.relate(user, system, "uses", None).unwrap();

    let view = ws
        .views
        .create_context_view(&ws.model, system, "Context", "")
        .unwrap();
    view.add_nearest_neighbours(&ws.model, system).unwrap();
    assert_eq!(view.explicit().collect::<Vec<_>>(), vec![user]);

    let doc = ws.to_document();
    let mut names: Vec<&str> = doc.model.elements.iter().map(|e| e.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["S", "U"]);

    assert_eq!(doc.model.relationships.len(), 1);
    let r = &doc.model.relationships[0];
    assert_eq!((r.source_id, r.destination_id, r.description.as_str()), (user, system, "uses"));

    assert_eq!(doc.views[0].kind, ViewKind::SystemContext);
    assert_eq!(doc.views[0].elements, vec![system, user]);
}

#[test]
fn second_system_with_same_name_is_rejected() {
    let mut ws = Workspace::new("Scenario", "");
    ws.model.add_software_system("X", "first", Location::Internal).unwrap();
    let err = ws
        .model
        .add_software_system("X", "second", Location::External)
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateName { .. }));

    let named_x: Vec<_> = ws
        .model
        .elements_of(ElementKind::SoftwareSystem)
        .filter(|e| e.name == "X")
        .collect();
    assert_eq!(named_x.len(), 1);
    assert_eq!(named_x[0].description, "first");
}

#[test]
fn failover_tag_reaches_relationships_created_earlier() {
    let mut ws = Workspace::new("Scenario", "");
    let m = &mut ws.model;
    let system = m.add_software_system("Accounting", "", Location::Internal).unwrap();
    let web = m.add_container(system, "Web", "", "ASP.NET").unwrap();
    let db = m.add_container(system, "Database", "", "SQL Server").unwrap();
    m.relate(web, db, "reads from and writes to", Some("SQL/TCP")).unwrap();

    let web01 = m
        .add_deployment_node("Production", NodeSpec::new("web01", "", "Windows"))
        .unwrap();
    let primary = m
        .add_deployment_node("Production", NodeSpec::new("db01", "", "SQL Server"))
        .unwrap();
    let secondary = m
        .add_deployment_node("Production", NodeSpec::new("db02", "", "SQL Server"))
        .unwrap();
    m.instantiate(web01, web).unwrap();
    m.instantiate(primary, db).unwrap();
    let standby = m.instantiate(secondary, db).unwrap();
    let replication = m
        .deployment_relate(primary, secondary, "Replicates data to", None)
        .unwrap();

    m.add_tag(standby, "Failover").unwrap();
    m.add_tag(secondary, "Failover").unwrap();

    let into_standby: Vec<_> = m
        .deployment_relationships()
        .filter(|r| r.destination == standby)
        .collect();
    assert_eq!(into_standby.len(), 1);
    assert!(into_standby[0].tags.contains("Failover"));
    assert!(m.tags(replication).unwrap().contains("Failover"));

    ws.styles.add_relationship_style(
        "Failover",
        StyleAttributes::new().opacity(25).position(70),
    );
    let style = ws
        .styles
        .resolve_relationship(ws.model.tags(replication).unwrap());
    assert_eq!(style.opacity, Some(25));
}

#[test]
fn published_document_carries_tags_set_before_the_relationship() {
    let mut ws = Workspace::new("Scenario", "");
    let m = &mut ws.model;
    let system = m.add_software_system("Accounting", "", Location::Internal).unwrap();
    let web = m.add_container(system, "Web", "", "ASP.NET").unwrap();
    let db = m.add_container(system, "Database", "", "SQL Server").unwrap();
    m.relate(web, db, "reads from and writes to", Some("SQL/TCP")).unwrap();

    let secondary = m
        .add_deployment_node("Production", NodeSpec::new("db02", "", "SQL Server"))
        .unwrap();
    let standby = m.instantiate(secondary, db).unwrap();
    m.add_tag(standby, "Failover").unwrap();
    let web01 = m
        .add_deployment_node("Production", NodeSpec::new("web01", "", "Windows"))
        .unwrap();
    m.instantiate(web01, web).unwrap();

    let doc = ws.to_document();
    let into_standby: Vec<_> = doc
        .model
        .deployment_relationships
        .iter()
        .filter(|r| r.destination_id == standby)
        .collect();
    assert_eq!(into_standby.len(), 1);
    assert!(into_standby[0].tags.iter().any(|t| t == "Failover"));
}

#[test]
fn landscape_picks_up_elements_added_after_the_view() {
    let mut ws = Workspace::new("Scenario", "");
    ws.views
        .create_landscape_view("Landscape", "")
        .unwrap()
        .include_all()
        .unwrap();

    let late = ws.model.add_software_system("Late", "", Location::External).unwrap();
    let doc = ws.to_document();
    assert_eq!(doc.views[0].elements, vec![late]);
}

#[test]
fn document_survives_a_json_round_trip() {
    let mut ws = Workspace::new("Scenario", "round trip").with_enterprise("Acme");
    let m = &mut ws.model;
    let system = m.add_software_system("S", "", Location::Internal).unwrap();
    let api = m.add_container(system, "API", "", "Rust").unwrap();
    let handler = m.add_component(api, "Handler", "", "axum").unwrap();
    let user = m.add_person("U", "", Location::External).unwrap();
    m.relate(user, handler, "calls", Some("HTTPS")).unwrap();
    let node = m
        .add_deployment_node("Production", NodeSpec::new("web01", "", "Linux").instances(3))
        .unwrap();
    m.instantiate(node, api).unwrap();
    m.add_tag(node, "Primary").unwrap();

    ws.views
        .create_component_view(&ws.model, api, "Components", "")
        .unwrap()
        .add_all_components()
        .unwrap()
        .enable_automatic_layout();

    let doc = ws.to_document();
    let json = serde_json::to_string_pretty(&doc).unwrap();
    let rebuilt = serde_json::from_str::<augur_core::Document>(&json)
        .unwrap()
        .into_workspace()
        .unwrap();

    assert_eq!(rebuilt.to_document(), doc);
    assert_eq!(rebuilt.enterprise.as_deref(), Some("Acme"));
    assert_eq!(rebuilt.model.deployment_node(node).unwrap().instances, 3);
    assert!(rebuilt.model.tags(node).unwrap().contains("Primary"));
    let view = rebuilt.views.get("Components").unwrap();
    assert!(view.automatic_layout());
    assert_eq!(view.resolve(&rebuilt.model).elements, vec![handler]);

    // New ids continue after the imported ones.
    let mut rebuilt = rebuilt;
    let next = rebuilt.model.add_person("Admin", "", Location::Internal).unwrap();
    assert!(doc.model.elements.iter().all(|e| e.id < next));
}
