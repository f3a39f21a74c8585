//! The sample workspace: an accounting product for small businesses, its
//! neighbours, its containers and components, and how production runs it.

use augur_core::{
    properties_from_pairs, Location, NodeSpec, Result, Shape, StyleAttributes, Workspace,
};
use tracing::info;

pub const WORKSPACE_NAME: &str = "DemoApp C4 Model";
pub const WORKSPACE_DESCRIPTION: &str = "C4 architecture model of the DemoApp accounting product";

const COMPANY: &str = "Demo Software Company";
const USES: &str = "uses";
const INTERNAL_SYSTEM: &str = "Internal System";
const EXTERNAL_SYSTEM: &str = "External System";
const WEB_BROWSER: &str = "Web Browser";
const DATABASE: &str = "Database";
const FAILOVER: &str = "Failover";
const PRODUCTION: &str = "Production";

pub fn build() -> Result<Workspace> {
    let mut ws = Workspace::new(WORKSPACE_NAME, WORKSPACE_DESCRIPTION).with_enterprise(COMPANY);
    let m = &mut ws.model;

    // People and systems
    let accounting = m.add_software_system(
        "Accounting System",
        "Bookkeeping for small businesses and freelancers",
        Location::Internal,
    )?;
    let itsm = m.add_software_system("ITSM System", "Internal CRM application", Location::Internal)?;
    m.add_tag(itsm, INTERNAL_SYSTEM)?;
    m.relate(accounting, itsm, "fetches subscription details from", None)?;

    let website = m.add_software_system(
        "Website",
        &format!("Public website of {COMPANY}"),
        Location::Internal,
    )?;
    m.add_tag(website, WEB_BROWSER)?;
    m.relate(website, itsm, "registers subscriptions in", None)?;

    let webshop = m.add_software_system(
        "Webshop",
        "Webshop integration on behalf of the customer",
        Location::External,
    )?;
    m.add_tag(webshop, EXTERNAL_SYSTEM)?;
    m.relate(accounting, webshop, "receives data from", None)?;

    let bank = m.add_software_system(
        "Bank",
        "Bank integration on behalf of the customer",
        Location::External,
    )?;
    m.add_tag(bank, EXTERNAL_SYSTEM)?;
    m.relate(accounting, bank, "receives data from", None)?;

    let key_user = m.add_person(
        "Key User",
        "The customer's user who signed up for the subscription",
        Location::External,
    )?;
    m.relate(key_user, accounting, USES, None)?;
    m.relate(key_user, website, USES, None)?;

    let user = m.add_person("User", "An employee of the customer", Location::External)?;
    m.relate(user, accounting, USES, None)?;

    let accountant = m.add_person("Accountant", "The customer's accountant", Location::External)?;
    m.relate(accountant, accounting, USES, None)?;
    m.relate(key_user, accountant, "asks for a review by", None)?;

    let helpdesk = m.add_person(
        "Helpdesk Employee",
        &format!("Helpdesk employee of {COMPANY}"),
        Location::Internal,
    )?;
    m.relate(helpdesk, accounting, USES, None)?;
    m.relate(helpdesk, itsm, USES, None)?;
    m.relate(key_user, helpdesk, "asks for help from", None)?;

    ws.views
        .create_landscape_view("SystemLandscape", "System landscape of the accounting system.")?
        .include_all()?
        .enable_automatic_layout();

    // Containers
    let m = &mut ws.model;
    let core = m.add_container(accounting, "Core Module", "Setup and user management", "C#")?;
    m.relate(core, itsm, "receives data from", None)?;

    let bank_module = m.add_container(accounting, "Bank Module", "Imports payment data", "C#")?;
    m.relate(bank_module, bank, "receives data from", None)?;

    let integrations = m.add_container(
        accounting,
        "Integrations Module",
        "Sets up the external integrations",
        "C#",
    )?;
    m.relate(integrations, webshop, "receives data from", None)?;

    let ledger = m.add_container(
        accounting,
        "Ledger Module",
        "Core bookkeeping such as journals and reports",
        "C#",
    )?;
    m.relate(ledger, webshop, "receives data from", None)?;

    let invoicing = m.add_container(accounting, "Invoicing Module", "Invoices and quotes", "C#")?;
    m.relate(invoicing, ledger, "hands sales orders to", None)?;

    let import = m.add_container(accounting, "Import Module", "Imports and exports data", "C#")?;
    m.relate(import, ledger, "hands contacts to", None)?;
    m.relate(import, invoicing, "hands products to", None)?;

    for module in [core, ledger, invoicing, bank_module, integrations, import] {
        m.relate(key_user, module, USES, None)?;
    }
    for module in [ledger, invoicing, bank_module] {
        m.relate(user, module, USES, None)?;
    }
    m.relate(accountant, ledger, USES, None)?;
    m.relate(helpdesk, ledger, USES, None)?;

    let system_db = m.add_container(
        accounting,
        "System Database",
        "Users, subscriptions, administrations, hashed credentials, access logs",
        "Relational Database Schema",
    )?;
    m.add_tag(system_db, DATABASE)?;
    m.relate(core, system_db, USES, None)?;

    let books_db = m.add_container(
        accounting,
        "Bookkeeping Database",
        "Bookkeeping data per subscription and administration",
        "Relational Database Schema",
    )?;
    m.add_tag(books_db, DATABASE)?;
    for module in [ledger, invoicing, bank_module] {
        m.relate(module, books_db, USES, None)?;
    }

    // Components
    let statement_import = m.add_component(
        bank_module,
        "Bank Statement Import",
        "Bank statement import screen",
        "ASP.NET Web Forms",
    )?;
    m.add_tag(statement_import, WEB_BROWSER)?;
    let payment_logic = m.add_component(
        bank_module,
        "Payment Logic Service",
        "Business layer for bank statements",
        "C#",
    )?;
    m.add_tag(payment_logic, INTERNAL_SYSTEM)?;
    let payment_data = m.add_component(
        bank_module,
        "Payment Data Service",
        "Data layer for bank statements",
        "C#",
    )?;
    m.add_tag(payment_data, INTERNAL_SYSTEM)?;

    m.relate(statement_import, payment_logic, USES, None)?;
    m.relate(payment_logic, payment_data, USES, None)?;
    m.relate(payment_logic, bank, USES, None)?;

    let payments = m.add_component(bank_module, "Bank Payments", "Payment orders", "ASP.NET Web Forms")?;
    m.add_tag(payments, WEB_BROWSER)?;
    m.relate(payments, payment_logic, USES, None)?;

    let settings_view = m.add_component(
        bank_module,
        "Bank Statement Settings",
        "Bank statement settings screen",
        "ASP.NET Web Forms",
    )?;
    m.add_tag(settings_view, WEB_BROWSER)?;
    let settings_logic = m.add_component(
        bank_module,
        "Bank Settings Logic Service",
        "Business layer for bank settings",
        "C#",
    )?;
    m.add_tag(settings_logic, INTERNAL_SYSTEM)?;
    let settings_data = m.add_component(
        bank_module,
        "Bank Settings Data Service",
        "Data layer for bank settings",
        "C#",
    )?;
    m.add_tag(settings_data, INTERNAL_SYSTEM)?;

    m.relate(settings_view, settings_logic, USES, None)?;
    m.relate(settings_logic, settings_data, USES, None)?;
    m.relate(payment_data, books_db, "reads from and writes to", Some("Linq2Sql"))?;
    m.relate(settings_data, books_db, "reads from and writes to", Some("Linq2Sql"))?;

    let product_import = m.add_component(
        import,
        "Product Import",
        "Product import screen",
        "ASP.NET Web Forms",
    )?;
    m.add_tag(product_import, WEB_BROWSER)?;
    let import_logic = m.add_component(
        import,
        "Import Export Logic Service",
        "Business layer for import and export",
        "C#",
    )?;
    m.add_tag(import_logic, INTERNAL_SYSTEM)?;
    let import_data = m.add_component(
        import,
        "Import Export Data Service",
        "Data layer for import and export",
        "C#",
    )?;
    m.add_tag(import_data, INTERNAL_SYSTEM)?;

    m.relate(product_import, import_logic, USES, None)?;
    m.relate(import_logic, import_data, USES, None)?;
    m.relate(import_data, books_db, "reads from and writes to", Some("Linq2Sql"))?;

    // Views
    let model = &ws.model;
    ws.views
        .create_context_view(
            model,
            accounting,
            "SystemContext",
            "System context of the accounting system.",
        )?
        .add_nearest_neighbours(model, accounting)?
        .enable_automatic_layout();

    let containers = ws.views.create_container_view(
        model,
        accounting,
        "Containers",
        "Containers of the accounting system.",
    )?;
    containers.enable_automatic_layout();
    for person in [key_user, user, accountant, helpdesk] {
        containers.add(model, person)?;
    }
    containers.add_all_containers()?;
    for system in [webshop, bank, itsm] {
        containers.add(model, system)?;
    }

    ws.views
        .create_component_view(
            model,
            bank_module,
            "Bank Components",
            "Components of the bank module.",
        )?
        .enable_automatic_layout()
        .add(model, books_db)?
        .add_all_components()?
        .add(model, bank)?;

    ws.views
        .create_component_view(
            model,
            import,
            "Import-Export Components",
            "Components of the import module.",
        )?
        .enable_automatic_layout()
        .add(model, books_db)?
        .add_all_components()?;

    // Deployment
    let m = &mut ws.model;
    let data_center = m.add_deployment_node(
        PRODUCTION,
        NodeSpec::new(COMPANY, "", format!("{COMPANY} data center")),
    )?;
    let customer_computer = m.add_deployment_node(
        PRODUCTION,
        NodeSpec::new("Customer's computer", "", "Microsoft Windows or Apple macOS"),
    )?;
    let browser = m.add_child_deployment_node(
        customer_computer,
        NodeSpec::new("Web Browser", "", "Chrome, Firefox, Edge or IE11"),
    )?;
    m.instantiate(browser, ledger)?;
    m.add_tag(customer_computer, WEB_BROWSER)?;

    let web_server = m.add_child_deployment_node(
        data_center,
        NodeSpec::new(
            format!("{COMPANY}-web***"),
            "A web server in a web server farm",
            "Windows 2019",
        )
        .instances(2)
        .properties(properties_from_pairs(&["Location=Amsterdam"])),
    )?;
    let iis = m.add_child_deployment_node(
        web_server,
        NodeSpec::new("Microsoft IIS", "Microsoft web server.", "IIS").properties(
            properties_from_pairs(&["Xmx=512M", "Xms=1024M", ".Net Framework 4.8"]),
        ),
    )?;
    m.instantiate(iis, ledger)?;
    m.deployment_relate(customer_computer, web_server, USES, Some("https"))?;

    let db01 = m.add_child_deployment_node(
        data_center,
        NodeSpec::new(format!("{COMPANY}-db01"), "Primary database server.", "Windows 2019")
            .property("Location", "Amsterdam"),
    )?;
    let primary_sql = m.add_child_deployment_node(
        db01,
        NodeSpec::new(
            "SQL Server - Primary",
            format!("Primary {PRODUCTION} database server."),
            "SqlServer 2017",
        ),
    )?;
    m.instantiate(primary_sql, system_db)?;
    m.instantiate(primary_sql, books_db)?;

    let db02 = m.add_child_deployment_node(
        data_center,
        NodeSpec::new(format!("{COMPANY}-db02"), "Secondary database server.", "Windows 2019")
            .property("Location", "Amsterdam"),
    )?;
    m.add_tag(db02, FAILOVER)?;
    let secondary_sql = m.add_child_deployment_node(
        db02,
        NodeSpec::new(
            "SQL Server - Secondary",
            "Standby database server, used for failover only.",
            "SqlServer 2017",
        ),
    )?;
    m.add_tag(secondary_sql, FAILOVER)?;
    let standby_system_db = m.instantiate(secondary_sql, system_db)?;
    let standby_books_db = m.instantiate(secondary_sql, books_db)?;

    let replication = m.deployment_relate(primary_sql, secondary_sql, "Replicates data to", None)?;
    m.add_tag(standby_system_db, FAILOVER)?;
    m.add_tag(standby_books_db, FAILOVER)?;
    let late = m.propagate_tags();

    let model = &ws.model;
    ws.views
        .create_deployment_view(
            model,
            Some(accounting),
            PRODUCTION,
            &format!("Production environment of {COMPANY}."),
        )?
        .add(model, data_center)?
        .add(model, customer_computer)?
        .add(model, replication)?;

    // Styles
    let styles = &mut ws.styles;
    styles.add_element_style(
        augur_core::tags::SOFTWARE_SYSTEM,
        StyleAttributes::new().background("#1168bd").color("#ffffff"),
    );
    styles.add_element_style(
        augur_core::tags::CONTAINER,
        StyleAttributes::new().background("#438dd5").color("#ffffff"),
    );
    styles.add_element_style(
        augur_core::tags::COMPONENT,
        StyleAttributes::new().background("#85bbf0").color("#000000"),
    );
    styles.add_element_style(
        augur_core::tags::PERSON,
        StyleAttributes::new()
            .background("#08427b")
            .color("#ffffff")
            .shape(Shape::Person),
    );
    styles.add_element_style(
        INTERNAL_SYSTEM,
        StyleAttributes::new().background("#999999").color("#ffffff"),
    );
    styles.add_element_style(
        EXTERNAL_SYSTEM,
        StyleAttributes::new().background("#999999").color("#ffffff"),
    );
    styles.add_element_style(WEB_BROWSER, StyleAttributes::new().shape(Shape::WebBrowser));
    styles.add_element_style(DATABASE, StyleAttributes::new().shape(Shape::Cylinder));
    styles.add_element_style(FAILOVER, StyleAttributes::new().opacity(25));
    styles.add_relationship_style(FAILOVER, StyleAttributes::new().opacity(25).position(70));

    info!(
        elements = ws.model.elements().count(),
        relationships = ws.model.relationships().count(),
        deployment_nodes = ws.model.deployment_nodes().count(),
        views = ws.views.len(),
        late_tags = late,
        "workspace built"
    );
    Ok(ws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_core::{ElementKind, ViewKind};

    #[test]
    fn builds_without_errors() {
        let ws = build().unwrap();
        assert_eq!(ws.model.elements_of(ElementKind::SoftwareSystem).count(), 5);
        assert_eq!(ws.model.elements_of(ElementKind::Person).count(), 4);
        assert_eq!(ws.model.elements_of(ElementKind::Container).count(), 8);
        assert_eq!(ws.model.elements_of(ElementKind::Component).count(), 10);
        assert_eq!(ws.views.len(), 6);
        assert_eq!(ws.model.environments(), vec![PRODUCTION]);
    }

    #[test]
    fn standby_database_traffic_is_failover() {
        let ws = build().unwrap();
        let standby_node = ws
            .model
            .deployment_nodes()
            .find(|n| n.name == "SQL Server - Secondary")
            .unwrap()
            .id;
        let standby_instances: Vec<_> = ws.model.instances_on(standby_node).map(|i| i.id).collect();
        assert_eq!(standby_instances.len(), 2);

        let inbound: Vec<_> = ws
            .model
            .deployment_relationships()
            .filter(|r| r.destination == standby_node || standby_instances.contains(&r.destination))
            .collect();
        assert!(!inbound.is_empty());
        assert!(inbound.iter().all(|r| r.tags.contains(FAILOVER)));

        let style = ws.styles.resolve_relationship(&inbound[0].tags);
        assert_eq!(style.opacity, Some(25));
        assert_eq!(style.position, Some(70));
    }

    #[test]
    fn production_view_stays_in_production() {
        let ws = build().unwrap();
        let view = ws.views.get(PRODUCTION).unwrap();
        assert_eq!(view.kind(), ViewKind::Deployment);
        let resolved = view.resolve(&ws.model);
        assert!(resolved
            .elements
            .iter()
            .all(|id| ws.model.deployment_node(*id).map_or(true, |n| n.environment == PRODUCTION)));
        assert!(resolved.elements.len() > 10);
    }

    #[test]
    fn document_round_trips() {
        let ws = build().unwrap();
        let doc = ws.to_document();
        let rebuilt = doc.clone().into_workspace().unwrap();
        assert_eq!(rebuilt.to_document(), doc);
    }
}
