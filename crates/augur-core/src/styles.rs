use serde::{Deserialize, Serialize};

use crate::tags::Tags;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Shape {
    Box,
    RoundedBox,
    Circle,
    Ellipse,
    Hexagon,
    Cylinder,
    Pipe,
    Person,
    Robot,
    Folder,
    WebBrowser,
    MobileDevicePortrait,
    MobileDeviceLandscape,
    Component,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum StyleTarget {
    Element,
    Relationship,
}

/// Visual attributes of one rule. Unset attributes leave whatever an earlier
/// rule chose.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StyleAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Foreground (text and line) color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
    /// 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<u8>,
    /// Label position along an edge, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,
}

impl StyleAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background(mut self, color: &str) -> Self {
        self.background = Some(color.to_string());
        self
    }

    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn opacity(mut self, opacity: u8) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn position(mut self, position: u8) -> Self {
        self.position = Some(position);
        self
    }

    /// Overlay `other` on top of `self`, attribute by attribute.
    fn merge(&mut self, other: &StyleAttributes) {
        if other.background.is_some() {
            self.background.clone_from(&other.background);
        }
        if other.color.is_some() {
            self.color.clone_from(&other.color);
        }
        self.shape = other.shape.or(self.shape);
        self.opacity = other.opacity.or(self.opacity);
        self.position = other.position.or(self.position);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StyleRule {
    pub target: StyleTarget,
    pub tag: String,
    #[serde(flatten)]
    pub attributes: StyleAttributes,
}

/// Ordered style rules. Nothing here touches the model; consumers resolve
/// an item's tags against the rules when they need a style.
#[derive(Debug, Clone, Default)]
pub struct Styles {
    rules: Vec<StyleRule>,
}

impl Styles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element_style(&mut self, tag: &str, attributes: StyleAttributes) {
        self.add(StyleTarget::Element, tag, attributes);
    }

    pub fn add_relationship_style(&mut self, tag: &str, attributes: StyleAttributes) {
        self.add(StyleTarget::Relationship, tag, attributes);
    }

    pub fn add(&mut self, target: StyleTarget, tag: &str, attributes: StyleAttributes) {
        self.rules.push(StyleRule {
            target,
            tag: tag.to_string(),
            attributes,
        });
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn resolve_element(&self, tags: &Tags) -> StyleAttributes {
        self.resolve(StyleTarget::Element, tags)
    }

    pub fn resolve_relationship(&self, tags: &Tags) -> StyleAttributes {
        self.resolve(StyleTarget::Relationship, tags)
    }

    fn resolve(&self, target: StyleTarget, tags: &Tags) -> StyleAttributes {
        let mut resolved = StyleAttributes::default();
        for rule in self
            .rules
            .iter()
            .filter(|r| r.target == target && tags.contains(&r.tag))
        {
            resolved.merge(&rule.attributes);
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Tags {
        names.iter().copied().collect()
    }

    #[test]
    fn last_rule_wins_per_attribute() {
        let mut styles = Styles::new();
        styles.add_element_style("A", StyleAttributes::new().color("red"));
        styles.add_element_style("A", StyleAttributes::new().color("blue"));
        assert_eq!(
            styles.resolve_element(&tags(&["A"])).color.as_deref(),
            Some("blue")
        );
    }

    #[test]
    fn rules_layer_instead_of_replacing() {
        let mut styles = Styles::new();
        styles.add_element_style(
            "Container",
            StyleAttributes::new().background("#438dd5").color("#ffffff"),
        );
        styles.add_element_style("Database", StyleAttributes::new().shape(Shape::Cylinder));

        let resolved = styles.resolve_element(&tags(&["Element", "Container", "Database"]));
        assert_eq!(resolved.background.as_deref(), Some("#438dd5"));
        assert_eq!(resolved.color.as_deref(), Some("#ffffff"));
        assert_eq!(resolved.shape, Some(Shape::Cylinder));
    }

    #[test]
    fn element_and_relationship_rules_are_separate() {
        let mut styles = Styles::new();
        styles.add_element_style("Failover", StyleAttributes::new().opacity(25));
        styles.add_relationship_style("Failover", StyleAttributes::new().opacity(25).position(70));

        let element = styles.resolve_element(&tags(&["Failover"]));
        let relationship = styles.resolve_relationship(&tags(&["Failover"]));
        assert_eq!(element.position, None);
        assert_eq!(relationship.position, Some(70));
    }

    #[test]
    fn unused_tags_are_inert() {
        let mut styles = Styles::new();
        styles.add_element_style("Nobody", StyleAttributes::new().color("red"));
        assert_eq!(styles.resolve_element(&tags(&["Other"])), StyleAttributes::default());
    }
}
