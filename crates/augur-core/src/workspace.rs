use crate::model::Model;
use crate::styles::Styles;
use crate::views::ViewSet;

/// Everything that gets published together: the model with its deployment
/// topology, the views over it and the style rules.
#[derive(Debug, Default)]
pub struct Workspace {
    pub name: String,
    pub description: String,
    pub enterprise: Option<String>,
    pub model: Model,
    pub views: ViewSet,
    pub styles: Styles,
}

impl Workspace {
    pub fn new(name: &str, description: &str) -> Self {
        Workspace {
            name: name.to_string(),
            description: description.to_string(),
            ..Self::default()
        }
    }

    pub fn with_enterprise(mut self, enterprise: &str) -> Self {
        self.enterprise = Some(enterprise.to_string());
        self
    }
}
