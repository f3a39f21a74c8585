pub mod deployment;
pub mod document;
mod error;
pub mod model;
pub mod outline;
pub mod store;
pub mod styles;
pub mod tags;
pub mod views;
pub mod workspace;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use deployment::{properties_from_pairs, DeploymentNode, Instance, NodeSpec, Properties};
pub use document::Document;
pub use error::{ModelError, Result, StoreError};
pub use model::{Element, ElementKind, Location, Model, Relationship};
pub use styles::{Shape, StyleAttributes, StyleRule, StyleTarget, Styles};
pub use tags::Tags;
pub use views::{Inclusion, ResolvedView, View, ViewKind, ViewSet};
pub use workspace::Workspace;

/// Identity of anything addressable in a workspace: elements, relationships,
/// deployment nodes and instances share one sequence.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
#[serde(transparent)]
pub struct Id(u32);

impl Id {
    pub fn new(raw: u32) -> Self {
        Id(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
