use thiserror::Error;

use crate::Id;

/// Construction errors. Any of these leaves the workspace unpublishable, so
/// callers are expected to abort the build rather than recover.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("a {kind} named '{name}' already exists in this scope")]
    DuplicateName { kind: &'static str, name: String },

    #[error("parent {0} is not a valid parent in this workspace")]
    UnknownParent(Id),

    #[error("element {0} does not exist in this workspace")]
    UnknownElement(Id),

    #[error("element {0} cannot have a relationship with itself")]
    SelfRelationship(Id),

    #[error("relationship {from} -> {to} '{description}' already exists")]
    DuplicateRelationship {
        from: Id,
        to: Id,
        description: String,
    },

    #[error("a view with key '{0}' already exists")]
    DuplicateViewName(String),

    #[error("view '{view}' does not support {inclusion}")]
    UnsupportedInclusion {
        view: String,
        inclusion: &'static str,
    },

    #[error("view '{0}' needs a subject element")]
    MissingSubject(String),

    #[error("{id} is not part of the '{environment}' environment")]
    WrongEnvironment { id: Id, environment: String },

    #[error("id {0} is used more than once")]
    DuplicateId(Id),
}

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid document: {0}")]
    Model(#[from] ModelError),
}
