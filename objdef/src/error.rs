use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObjdefError {
    /// Malformed or missing required shape in a definition.
    #[error("Definition error in '{identifier}': {message}")]
    Definition { identifier: String, message: String },

    #[error("Definition not found: {0}")]
    NotFound(String),

    /// The live-table collaborator could not answer.
    #[error("Table inspection error: {0}")]
    Inspection(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ObjdefError {
    pub fn definition(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        ObjdefError::Definition {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ObjdefError>;
