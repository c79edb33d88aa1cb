use super::types::ObjectDefinition;
use crate::error::{ObjdefError, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// A definition document: object identifiers mapped to their raw bodies,
/// in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionDocument {
    objects: Map<String, Value>,
}

impl DefinitionDocument {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(objects) => Ok(DefinitionDocument { objects }),
            _ => Err(ObjdefError::Other(
                "definition document must map identifiers to objects".into(),
            )),
        }
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn raw(&self, identifier: &str) -> Option<&Value> {
        self.objects.get(identifier)
    }

    /// Parse the body registered under `identifier`.
    pub fn definition(&self, identifier: &str) -> Result<ObjectDefinition> {
        let body = self
            .raw(identifier)
            .ok_or_else(|| ObjdefError::NotFound(identifier.to_string()))?;
        ObjectDefinition::from_value(identifier, body)
    }
}

/// Parse a definition document file; `.yaml`/`.yml` files are read as YAML,
/// everything else as JSON.
pub fn parse_document(path: &Path) -> Result<DefinitionDocument> {
    let content = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        parse_document_yaml_str(&content)
    } else {
        parse_document_str(&content)
    }
}

/// Parse a JSON definition document.
pub fn parse_document_str(content: &str) -> Result<DefinitionDocument> {
    let value: Value = serde_json::from_str(content)?;
    DefinitionDocument::from_value(value)
}

/// Parse a YAML definition document.
pub fn parse_document_yaml_str(content: &str) -> Result<DefinitionDocument> {
    let value: Value = serde_yaml::from_str(content)?;
    DefinitionDocument::from_value(value)
}
