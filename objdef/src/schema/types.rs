use crate::error::{ObjdefError, Result};
use crate::index::IndexOverride;
use crate::property::PropertyPatch;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `type` of an object-level definition node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Object,
    ObjectExtension,
    ObjectRelation,
    Codeset,
}

impl ObjectKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "object" => Some(ObjectKind::Object),
            "object_extension" => Some(ObjectKind::ObjectExtension),
            "object_relation" => Some(ObjectKind::ObjectRelation),
            "codeset" => Some(ObjectKind::Codeset),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Object => "object",
            ObjectKind::ObjectExtension => "object_extension",
            ObjectKind::ObjectRelation => "object_relation",
            ObjectKind::Codeset => "codeset",
        }
    }
}

/// Whether a member body describes a nested object rather than a column.
pub fn is_object_type(value: &Value) -> bool {
    value
        .get("type")
        .and_then(Value::as_str)
        .map(|t| t.starts_with("object"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfRelationship {
    #[default]
    None,
    Hierarchical,
}

/// Per-object language setting; `single` switches translation tables off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageMode {
    #[default]
    Multiple,
    Single,
}

/// One member of an object definition, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Property(PropertyPatch),
    Object(ObjectDefinition),
}

/// A parsed definition node.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDefinition {
    pub identifier: String,
    pub kind: ObjectKind,
    pub self_relationship: SelfRelationship,
    /// Concept an `object_extension` extends, e.g. `language`.
    pub extension_of: Option<String>,
    /// Concept an `object_relation` links to.
    pub relation_to: Option<String>,
    pub language: LanguageMode,
    /// Scalar attributes of the object itself, re-emitted verbatim.
    pub header: IndexMap<String, Value>,
    pub members: IndexMap<String, Declaration>,
    pub indexes: Vec<IndexOverride>,
}

impl ObjectDefinition {
    pub fn from_value(identifier: &str, value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            ObjdefError::definition(identifier, "definition body is not an object")
        })?;
        let type_name = map.get("type").and_then(Value::as_str).unwrap_or_default();
        let kind = ObjectKind::parse(type_name).ok_or_else(|| {
            ObjdefError::definition(identifier, format!("unsupported object type '{type_name}'"))
        })?;

        let mut def = ObjectDefinition {
            identifier: identifier.to_string(),
            kind,
            self_relationship: SelfRelationship::None,
            extension_of: None,
            relation_to: None,
            language: LanguageMode::Multiple,
            header: IndexMap::new(),
            members: IndexMap::new(),
            indexes: Vec::new(),
        };

        for (key, member) in map {
            match member {
                Value::Array(items) if key == "indexes" => {
                    for item in items {
                        match IndexOverride::from_value(item) {
                            Some(ov) => def.indexes.push(ov),
                            None => {
                                log::debug!("{identifier}: ignoring incomplete index entry {item}")
                            }
                        }
                    }
                }
                Value::Object(body) => {
                    let declaration = if is_object_type(member) {
                        Declaration::Object(ObjectDefinition::from_value(key, member)?)
                    } else {
                        Declaration::Property(PropertyPatch::from_map(identifier, key, body)?)
                    };
                    def.members.insert(key.clone(), declaration);
                }
                scalar => {
                    def.header.insert(key.clone(), scalar.clone());
                }
            }
        }

        let header_text = |key: &str| {
            def.header
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        if header_text("self_relationship").as_deref() == Some("hierarchical") {
            def.self_relationship = SelfRelationship::Hierarchical;
        }
        if header_text("language").as_deref() == Some("single") {
            def.language = LanguageMode::Single;
        }
        match kind {
            ObjectKind::ObjectExtension => def.extension_of = header_text("extension"),
            ObjectKind::ObjectRelation => def.relation_to = header_text("relation"),
            _ => {}
        }
        Ok(def)
    }

    /// The translation table emitted by a previous expansion.
    pub fn is_language_extension(&self) -> bool {
        self.kind == ObjectKind::ObjectExtension && self.extension_of.as_deref() == Some("language")
    }
}
