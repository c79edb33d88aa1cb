pub mod parser;
pub mod types;

pub use parser::{parse_document, parse_document_str, parse_document_yaml_str, DefinitionDocument};
pub use types::{
    is_object_type, Declaration, LanguageMode, ObjectDefinition, ObjectKind, SelfRelationship,
};
