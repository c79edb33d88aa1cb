pub mod schema;
pub mod property;
pub mod index;
pub mod expand;
pub mod render;
pub mod ddl;
pub mod migration;
pub mod codeset;
pub mod access;
pub mod config;
pub mod compiler;
pub mod error;

pub use compiler::{CompiledDefinition, Compiler};
pub use config::CompilerConfig;
pub use ddl::{DdlGenerator, Dialect};
pub use error::{ObjdefError, Result};
pub use expand::{ExpandedObject, Expander};
pub use migration::{TableInspector, TableSnapshot};
pub use schema::{parse_document, parse_document_str, DefinitionDocument, ObjectDefinition};
