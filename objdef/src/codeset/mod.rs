//! Reverse index of codeset usage: which tables and properties of an object
//! tree look their values up in which codeset.

use crate::error::{ObjdefError, Result};
use crate::schema::is_object_type;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// How a property stores its codeset reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Numeric id of the code item (`int` properties).
    Id,
    /// The code string itself.
    Code,
}

/// A property that references a codeset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodesetReference {
    pub table: String,
    pub object_caption: String,
    pub property: String,
    pub link: LinkKind,
    pub property_caption: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableInObject {
    pub identifier: String,
    pub objects: Vec<String>,
    pub codesets: Vec<String>,
    pub references: IndexMap<String, Vec<CodesetReference>>,
}

impl TableInObject {
    /// Scan the definition text of object `identifier`.
    pub fn parse(identifier: &str, definition: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(definition).map_err(|e| {
            ObjdefError::definition(identifier, format!("definition is not valid JSON: {e}"))
        })?;
        Ok(Self::scan(identifier, &value))
    }

    pub fn scan(identifier: &str, definition: &Value) -> Self {
        let mut tio = TableInObject {
            identifier: identifier.to_string(),
            ..Default::default()
        };
        tio.walk(definition, &[identifier.to_string()]);
        tio.codesets.sort();
        tio
    }

    fn walk(&mut self, object: &Value, roadmap: &[String]) {
        let type_name = object.get("type").and_then(Value::as_str).unwrap_or_default();
        if !(type_name.starts_with("object") || type_name == "codeset") {
            return;
        }
        let Some(members) = object.as_object() else {
            return;
        };
        let table = roadmap.join("_");
        if !self.objects.contains(&table) {
            self.objects.push(table.clone());
        }
        let caption = text(object.get("caption"));

        for (key, member) in members {
            if !member.is_object() {
                continue;
            }
            if is_object_type(member) {
                let mut child = roadmap.to_vec();
                child.push(key.clone());
                self.walk(member, &child);
                continue;
            }
            let codeset = Some(text(member.get("codeset")))
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| text(member.get("options")));
            if codeset.is_empty() {
                continue;
            }
            let link = if member.get("type").and_then(Value::as_str) == Some("int") {
                LinkKind::Id
            } else {
                LinkKind::Code
            };
            self.references
                .entry(codeset.clone())
                .or_default()
                .push(CodesetReference {
                    table: table.clone(),
                    object_caption: caption.clone(),
                    property: key.clone(),
                    link,
                    property_caption: text(member.get("caption")),
                });
            if !self.codesets.contains(&codeset) {
                self.codesets.push(codeset);
            }
        }
    }

    /// Object tables in document order, then referenced codesets sorted.
    pub fn tables(&self) -> Vec<String> {
        self.objects
            .iter()
            .chain(self.codesets.iter())
            .cloned()
            .collect()
    }

    /// Properties referencing `codeset`.
    pub fn related_tables(&self, codeset: &str) -> &[CodesetReference] {
        self.references
            .get(codeset)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}
