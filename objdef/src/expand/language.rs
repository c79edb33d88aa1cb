//! Per-language translation table synthesized for objects that carry
//! language-adaptive properties.

use super::{Entry, ExpandedObject};
use crate::index::{Index, IndexKind, IndexSet};
use crate::property::{Property, PropertyType, ZERO_TIME};
use crate::schema::ObjectKind;
use indexmap::IndexMap;
use serde_json::Value;

/// Member name of the synthesized translation table.
pub const LANGUAGES: &str = "languages";

/// Concept the translation table extends.
pub const LANGUAGE_EXTENSION: &str = "language";

fn ancestor_keys(host_roadmap: &[String]) -> Vec<String> {
    (1..=host_roadmap.len())
        .map(|n| format!("{}_id", host_roadmap[..n].join("_")))
        .collect()
}

/// Columns of the translation table that are generated rather than
/// translated.
pub fn reserved_columns(host_roadmap: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = [
        "id",
        "time_created",
        "time_updated",
        "language_id",
        "language_tag",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    columns.extend(ancestor_keys(host_roadmap));
    columns
}

/// Build the `languages` extension of the object at `host_roadmap` from its
/// language-adaptive properties.
///
/// Columns follow the order an `object_extension` seeds on its own (`id`,
/// timestamps, `language_id`, `language_tag`), then the host keys, then the
/// translated properties, so expanding the emitted table again yields the
/// same column list.
pub fn synthesize(host_roadmap: &[String], adaptive: &[(String, Property)]) -> ExpandedObject {
    let mut roadmap = host_roadmap.to_vec();
    roadmap.push(LANGUAGES.to_string());

    let mut header = IndexMap::new();
    header.insert(
        "type".to_string(),
        Value::String(ObjectKind::ObjectExtension.as_str().into()),
    );
    header.insert("extension".to_string(), Value::String(LANGUAGE_EXTENSION.into()));

    let mut entries = IndexMap::new();
    let mut column = |name: &str, property: Property| {
        entries.insert(name.to_string(), Entry::Column(property));
    };
    column(
        "id",
        Property::new(PropertyType::Int).with_comment(format!("{LANGUAGES} instance id")),
    );
    column("time_created", Property::new(PropertyType::Time).with_default(ZERO_TIME));
    column("time_updated", Property::new(PropertyType::Time).with_default(ZERO_TIME));
    column(
        &format!("{LANGUAGE_EXTENSION}_id"),
        Property::new(PropertyType::Int).with_default("0"),
    );
    column(
        &format!("{LANGUAGE_EXTENSION}_tag"),
        Property::seeded(PropertyType::String),
    );
    let keys = ancestor_keys(host_roadmap);
    for key in &keys {
        column(key, Property::new(PropertyType::Int).with_default("0"));
    }
    for (name, property) in adaptive {
        column(name, property.for_translation());
    }

    let mut indexes = IndexSet::new();
    indexes.insert(Index::primary("id"));
    if let Some((host_key, outer)) = keys.split_last() {
        for key in outer {
            indexes.insert(Index::single(key));
        }
        let name = format!("{}_language", host_key);
        indexes.insert(Index::new(
            name,
            IndexKind::Unique,
            &[host_key.as_str(), "language_id"],
        ));
    }

    ExpandedObject {
        roadmap,
        kind: ObjectKind::ObjectExtension,
        header,
        entries,
        indexes,
    }
}
