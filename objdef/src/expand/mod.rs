//! Object definition expansion: materializes the implicit columns, ancestor
//! keys, translation tables and indexes of a definition tree.

pub mod language;

use crate::error::{ObjdefError, Result};
use crate::index::{Index, IndexKind, IndexSet};
use crate::property::{Property, PropertyPatch, PropertyType, ZERO_TIME};
use crate::schema::{Declaration, ObjectDefinition, ObjectKind, SelfRelationship};
use indexmap::IndexMap;
use serde_json::Value;

/// A member of an expanded object.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Column(Property),
    Object(ExpandedObject),
}

/// A fully expanded definition node. Its scalar entries are the columns of
/// one table; nested objects are tables of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedObject {
    pub roadmap: Vec<String>,
    pub kind: ObjectKind,
    pub header: IndexMap<String, Value>,
    pub entries: IndexMap<String, Entry>,
    pub indexes: IndexSet,
}

impl ExpandedObject {
    pub fn identifier(&self) -> &str {
        self.roadmap.last().map(String::as_str).unwrap_or_default()
    }

    pub fn table_name(&self) -> String {
        self.roadmap.join("_")
    }

    pub fn depth(&self) -> usize {
        self.roadmap.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            Entry::Column(p) => Some((name.as_str(), p)),
            Entry::Object(_) => None,
        })
    }

    pub fn column(&self, name: &str) -> Option<&Property> {
        match self.entries.get(name)? {
            Entry::Column(p) => Some(p),
            Entry::Object(_) => None,
        }
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &ExpandedObject)> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            Entry::Object(o) => Some((name.as_str(), o)),
            Entry::Column(_) => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&ExpandedObject> {
        match self.entries.get(name)? {
            Entry::Object(o) => Some(o),
            Entry::Column(_) => None,
        }
    }

    /// Every table of the tree, children before their parent.
    pub fn tables(&self) -> Vec<&ExpandedObject> {
        let mut out = Vec::new();
        self.collect_tables(&mut out);
        out
    }

    fn collect_tables<'a>(&'a self, out: &mut Vec<&'a ExpandedObject>) {
        for (_, child) in self.children() {
            child.collect_tables(out);
        }
        out.push(self);
    }
}

/// Expansion settings for one compile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Expander {
    multi_language: bool,
    legacy_ordinal_index: bool,
}

impl Expander {
    pub fn new(multi_language: bool) -> Self {
        Expander {
            multi_language,
            legacy_ordinal_index: false,
        }
    }

    /// Hierarchical non-codeset objects index `ordinalposition` on its own
    /// instead of through `siblingorder`.
    pub fn with_legacy_ordinal_index(mut self, enabled: bool) -> Self {
        self.legacy_ordinal_index = enabled;
        self
    }

    pub fn multi_language(&self) -> bool {
        self.multi_language
    }

    /// Expand a top-level definition.
    pub fn expand(&self, def: &ObjectDefinition) -> Result<ExpandedObject> {
        self.expand_node(def, vec![def.identifier.clone()], &[])
    }

    fn expand_node(
        &self,
        def: &ObjectDefinition,
        roadmap: Vec<String>,
        ancestors: &[ObjectKind],
    ) -> Result<ExpandedObject> {
        let mut node = Node::new(roadmap, def.kind);
        node.seed_base(&def.identifier);
        node.seed_ancestor_keys(ancestors);
        if let (ObjectKind::ObjectExtension, Some(ext)) = (def.kind, def.extension_of.as_deref()) {
            node.seed_extension(ext);
        }
        if let (ObjectKind::ObjectRelation, Some(rel)) = (def.kind, def.relation_to.as_deref()) {
            node.seed_relation(rel);
        }
        if def.kind == ObjectKind::Codeset {
            node.seed_codeset(def.self_relationship);
        }
        if def.self_relationship == SelfRelationship::Hierarchical {
            let separate = self.legacy_ordinal_index && def.kind != ObjectKind::Codeset;
            node.seed_hierarchy(separate);
        }

        let mut lifted: Option<&ObjectDefinition> = None;
        let mut lineage = ancestors.to_vec();
        lineage.push(def.kind);
        for (name, declaration) in &def.members {
            match declaration {
                Declaration::Object(child)
                    if self.multi_language
                        && name == language::LANGUAGES
                        && child.is_language_extension() =>
                {
                    lifted = Some(child);
                }
                Declaration::Object(child) => {
                    let mut child_roadmap = node.roadmap.clone();
                    child_roadmap.push(name.clone());
                    let expanded = self.expand_node(child, child_roadmap, &lineage)?;
                    node.entries.insert(name.clone(), Entry::Object(expanded));
                }
                Declaration::Property(patch) => {
                    node.merge(&def.identifier, name, patch, self.multi_language)?
                }
            }
        }

        for ov in &def.indexes {
            node.indexes.apply_override(ov);
        }

        if let Some(extension) = lifted {
            node.lift_translations(&def.identifier, extension)?;
        }
        if self.multi_language {
            node.relocate_translations();
        } else {
            node.drop_translated();
        }

        for key in def.header.keys() {
            if node.entries.contains_key(key) {
                return Err(ObjdefError::definition(
                    &def.identifier,
                    format!("attribute '{key}' collides with a column of the same name"),
                ));
            }
        }

        Ok(ExpandedObject {
            roadmap: node.roadmap,
            kind: def.kind,
            header: def.header.clone(),
            entries: node.entries,
            indexes: node.indexes,
        })
    }
}

/// Column and index accumulator for the object being expanded.
struct Node {
    roadmap: Vec<String>,
    kind: ObjectKind,
    entries: IndexMap<String, Entry>,
    indexes: IndexSet,
    major: Option<String>,
}

impl Node {
    fn new(roadmap: Vec<String>, kind: ObjectKind) -> Self {
        Node {
            roadmap,
            kind,
            entries: IndexMap::new(),
            indexes: IndexSet::new(),
            major: None,
        }
    }

    fn depth(&self) -> usize {
        self.roadmap.len()
    }

    fn prefix(&self, level: usize) -> String {
        self.roadmap[..=level].join("_")
    }

    /// Roadmap of the immediate ancestor whose id leads derived keys.
    fn parent_key(&self) -> Option<String> {
        (self.depth() > 1 && self.kind != ObjectKind::ObjectExtension)
            .then(|| self.prefix(self.depth() - 2))
    }

    fn column(&mut self, name: &str, property: Property) {
        self.entries.insert(name.to_string(), Entry::Column(property));
    }

    fn has_column(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(Entry::Column(_)))
    }

    fn seed_base(&mut self, identifier: &str) {
        self.column(
            "id",
            Property::new(PropertyType::Int).with_comment(format!("{identifier} instance id")),
        );
        self.indexes.insert(Index::primary("id"));
        self.column("time_created", Property::new(PropertyType::Time).with_default(ZERO_TIME));
        self.column("time_updated", Property::new(PropertyType::Time).with_default(ZERO_TIME));
    }

    fn seed_ancestor_keys(&mut self, ancestors: &[ObjectKind]) {
        if self.parent_key().is_none() {
            return;
        }
        for level in 0..self.depth() - 1 {
            let prefix = self.prefix(level);
            let key = format!("{prefix}_id");
            let mut property = Property::new(PropertyType::Int).with_default("0");
            if ancestors.get(level) == Some(&ObjectKind::Codeset) {
                property.options = Some(Value::String(prefix));
            }
            self.column(&key, property);
            self.indexes.insert(Index::single(&key));
        }
    }

    fn seed_extension(&mut self, extension: &str) {
        self.column(
            &format!("{extension}_id"),
            Property::new(PropertyType::Int).with_default("0"),
        );
        self.column(&format!("{extension}_tag"), Property::seeded(PropertyType::String));
    }

    fn seed_relation(&mut self, relation: &str) {
        let key = format!("{relation}_id");
        self.column(&key, Property::new(PropertyType::Int).with_default("0"));
        if let Some(parent) = self.parent_key() {
            let columns = [format!("{parent}_id"), key];
            self.indexes.remove_covered_by(&columns);
            self.indexes
                .insert(Index::new("relation", IndexKind::Composite, &columns));
        }
    }

    fn seed_codeset(&mut self, self_relationship: SelfRelationship) {
        self.column(
            "code",
            Property::seeded(PropertyType::String)
                .with_size(64)
                .with_comment("codeset uniform definition, unique identifier(UUID)")
                .with_caption("en:code;zh:代码")
                .with_pattern(r"^[0-9a-zA-Z_\-]*$"),
        );
        self.indexes
            .insert(Index::new("code", IndexKind::Unique, &["code"]));
        self.column(
            "name",
            Property::seeded(PropertyType::String)
                .with_caption("en:name;zh:名称")
                .adaptive(),
        );
        self.column(
            "description",
            Property::new(PropertyType::Text)
                .with_caption("en:description;zh:说明")
                .adaptive(),
        );
        self.column(
            "enableflag",
            Property::new(PropertyType::Int)
                .with_default("1")
                .with_comment("code item status[0:disable,1:enable]")
                .with_caption("en:enable;zh:是否启用")
                .with_pattern("^[01]$"),
        );
        self.indexes.insert(Index::single("enableflag"));
        self.column("ordinalposition", ordinal_position());
        if self_relationship != SelfRelationship::Hierarchical {
            self.indexes.insert(Index::single("ordinalposition"));
        }
        self.column(
            "occurrences",
            Property::new(PropertyType::Text)
                .with_comment("code item usage quantity")
                .with_caption("en:occurrences;zh:使用量"),
        );
    }

    fn seed_hierarchy(&mut self, separate_ordinal_index: bool) {
        self.column(
            "parentid",
            Property::new(PropertyType::Int)
                .with_default("0")
                .with_comment("parent instance id"),
        );
        if !self.has_column("ordinalposition") {
            self.column("ordinalposition", ordinal_position());
        }
        self.column(
            "isleaf",
            Property::new(PropertyType::Int)
                .with_default("1")
                .with_comment("is hierarchy leaf node")
                .with_pattern("^[01]$"),
        );
        self.column(
            "depth",
            Property::new(PropertyType::Int)
                .with_default("0")
                .with_comment("hierarchy depth")
                .with_pattern("^[0-9]+$"),
        );
        if separate_ordinal_index {
            self.indexes.insert(Index::single("ordinalposition"));
        } else {
            self.indexes.remove_single_on("parentid");
            self.indexes.remove_single_on("ordinalposition");
            self.indexes.insert(Index::new(
                "siblingorder",
                IndexKind::Composite,
                &["parentid", "ordinalposition"],
            ));
        }
    }

    /// Merge a declared property over its generated counterpart, if any,
    /// then derive the index its hint asks for. Columns bound for the
    /// translation table take no part in host indexes.
    fn merge(
        &mut self,
        identifier: &str,
        name: &str,
        patch: &PropertyPatch,
        multi_language: bool,
    ) -> Result<()> {
        let relocated = match self.entries.get_mut(name) {
            Some(Entry::Column(existing)) => {
                existing.apply(patch);
                existing.is_language_adaptive()
            }
            _ => {
                let property = Property::from_patch(identifier, name, patch)?;
                let adaptive = property.is_language_adaptive();
                self.column(name, property);
                adaptive
            }
        };
        if multi_language && relocated {
            if patch.index.is_some() {
                log::debug!("{identifier}.{name}: index hint ignored on translated column");
            }
            return Ok(());
        }
        if let Some(hint) = patch.index {
            let parent = self.parent_key();
            self.indexes
                .apply_hint(parent.as_deref(), name, hint, &mut self.major);
        }
        Ok(())
    }

    /// Fold the translated columns of a previously emitted `languages`
    /// table back onto this object as language-adaptive properties.
    fn lift_translations(&mut self, identifier: &str, extension: &ObjectDefinition) -> Result<()> {
        let reserved = language::reserved_columns(&self.roadmap);
        for (name, declaration) in &extension.members {
            let Declaration::Property(patch) = declaration else {
                continue;
            };
            if reserved.iter().any(|r| r == name) {
                continue;
            }
            let mut patch = patch.clone();
            patch.language_adaptive = Some(true);
            match self.entries.get_mut(name) {
                Some(Entry::Column(existing)) => existing.apply(&patch),
                _ => {
                    let property = Property::from_patch(identifier, name, &patch)?;
                    self.column(name, property);
                }
            }
        }
        Ok(())
    }

    /// Drop adaptive columns already carried by an emitted `languages` table.
    fn drop_translated(&mut self) {
        let translated: Vec<String> = match self.entries.get(language::LANGUAGES) {
            Some(Entry::Object(ext)) if is_language_table(ext) => self
                .columns()
                .filter(|(name, p)| p.is_language_adaptive() && ext.column(name).is_some())
                .map(|(name, _)| name.to_string())
                .collect(),
            _ => return,
        };
        for name in &translated {
            self.remove_column(name);
        }
    }

    fn columns(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            Entry::Column(p) => Some((name.as_str(), p)),
            Entry::Object(_) => None,
        })
    }

    fn remove_column(&mut self, name: &str) {
        self.entries.shift_remove(name);
        self.indexes.retain(|ix| !ix.references(name));
    }

    /// Move language-adaptive columns into a synthesized `languages` table.
    fn relocate_translations(&mut self) {
        let adaptive: Vec<(String, Property)> = self
            .columns()
            .filter(|(_, p)| p.is_language_adaptive())
            .map(|(name, p)| (name.to_string(), p.clone()))
            .collect();
        if adaptive.is_empty() {
            return;
        }
        for (name, _) in &adaptive {
            self.remove_column(name);
        }
        let extension = language::synthesize(&self.roadmap, &adaptive);
        log::debug!(
            "{}: {} language-adaptive column(s) moved to {}",
            self.roadmap.join("_"),
            adaptive.len(),
            extension.table_name()
        );
        self.entries
            .insert(language::LANGUAGES.to_string(), Entry::Object(extension));
    }
}

fn is_language_table(obj: &ExpandedObject) -> bool {
    obj.kind == ObjectKind::ObjectExtension
        && obj.header.get("extension").and_then(Value::as_str) == Some(language::LANGUAGE_EXTENSION)
}

fn ordinal_position() -> Property {
    Property::new(PropertyType::Int)
        .with_default("0")
        .with_comment("show position in all siblings")
        .with_caption("en:ordinal position;zh:顺序号")
        .with_pattern("^[0-9]+$")
}
