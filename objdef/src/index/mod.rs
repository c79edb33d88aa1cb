//! Index descriptors and the ordered index set an object accumulates while
//! it is expanded.

use crate::property::IndexHint;
use indexmap::IndexMap;
use md5::{Digest, Md5};
use serde_json::{Map, Value};
use std::fmt;

/// Longest index identifier accepted before it is replaced by a hash.
pub const MAX_INDEX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Primary,
    Unique,
    Single,
    Composite,
    Fulltext,
}

impl IndexKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "primary" => Some(IndexKind::Primary),
            "unique" => Some(IndexKind::Unique),
            "single" => Some(IndexKind::Single),
            "composite" => Some(IndexKind::Composite),
            "fulltext" => Some(IndexKind::Fulltext),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Primary => "primary",
            IndexKind::Unique => "unique",
            IndexKind::Single => "single",
            IndexKind::Composite => "composite",
            IndexKind::Fulltext => "fulltext",
        }
    }

    /// Plain lookup indexes that a wider index makes redundant.
    fn is_redundant_when_covered(&self) -> bool {
        matches!(self, IndexKind::Single | IndexKind::Composite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    pub order: Option<SortOrder>,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        IndexColumn {
            name: name.into(),
            order: None,
        }
    }

    /// Parse `name`, `name asc` or `` `name` DESC ``.
    pub fn parse(text: &str) -> Option<Self> {
        let cleaned = text.replace('`', "");
        let mut parts = cleaned.split_whitespace();
        let name = parts.next()?.to_string();
        let order = match parts.next().map(|s| s.to_ascii_uppercase()).as_deref() {
            Some("ASC") => Some(SortOrder::Asc),
            Some("DESC") => Some(SortOrder::Desc),
            _ => None,
        };
        Some(IndexColumn { name, order })
    }
}

impl fmt::Display for IndexColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            Some(SortOrder::Asc) => write!(f, "{} ASC", self.name),
            Some(SortOrder::Desc) => write!(f, "{} DESC", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Parse a comma-separated column list such as `"parentid,ordinalposition"`.
pub fn parse_columns(text: &str) -> Vec<IndexColumn> {
    text.split(',').filter_map(IndexColumn::parse).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub kind: IndexKind,
    pub columns: Vec<IndexColumn>,
}

impl Index {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, kind: IndexKind, columns: &[S]) -> Self {
        Index {
            name: name.into(),
            kind,
            columns: columns.iter().map(|c| IndexColumn::new(c.as_ref())).collect(),
        }
    }

    pub fn primary(column: &str) -> Self {
        Index::new(column, IndexKind::Primary, &[column])
    }

    pub fn single(column: &str) -> Self {
        Index::new(column, IndexKind::Single, &[column])
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn references(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }

    pub fn properties_text(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("properties".into(), Value::String(self.properties_text()));
        map.insert("type".into(), Value::String(self.kind.as_str().into()));
        Value::Object(map)
    }
}

/// An `indexes` entry supplied in a definition document. Its fields take
/// precedence over the computed index of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOverride {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub kind: Option<IndexKind>,
}

impl IndexOverride {
    /// `None` when the entry lacks a name or columns.
    pub fn from_value(value: &Value) -> Option<Self> {
        let name = value.get("name")?.as_str()?.trim().to_string();
        let columns = match value.get("properties")? {
            Value::String(s) => parse_columns(s),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(IndexColumn::parse)
                .collect(),
            _ => Vec::new(),
        };
        if name.is_empty() || columns.is_empty() {
            return None;
        }
        let kind = value.get("type").and_then(Value::as_str).and_then(IndexKind::parse);
        Some(IndexOverride {
            name,
            columns,
            kind,
        })
    }
}

/// Index descriptors keyed by name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSet {
    entries: IndexMap<String, Index>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced index keeps its position.
    pub fn insert(&mut self, index: Index) {
        self.entries.insert(index.name.clone(), index);
    }

    pub fn remove(&mut self, name: &str) -> Option<Index> {
        self.entries.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Index> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Index> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn primary(&self) -> Option<&Index> {
        self.iter().find(|ix| ix.kind == IndexKind::Primary)
    }

    pub fn retain(&mut self, keep: impl FnMut(&Index) -> bool) {
        let mut keep = keep;
        self.entries.retain(|_, ix| keep(&*ix));
    }

    /// Make room for a wider index named `names.join("_")` over `columns`:
    /// drop every index named by a leading run of `names`, and every plain
    /// index whose columns are a strict prefix of `columns`.
    pub fn supersede<S: AsRef<str>>(&mut self, names: &[S], columns: &[S]) {
        for k in 1..=names.len() {
            let joined = names[..k]
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join("_");
            self.remove(&joined);
        }
        self.remove_covered_by(columns);
    }

    /// Drop plain indexes over a strict leading prefix of `columns`.
    pub fn remove_covered_by<S: AsRef<str>>(&mut self, columns: &[S]) {
        let wanted: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
        self.retain(|ix| {
            let cols = ix.column_names();
            let covered = ix.kind.is_redundant_when_covered()
                && cols.len() < wanted.len()
                && wanted[..cols.len()] == cols[..];
            !covered
        });
    }

    /// Drop a single-column lookup index on `column`.
    pub fn remove_single_on(&mut self, column: &str) {
        self.retain(|ix| !(ix.kind == IndexKind::Single && ix.column_names() == [column]));
    }

    /// Record the index implied by an `index` hint on `property`.
    ///
    /// `parent` is the immediate ancestor's roadmap (joined) when the object
    /// sits below the root and is not an extension; its id column leads
    /// every derived key. `major` carries the object's major key between
    /// calls.
    pub fn apply_hint(
        &mut self,
        parent: Option<&str>,
        property: &str,
        hint: IndexHint,
        major: &mut Option<String>,
    ) {
        let mut names: Vec<String> = Vec::new();
        let mut keys: Vec<String> = Vec::new();
        if let Some(parent) = parent {
            names.push(parent.to_string());
            keys.push(format!("{parent}_id"));
        }
        match hint {
            IndexHint::None => return,
            IndexHint::Major => {
                *major = Some(property.to_string());
                self.remove_single_on(property);
            }
            IndexHint::Auxiliary => {
                if let Some(m) = major.as_deref().filter(|m| *m != property) {
                    names.push(m.to_string());
                    keys.push(m.to_string());
                }
                self.remove_single_on(property);
            }
            IndexHint::Single => {}
        }
        names.push(property.to_string());
        keys.push(property.to_string());

        if keys.len() > 1 {
            self.supersede(&names, &keys);
            self.insert(Index::new(names.join("_"), IndexKind::Composite, &keys));
        } else {
            self.insert(Index::single(property));
        }
    }

    pub fn apply_override(&mut self, ov: &IndexOverride) {
        match self.entries.get_mut(&ov.name) {
            Some(existing) => {
                existing.columns = ov.columns.clone();
                if let Some(kind) = ov.kind {
                    existing.kind = kind;
                }
            }
            None => {
                let kind = ov.kind.unwrap_or(if ov.columns.len() > 1 {
                    IndexKind::Composite
                } else {
                    IndexKind::Single
                });
                self.insert(Index {
                    name: ov.name.clone(),
                    kind,
                    columns: ov.columns.clone(),
                });
            }
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.iter().map(Index::to_value).collect())
    }
}

/// SQL identifier for index `name` on `table`. Candidates longer than
/// [`MAX_INDEX_NAME_LEN`] become `I` followed by the MD5 hex of the
/// candidate.
pub fn sql_index_name(table: &str, name: &str) -> String {
    let candidate = format!("idx_{table}_{name}");
    if candidate.chars().count() > MAX_INDEX_NAME_LEN {
        format!("I{:x}", Md5::digest(candidate.as_bytes()))
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(set: &IndexSet) -> Vec<&str> {
        set.iter().map(|ix| ix.name.as_str()).collect()
    }

    #[test]
    fn test_parse_columns_with_order() {
        let cols = parse_columns("`time_updated` desc, id");
        assert_eq!(cols[0].name, "time_updated");
        assert_eq!(cols[0].order, Some(SortOrder::Desc));
        assert_eq!(cols[1], IndexColumn::new("id"));
        assert_eq!(cols[0].to_string(), "time_updated DESC");
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut set = IndexSet::new();
        set.insert(Index::primary("id"));
        set.insert(Index::single("code"));
        set.insert(Index::single("name"));
        set.insert(Index::new("code", IndexKind::Unique, &["code"]));
        assert_eq!(names(&set), vec!["id", "code", "name"]);
        assert_eq!(set.get("code").unwrap().kind, IndexKind::Unique);
    }

    #[test]
    fn test_supersede_removes_name_prefixes() {
        let mut set = IndexSet::new();
        set.insert(Index::single("a"));
        set.insert(Index::new("a_b", IndexKind::Composite, &["a", "b"]));
        set.insert(Index::single("z"));
        set.supersede(&["a", "b", "c"], &["a", "b", "c"]);
        assert_eq!(names(&set), vec!["z"]);
    }

    #[test]
    fn test_supersede_keeps_unique_prefix() {
        let mut set = IndexSet::new();
        set.insert(Index::new("code", IndexKind::Unique, &["code"]));
        set.remove_covered_by(&["code", "name"]);
        assert!(set.contains("code"));
    }

    #[test]
    fn test_covered_single_foreign_key_removed() {
        let mut set = IndexSet::new();
        set.insert(Index::primary("id"));
        set.insert(Index::single("shop_id"));
        set.remove_covered_by(&["shop_id", "sku"]);
        assert_eq!(names(&set), vec!["id"]);
    }

    #[test]
    fn test_major_then_auxiliary_at_root() {
        let mut set = IndexSet::new();
        let mut major = None;
        set.insert(Index::single("p"));
        set.apply_hint(None, "p", IndexHint::Major, &mut major);
        assert_eq!(names(&set), vec!["p"]);
        set.apply_hint(None, "q", IndexHint::Auxiliary, &mut major);
        assert_eq!(names(&set), vec!["p_q"]);
        let ix = set.get("p_q").unwrap();
        assert_eq!(ix.kind, IndexKind::Composite);
        assert_eq!(ix.column_names(), vec!["p", "q"]);
    }

    #[test]
    fn test_major_then_auxiliary_below_root() {
        let mut set = IndexSet::new();
        let mut major = None;
        set.insert(Index::primary("id"));
        set.insert(Index::single("shop_id"));
        set.insert(Index::single("p"));
        set.apply_hint(Some("shop"), "p", IndexHint::Major, &mut major);
        set.apply_hint(Some("shop"), "q", IndexHint::Auxiliary, &mut major);
        assert_eq!(names(&set), vec!["id", "shop_p_q"]);
        assert_eq!(
            set.get("shop_p_q").unwrap().column_names(),
            vec!["shop_id", "p", "q"]
        );
    }

    #[test]
    fn test_auxiliary_without_major_is_single() {
        let mut set = IndexSet::new();
        let mut major = None;
        set.apply_hint(None, "q", IndexHint::Auxiliary, &mut major);
        assert_eq!(set.get("q").unwrap().kind, IndexKind::Single);
    }

    #[test]
    fn test_override_updates_and_appends() {
        let mut set = IndexSet::new();
        set.insert(Index::primary("id"));
        set.insert(Index::single("code"));
        let ov = IndexOverride::from_value(
            &json!({"name": "code", "properties": "code", "type": "unique"}),
        )
        .unwrap();
        set.apply_override(&ov);
        let ov = IndexOverride::from_value(
            &json!({"name": "recent", "properties": "time_updated desc,id"}),
        )
        .unwrap();
        set.apply_override(&ov);
        assert_eq!(names(&set), vec!["id", "code", "recent"]);
        assert_eq!(set.get("code").unwrap().kind, IndexKind::Unique);
        assert_eq!(set.get("recent").unwrap().kind, IndexKind::Composite);
        assert_eq!(set.get("recent").unwrap().properties_text(), "time_updated DESC,id");
    }

    #[test]
    fn test_override_without_columns_is_ignored() {
        assert!(IndexOverride::from_value(&json!({"name": "x"})).is_none());
        assert!(IndexOverride::from_value(&json!({"name": "", "properties": "a"})).is_none());
    }

    #[test]
    fn test_short_index_name_kept() {
        assert_eq!(sql_index_name("article", "code"), "idx_article_code");
    }

    #[test]
    fn test_long_index_name_hashed() {
        let table = "warehouse_inventory_location_assignment_history";
        let name = "warehouse_inventory_location_id_assignment";
        let hashed = sql_index_name(table, name);
        assert!(hashed.starts_with('I'));
        assert_eq!(hashed.len(), 33);
        assert!(hashed.len() <= MAX_INDEX_NAME_LEN);
        assert_eq!(hashed, sql_index_name(table, name));
        assert_ne!(hashed, sql_index_name(table, "other_index_with_a_rather_long_name_too"));
    }
}
