//! Scalar property model: the attribute set of one column-backed field,
//! how declared attributes merge over generated defaults, and its
//! canonical attribute rendering.

use crate::error::{ObjdefError, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};

pub const DEFAULT_STRING_SIZE: u32 = 255;
pub const DEFAULT_IPV4_SIZE: u32 = 15;
pub const DEFAULT_IPV6_SIZE: u32 = 39;
pub const DEFAULT_DOTIDS_SIZE: u32 = 255;

/// Default applied to time columns when nothing else is declared.
pub const ZERO_TIME: &str = "0000-00-00 00:00:00";

/// Canonical attribute order after `type` and `size`.
const ATTRIBUTE_ORDER: [&str; 14] = [
    "options",
    "capacity",
    "unitofmeasure",
    "set_exclusive",
    "decimal_places",
    "encoding",
    "labeling",
    "default",
    "comment",
    "caption",
    "pattern",
    "index",
    "language_adaptive",
    "joinsuperiors",
];

/// Descriptive attributes carried through untouched.
const ANNOTATIONS: [&str; 4] = ["unitofmeasure", "set_exclusive", "encoding", "labeling"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Int,
    Long,
    Float,
    Decimal,
    String,
    Password,
    Text,
    Blob,
    Time,
    Ipv4,
    Ipv6,
    Dotids,
}

impl PropertyType {
    pub fn parse(name: &str) -> Option<Self> {
        let t = match name {
            "int" => PropertyType::Int,
            "long" => PropertyType::Long,
            "float" => PropertyType::Float,
            "decimal" => PropertyType::Decimal,
            "string" => PropertyType::String,
            "password" => PropertyType::Password,
            "text" => PropertyType::Text,
            "blob" => PropertyType::Blob,
            "time" => PropertyType::Time,
            "ipv4" => PropertyType::Ipv4,
            "ipv6" => PropertyType::Ipv6,
            "dotids" => PropertyType::Dotids,
            _ => return None,
        };
        Some(t)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Int => "int",
            PropertyType::Long => "long",
            PropertyType::Float => "float",
            PropertyType::Decimal => "decimal",
            PropertyType::String => "string",
            PropertyType::Password => "password",
            PropertyType::Text => "text",
            PropertyType::Blob => "blob",
            PropertyType::Time => "time",
            PropertyType::Ipv4 => "ipv4",
            PropertyType::Ipv6 => "ipv6",
            PropertyType::Dotids => "dotids",
        }
    }

    /// Size used when a varchar-backed property declares none.
    pub fn default_size(&self) -> Option<u32> {
        match self {
            PropertyType::String | PropertyType::Password => Some(DEFAULT_STRING_SIZE),
            PropertyType::Ipv4 => Some(DEFAULT_IPV4_SIZE),
            PropertyType::Ipv6 => Some(DEFAULT_IPV6_SIZE),
            PropertyType::Dotids => Some(DEFAULT_DOTIDS_SIZE),
            _ => None,
        }
    }

    pub fn is_varchar(&self) -> bool {
        self.default_size().is_some()
    }
}

/// Declarative shorthand controlling how a property joins an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexHint {
    #[default]
    None,
    Major,
    Auxiliary,
    Single,
}

impl IndexHint {
    /// `major` and `auxiliary` are recognised; `false`, `""` and `"none"`
    /// mean no hint; anything else (`true`, `"single"`, ...) is single.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => IndexHint::None,
            Value::String(s) => match s.as_str() {
                "" | "none" => IndexHint::None,
                "major" => IndexHint::Major,
                "auxiliary" => IndexHint::Auxiliary,
                _ => IndexHint::Single,
            },
            _ => IndexHint::Single,
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            IndexHint::None => None,
            IndexHint::Major => Some("major"),
            IndexHint::Auxiliary => Some("auxiliary"),
            IndexHint::Single => Some("single"),
        }
    }
}

/// Attributes explicitly declared for a property in a definition document.
/// Unset fields leave the underlying property untouched when merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPatch {
    pub property_type: Option<PropertyType>,
    pub size: Option<u32>,
    pub options: Option<Value>,
    pub capacity: Option<String>,
    pub decimal_places: Option<u32>,
    pub default: Option<Value>,
    pub comment: Option<String>,
    pub caption: Option<String>,
    pub pattern: Option<String>,
    pub index: Option<IndexHint>,
    pub language_adaptive: Option<bool>,
    pub joinsuperiors: Option<String>,
    pub annotations: IndexMap<String, Value>,
}

impl PropertyPatch {
    /// Read the declared attributes of property `name` inside object
    /// `identifier`. Unknown attribute keys are ignored.
    pub fn from_map(identifier: &str, name: &str, map: &Map<String, Value>) -> Result<Self> {
        let mut patch = PropertyPatch::default();
        for (key, value) in map {
            match key.as_str() {
                "type" => {
                    let type_name = value.as_str().unwrap_or_default();
                    let parsed = PropertyType::parse(type_name).ok_or_else(|| {
                        ObjdefError::definition(
                            identifier,
                            format!("property '{name}' has unsupported type '{type_name}'"),
                        )
                    })?;
                    patch.property_type = Some(parsed);
                }
                "size" => patch.size = positive_number(value),
                "decimal_places" => patch.decimal_places = number(value),
                "options" => patch.options = Some(value.clone()),
                "capacity" => patch.capacity = Some(text(value)),
                "default" => patch.default = Some(value.clone()),
                "comment" => patch.comment = Some(text(value)),
                "caption" => patch.caption = Some(text(value)),
                "pattern" => patch.pattern = Some(text(value)),
                "index" => patch.index = Some(IndexHint::from_value(value)),
                "language_adaptive" => patch.language_adaptive = Some(truthy(value)),
                "joinsuperiors" => patch.joinsuperiors = Some(text(value)),
                k if ANNOTATIONS.contains(&k) => {
                    patch.annotations.insert(k.to_string(), value.clone());
                }
                other => log::debug!("{identifier}.{name}: ignoring attribute '{other}'"),
            }
        }
        Ok(patch)
    }
}

impl From<&Property> for PropertyPatch {
    fn from(p: &Property) -> Self {
        PropertyPatch {
            property_type: Some(p.property_type),
            size: p.size,
            options: p.options.clone(),
            capacity: p.capacity.clone(),
            decimal_places: p.decimal_places,
            default: p.default.clone(),
            comment: p.comment.clone(),
            caption: p.caption.clone(),
            pattern: p.pattern.clone(),
            index: (p.index != IndexHint::None).then_some(p.index),
            language_adaptive: p.language_adaptive,
            joinsuperiors: p.joinsuperiors.clone(),
            annotations: p.annotations.clone(),
        }
    }
}

/// A fully resolved scalar property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub property_type: PropertyType,
    pub size: Option<u32>,
    pub options: Option<Value>,
    pub capacity: Option<String>,
    pub decimal_places: Option<u32>,
    pub default: Option<Value>,
    pub comment: Option<String>,
    pub caption: Option<String>,
    pub pattern: Option<String>,
    pub index: IndexHint,
    /// `Some(false)` records an explicit opt-out of a generated default.
    pub language_adaptive: Option<bool>,
    pub joinsuperiors: Option<String>,
    pub annotations: IndexMap<String, Value>,
}

impl Property {
    pub fn new(property_type: PropertyType) -> Self {
        Property {
            property_type,
            size: None,
            options: None,
            capacity: None,
            decimal_places: None,
            default: None,
            comment: None,
            caption: None,
            pattern: None,
            index: IndexHint::None,
            language_adaptive: None,
            joinsuperiors: None,
            annotations: IndexMap::new(),
        }
    }

    /// A generated property: varchar types get their default size and
    /// string-like types an empty default.
    pub fn seeded(property_type: PropertyType) -> Self {
        let mut p = Property::new(property_type);
        p.size = property_type.default_size();
        if matches!(property_type, PropertyType::String | PropertyType::Password) {
            p.default = Some(Value::String(String::new()));
        }
        p
    }

    /// Build a property that has no generated counterpart.
    pub fn from_patch(identifier: &str, name: &str, patch: &PropertyPatch) -> Result<Self> {
        let property_type = patch.property_type.ok_or_else(|| {
            ObjdefError::definition(identifier, format!("property '{name}' declares no type"))
        })?;
        let mut p = Property::new(property_type);
        p.apply(patch);
        Ok(p)
    }

    /// Merge declared attributes over this property; a declared field wins.
    pub fn apply(&mut self, patch: &PropertyPatch) {
        if let Some(t) = patch.property_type {
            self.property_type = t;
        }
        overwrite(&mut self.size, &patch.size);
        overwrite(&mut self.options, &patch.options);
        overwrite(&mut self.capacity, &patch.capacity);
        overwrite(&mut self.decimal_places, &patch.decimal_places);
        overwrite(&mut self.default, &patch.default);
        overwrite(&mut self.comment, &patch.comment);
        overwrite(&mut self.caption, &patch.caption);
        overwrite(&mut self.pattern, &patch.pattern);
        overwrite(&mut self.joinsuperiors, &patch.joinsuperiors);
        if let Some(hint) = patch.index {
            self.index = hint;
        }
        overwrite(&mut self.language_adaptive, &patch.language_adaptive);
        for (k, v) in &patch.annotations {
            self.annotations.insert(k.clone(), v.clone());
        }
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default = Some(Value::String(value.to_string()));
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn adaptive(mut self) -> Self {
        self.language_adaptive = Some(true);
        self
    }

    pub fn is_language_adaptive(&self) -> bool {
        self.language_adaptive == Some(true)
    }

    pub fn effective_size(&self) -> u32 {
        self.size
            .or_else(|| self.property_type.default_size())
            .unwrap_or(DEFAULT_STRING_SIZE)
    }

    /// The declared default as SQL-ready text, `None` when absent or empty.
    pub fn default_text(&self) -> Option<String> {
        let text = match self.default.as_ref()? {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }

    /// Copy placed into a translation table: no index hint, no adaptivity flag.
    pub fn for_translation(&self) -> Property {
        let mut p = self.clone();
        p.index = IndexHint::None;
        p.language_adaptive = None;
        p
    }

    /// The codeset this property looks its values up in, if any.
    pub fn codeset(&self) -> Option<&str> {
        self.options.as_ref().and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Canonical attribute map, in the fixed canonical key order.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), Value::String(self.property_type.as_str().into()));
        if self.property_type.is_varchar() {
            map.insert("size".into(), Value::from(self.effective_size()));
        }
        for key in ATTRIBUTE_ORDER {
            let value = match key {
                "options" => self.options.clone(),
                "capacity" => self.capacity.clone().map(Value::String),
                "decimal_places" => self.decimal_places.map(Value::from),
                "default" => self.default.clone(),
                "comment" => self.comment.clone().map(Value::String),
                "caption" => self.caption.clone().map(Value::String),
                "pattern" => self.pattern.clone().map(Value::String),
                "index" => self.index.as_str().map(|s| Value::String(s.into())),
                "language_adaptive" => self.language_adaptive.map(Value::Bool),
                "joinsuperiors" => self.joinsuperiors.clone().map(Value::String),
                annotation => self.annotations.get(annotation).cloned(),
            };
            if let Some(v) = value {
                map.insert(key.to_string(), v);
            }
        }
        Value::Object(map)
    }
}

fn overwrite<T: Clone>(slot: &mut Option<T>, declared: &Option<T>) {
    if let Some(v) = declared {
        *slot = Some(v.clone());
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn positive_number(value: &Value) -> Option<u32> {
    number(value).filter(|n| *n > 0)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        Value::Number(n) => n.as_u64() == Some(1),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(v: Value) -> PropertyPatch {
        PropertyPatch::from_map("t", "p", v.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_parse_known_types() {
        assert_eq!(PropertyType::parse("ipv6"), Some(PropertyType::Ipv6));
        assert_eq!(PropertyType::parse("dotids"), Some(PropertyType::Dotids));
        assert_eq!(PropertyType::parse("codeset"), None);
    }

    #[test]
    fn test_unknown_type_is_definition_error() {
        let body = json!({"type": "enum"});
        let err = PropertyPatch::from_map("user", "role", body.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("role"));
        assert!(err.to_string().contains("enum"));
    }

    #[test]
    fn test_index_hint_values() {
        assert_eq!(IndexHint::from_value(&json!("major")), IndexHint::Major);
        assert_eq!(IndexHint::from_value(&json!("auxiliary")), IndexHint::Auxiliary);
        assert_eq!(IndexHint::from_value(&json!("true")), IndexHint::Single);
        assert_eq!(IndexHint::from_value(&json!(true)), IndexHint::Single);
        assert_eq!(IndexHint::from_value(&json!(false)), IndexHint::None);
        assert_eq!(IndexHint::from_value(&json!("")), IndexHint::None);
    }

    #[test]
    fn test_merge_is_field_by_field() {
        let mut p = Property::seeded(PropertyType::Int)
            .with_default("1")
            .with_comment("enable flag")
            .with_pattern("^[01]$");
        p.apply(&patch(json!({"comment": "switch"})));
        assert_eq!(p.comment.as_deref(), Some("switch"));
        assert_eq!(p.pattern.as_deref(), Some("^[01]$"));
        assert_eq!(p.default_text().as_deref(), Some("1"));
    }

    #[test]
    fn test_seeded_string_gets_default_size() {
        let p = Property::seeded(PropertyType::String);
        assert_eq!(p.size, Some(DEFAULT_STRING_SIZE));
        assert_eq!(p.to_value(), json!({"type": "string", "size": 255, "default": ""}));
    }

    #[test]
    fn test_effective_size_falls_back_per_type() {
        let p = Property::from_patch("t", "ip", &patch(json!({"type": "ipv4"}))).unwrap();
        assert_eq!(p.size, None);
        assert_eq!(p.effective_size(), DEFAULT_IPV4_SIZE);
    }

    #[test]
    fn test_canonical_attribute_order() {
        let p = Property::from_patch(
            "t",
            "p",
            &patch(json!({
                "language_adaptive": true,
                "caption": "en:title;zh:标题",
                "index": "major",
                "default": "x",
                "unknown": 1,
                "size": "32",
                "type": "string",
                "encoding": "utf8"
            })),
        )
        .unwrap();
        let keys: Vec<String> = p.to_value().as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["type", "size", "encoding", "default", "caption", "index", "language_adaptive"]
        );
    }

    #[test]
    fn test_size_only_rendered_for_varchar() {
        let p = Property::from_patch("t", "n", &patch(json!({"type": "int", "size": 8}))).unwrap();
        assert!(p.to_value().get("size").is_none());
    }

    #[test]
    fn test_for_translation_strips_hints() {
        let mut p = Property::seeded(PropertyType::String).adaptive();
        p.index = IndexHint::Single;
        let t = p.for_translation();
        assert_eq!(t.language_adaptive, None);
        assert_eq!(t.index, IndexHint::None);
        assert_eq!(t.size, p.size);
    }

    #[test]
    fn test_patch_round_trip_through_property() {
        let p = Property::seeded(PropertyType::Text)
            .with_caption("en:description")
            .adaptive();
        let back = Property::from_patch("t", "d", &PropertyPatch::from(&p)).unwrap();
        assert_eq!(back, p);
    }
}
