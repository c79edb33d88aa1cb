//! Textual renderings of an expanded definition. Both renderings walk the
//! same structured value, so key order and values always agree.

use crate::error::Result;
use crate::expand::{Entry, ExpandedObject};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cosmetic settings for the human-readable rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrettyStyle {
    pub newline: String,
    pub indent: String,
    /// Template applied to every key; `{}` is replaced by the key.
    pub emphasis: String,
}

impl Default for PrettyStyle {
    fn default() -> Self {
        PrettyStyle {
            newline: "\n".into(),
            indent: "    ".into(),
            emphasis: "{}".into(),
        }
    }
}

impl PrettyStyle {
    fn key(&self, key: &str) -> String {
        Value::String(self.emphasis.replace("{}", key)).to_string()
    }
}

/// The expanded object as an ordered JSON value: header attributes, then
/// entries, then `indexes`.
pub fn to_value(obj: &ExpandedObject) -> Value {
    let mut map = Map::new();
    for (key, value) in &obj.header {
        map.insert(key.clone(), value.clone());
    }
    for (name, entry) in &obj.entries {
        let value = match entry {
            Entry::Column(p) => p.to_value(),
            Entry::Object(o) => to_value(o),
        };
        map.insert(name.clone(), value);
    }
    if !obj.indexes.is_empty() {
        map.insert("indexes".into(), obj.indexes.to_value());
    }
    Value::Object(map)
}

/// Compact `{"<identifier>": <object>}` text.
pub fn canonical(identifier: &str, obj: &ExpandedObject) -> String {
    let mut root = Map::new();
    root.insert(identifier.to_string(), to_value(obj));
    Value::Object(root).to_string()
}

/// The canonical tree laid out one member per line.
pub fn pretty(identifier: &str, obj: &ExpandedObject, style: &PrettyStyle) -> String {
    let mut out = String::from("{");
    out.push_str(&style.key(identifier));
    out.push_str(": ");
    write_object(&mut out, obj, 1, style);
    out.push('}');
    out
}

fn write_object(out: &mut String, obj: &ExpandedObject, level: usize, style: &PrettyStyle) {
    let pad = style.indent.repeat(level);
    let mut lines: Vec<String> = Vec::new();
    for (key, value) in &obj.header {
        lines.push(format!("{pad}{}: {value}", style.key(key)));
    }
    for (name, entry) in &obj.entries {
        let mut line = format!("{pad}{}: ", style.key(name));
        match entry {
            Entry::Column(p) => line.push_str(&p.to_value().to_string()),
            Entry::Object(o) => write_object(&mut line, o, level + 1, style),
        }
        lines.push(line);
    }
    if !obj.indexes.is_empty() {
        let item_pad = style.indent.repeat(level + 1);
        let items: Vec<String> = obj
            .indexes
            .iter()
            .map(|ix| format!("{item_pad}{}", ix.to_value()))
            .collect();
        lines.push(format!(
            "{pad}{}: [{nl}{}{nl}{pad}]",
            style.key("indexes"),
            items.join(&format!(",{}", style.newline)),
            nl = style.newline,
        ));
    }
    out.push('{');
    out.push_str(&style.newline);
    out.push_str(&lines.join(&format!(",{}", style.newline)));
    out.push_str(&style.newline);
    out.push_str(&style.indent.repeat(level - 1));
    out.push('}');
}

/// Re-serialize definition text without insignificant whitespace, keeping
/// key order.
pub fn compact(text: &str) -> Result<String> {
    let value: Value = serde_json::from_str(text)?;
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::Expander;
    use crate::schema::ObjectDefinition;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> ExpandedObject {
        let def = ObjectDefinition::from_value(
            "note",
            &json!({
                "type": "object",
                "comment": "short notes",
                "body": {"type": "text", "capacity": "L"},
                "parts": {"type": "object", "seq": {"type": "int"}}
            }),
        )
        .unwrap();
        Expander::new(false).expand(&def).unwrap()
    }

    #[test]
    fn test_canonical_key_order() {
        let text = canonical("note", &sample());
        let parsed: Value = serde_json::from_str(&text).unwrap();
        let keys: Vec<&String> = parsed["note"].as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec![
                "type",
                "comment",
                "id",
                "time_created",
                "time_updated",
                "body",
                "parts",
                "indexes"
            ]
        );
        assert!(text.starts_with(concat!(
            r#"{"note":{"type":"object","comment":"short notes","#,
            r#""id":{"type":"int","comment":"note instance id"}"#
        )));
    }

    #[test]
    fn test_pretty_matches_canonical() {
        let obj = sample();
        let style = PrettyStyle::default();
        let pretty_text = pretty("note", &obj, &style);
        let reparsed: Value = serde_json::from_str(&pretty_text).unwrap();
        let canonical_value: Value = serde_json::from_str(&canonical("note", &obj)).unwrap();
        assert_eq!(reparsed, canonical_value);
        assert_eq!(reparsed.to_string(), canonical_value.to_string());
        assert!(pretty_text.contains("\n    \"body\": {\"type\":\"text\",\"capacity\":\"L\"}"));
        assert!(pretty_text.contains("\n        \"seq\": {\"type\":\"int\"}"));
    }

    #[test]
    fn test_pretty_emphasis_and_layout() {
        let style = PrettyStyle {
            newline: "<br>".into(),
            indent: "&nbsp;".into(),
            emphasis: "<b>{}</b>".into(),
        };
        let text = pretty("note", &sample(), &style);
        assert!(text.starts_with(r#"{"<b>note</b>": {<br>&nbsp;"<b>type</b>": "object""#));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_compact_preserves_order() {
        let text = "{\n  \"z\": 1,\n  \"a\": {\"y\": [1, 2], \"b\": \"x\"}\n}";
        assert_eq!(compact(text).unwrap(), r#"{"z":1,"a":{"y":[1,2],"b":"x"}}"#);
        assert!(compact("{").is_err());
    }
}
