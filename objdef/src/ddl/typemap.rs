//! Property type to column type mapping, one exhaustive table per dialect.

use super::{Dialect, Rendering};
use crate::property::{Property, PropertyType, ZERO_TIME};

/// Decimal places used when a decimal property declares none.
pub const DEFAULT_DECIMAL_PLACES: u32 = 2;

/// Storage tier of a text or blob column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capacity {
    Regular,
    Medium,
    Long,
}

impl Capacity {
    fn of(property: &Property) -> Self {
        match property.capacity.as_deref() {
            Some("L") | Some("long") => Capacity::Long,
            Some("M") | Some("medium") => Capacity::Medium,
            _ => Capacity::Regular,
        }
    }
}

pub fn column_type(dialect: Dialect, property: &Property) -> String {
    match property.property_type {
        PropertyType::Int => match dialect {
            Dialect::Sqlite => "INTEGER".into(),
            Dialect::Mysql => "int".into(),
        },
        PropertyType::Long => "bigint".into(),
        PropertyType::Float => match dialect {
            Dialect::Sqlite => "REAL".into(),
            Dialect::Mysql => "FLOAT".into(),
        },
        PropertyType::Decimal => format!(
            "decimal(20,{})",
            property.decimal_places.unwrap_or(DEFAULT_DECIMAL_PLACES)
        ),
        PropertyType::String
        | PropertyType::Password
        | PropertyType::Ipv4
        | PropertyType::Ipv6
        | PropertyType::Dotids => format!("varchar({})", property.effective_size()),
        PropertyType::Text => match Capacity::of(property) {
            Capacity::Long => "LONGTEXT".into(),
            Capacity::Medium => "MEDIUMTEXT".into(),
            Capacity::Regular => "TEXT".into(),
        },
        PropertyType::Blob => match Capacity::of(property) {
            Capacity::Long => "LONGBLOB".into(),
            Capacity::Medium => "MEDIUMBLOB".into(),
            Capacity::Regular => "TEXT".into(),
        },
        PropertyType::Time => "datetime".into(),
    }
}

/// The `DEFAULT ...` part of a column clause, if the type takes one.
pub fn default_clause(
    dialect: Dialect,
    property: &Property,
    rendering: Rendering,
) -> Option<String> {
    let declared = property.default_text();
    match property.property_type {
        PropertyType::Int
        | PropertyType::Long
        | PropertyType::Float
        | PropertyType::Decimal => Some(format!(
            "DEFAULT {}",
            literal(declared.as_deref().unwrap_or("0"))
        )),
        PropertyType::String
        | PropertyType::Password
        | PropertyType::Ipv4
        | PropertyType::Ipv6
        | PropertyType::Dotids => Some(format!(
            "DEFAULT {}",
            literal(declared.as_deref().unwrap_or_default())
        )),
        PropertyType::Text | PropertyType::Blob => None,
        PropertyType::Time => match declared.as_deref() {
            Some("now") => (dialect == Dialect::Sqlite && rendering == Rendering::Full)
                .then(|| "DEFAULT current_timestamp".to_string()),
            Some(value) => Some(format!("DEFAULT {}", literal(value))),
            None => Some(format!("DEFAULT {}", literal(ZERO_TIME))),
        },
    }
}

/// Single-quoted SQL string literal.
pub fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prop(v: serde_json::Value) -> Property {
        let patch =
            crate::property::PropertyPatch::from_map("t", "p", v.as_object().unwrap()).unwrap();
        Property::from_patch("t", "p", &patch).unwrap()
    }

    #[test]
    fn test_numeric_types_per_dialect() {
        let int = prop(json!({"type": "int"}));
        assert_eq!(column_type(Dialect::Sqlite, &int), "INTEGER");
        assert_eq!(column_type(Dialect::Mysql, &int), "int");
        let float = prop(json!({"type": "float"}));
        assert_eq!(column_type(Dialect::Sqlite, &float), "REAL");
        assert_eq!(column_type(Dialect::Mysql, &float), "FLOAT");
        assert_eq!(column_type(Dialect::Mysql, &prop(json!({"type": "long"}))), "bigint");
    }

    #[test]
    fn test_decimal_places() {
        assert_eq!(
            column_type(Dialect::Mysql, &prop(json!({"type": "decimal"}))),
            "decimal(20,2)"
        );
        assert_eq!(
            column_type(Dialect::Sqlite, &prop(json!({"type": "decimal", "decimal_places": 4}))),
            "decimal(20,4)"
        );
    }

    #[test]
    fn test_varchar_sizes() {
        assert_eq!(column_type(Dialect::Mysql, &prop(json!({"type": "ipv6"}))), "varchar(39)");
        assert_eq!(column_type(Dialect::Mysql, &prop(json!({"type": "password"}))), "varchar(255)");
        assert_eq!(
            column_type(Dialect::Mysql, &prop(json!({"type": "string", "size": 20}))),
            "varchar(20)"
        );
    }

    #[test]
    fn test_capacity_tiers() {
        let mysql = |v| column_type(Dialect::Mysql, &prop(v));
        assert_eq!(mysql(json!({"type": "text", "capacity": "M"})), "MEDIUMTEXT");
        assert_eq!(mysql(json!({"type": "text", "capacity": "long"})), "LONGTEXT");
        assert_eq!(mysql(json!({"type": "blob"})), "TEXT");
        assert_eq!(mysql(json!({"type": "blob", "capacity": "L"})), "LONGBLOB");
    }

    #[test]
    fn test_defaults() {
        let full = Rendering::Full;
        assert_eq!(
            default_clause(Dialect::Mysql, &prop(json!({"type": "int"})), full).as_deref(),
            Some("DEFAULT '0'")
        );
        assert_eq!(
            default_clause(Dialect::Mysql, &prop(json!({"type": "string"})), full).as_deref(),
            Some("DEFAULT ''")
        );
        let quoted = prop(json!({"type": "string", "default": "it's"}));
        assert_eq!(
            default_clause(Dialect::Mysql, &quoted, full).as_deref(),
            Some("DEFAULT 'it''s'")
        );
        let text = prop(json!({"type": "text", "default": "x"}));
        assert_eq!(default_clause(Dialect::Mysql, &text, full), None);
        assert_eq!(
            default_clause(Dialect::Sqlite, &prop(json!({"type": "time"})), full).as_deref(),
            Some("DEFAULT '0000-00-00 00:00:00'")
        );
    }

    #[test]
    fn test_now_only_for_full_sqlite() {
        let now = prop(json!({"type": "time", "default": "now"}));
        assert_eq!(
            default_clause(Dialect::Sqlite, &now, Rendering::Full).as_deref(),
            Some("DEFAULT current_timestamp")
        );
        assert_eq!(default_clause(Dialect::Sqlite, &now, Rendering::Short), None);
        assert_eq!(default_clause(Dialect::Mysql, &now, Rendering::Full), None);
    }
}
