//! CREATE TABLE / CREATE INDEX generation for expanded definitions.

pub mod typemap;

use crate::expand::ExpandedObject;
use crate::index::{sql_index_name, Index, IndexKind, SortOrder};
use crate::property::{Property, PropertyType};
use crate::schema::ObjectKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    #[default]
    Mysql,
}

impl Dialect {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sqlite" => Some(Dialect::Sqlite),
            "mysql" => Some(Dialect::Mysql),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
        }
    }

    /// Whether `ALTER TABLE ... MODIFY` is available.
    pub fn supports_modify_column(&self) -> bool {
        matches!(self, Dialect::Mysql)
    }

    pub fn supports_fulltext(&self) -> bool {
        matches!(self, Dialect::Mysql)
    }
}

/// Full clauses carry comments and auto-increment; short clauses are the
/// structural signature compared during migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    Full,
    Short,
}

/// Whitespace used inside CREATE TABLE statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub newline: String,
    pub indent: String,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            newline: "\n".into(),
            indent: "  ".into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DdlGenerator {
    dialect: Dialect,
    layout: Layout,
}

impl DdlGenerator {
    pub fn new(dialect: Dialect) -> Self {
        DdlGenerator {
            dialect,
            layout: Layout::default(),
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Column clause of `name` within the table of `obj`.
    pub fn column_clause(
        &self,
        obj: &ExpandedObject,
        name: &str,
        property: &Property,
        rendering: Rendering,
    ) -> String {
        let mut clause = format!("`{name}` {}", typemap::column_type(self.dialect, property));
        if primary_column(obj) == Some(name) {
            clause.push_str(" PRIMARY KEY");
            let autoincrement = property.property_type == PropertyType::Int
                && obj.kind != ObjectKind::ObjectExtension
                && rendering == Rendering::Full;
            if autoincrement {
                clause.push_str(match self.dialect {
                    Dialect::Sqlite => " AUTOINCREMENT",
                    Dialect::Mysql => " AUTO_INCREMENT",
                });
            }
            clause.push_str(" NOT NULL");
        } else if let Some(default) = typemap::default_clause(self.dialect, property, rendering) {
            clause.push(' ');
            clause.push_str(&default);
        }
        if rendering == Rendering::Full {
            let mut note = property.comment.clone().unwrap_or_default();
            if let Some(pattern) = property.pattern.as_deref().filter(|p| !p.is_empty()) {
                note.push(' ');
                note.push_str(pattern);
            }
            if !note.is_empty() {
                clause.push(' ');
                clause.push_str(&self.comment(&note));
            }
        }
        clause
    }

    fn comment(&self, text: &str) -> String {
        match self.dialect {
            Dialect::Sqlite => format!("/*{}*/", text.replace("*/", "* /")),
            Dialect::Mysql => format!("COMMENT {}", mysql_string(text)),
        }
    }

    /// CREATE TABLE for the scalar columns of `obj`.
    pub fn create_table(&self, obj: &ExpandedObject) -> String {
        let table = obj.table_name();
        let comment = obj
            .header
            .get("comment")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty());

        let mut rows: Vec<String> = obj
            .columns()
            .map(|(name, p)| {
                format!(
                    "{}{}",
                    self.layout.indent,
                    self.column_clause(obj, name, p, Rendering::Full)
                )
            })
            .collect();
        if let Some(primary) = obj.indexes.primary() {
            if primary.columns.len() > 1 && covers(obj, primary) {
                let cols = primary
                    .columns
                    .iter()
                    .map(|c| format!("`{}`", c.name))
                    .collect::<Vec<_>>()
                    .join(",");
                rows.push(format!("{}PRIMARY KEY({cols})", self.layout.indent));
            }
        }

        let mut sql = format!("CREATE TABLE `{table}`");
        if let (Dialect::Sqlite, Some(c)) = (self.dialect, comment) {
            sql.push_str(&self.comment(c));
        }
        sql.push('(');
        sql.push_str(&self.layout.newline);
        sql.push_str(&rows.join(&format!(",{}", self.layout.newline)));
        sql.push_str(&self.layout.newline);
        sql.push(')');
        if self.dialect == Dialect::Mysql {
            if let Some(c) = comment {
                sql.push_str(&format!(" COMMENT={}", mysql_string(c)));
            }
            sql.push_str(" DEFAULT CHARSET=utf8");
        }
        sql
    }

    /// CREATE INDEX statements for every non-primary index of `obj`.
    pub fn create_indexes(&self, obj: &ExpandedObject) -> Vec<String> {
        let table = obj.table_name();
        obj.indexes
            .iter()
            .filter(|ix| ix.kind != IndexKind::Primary)
            .filter(|ix| {
                let ok = covers(obj, ix);
                if !ok {
                    log::debug!("{table}: skipping index '{}' over unknown columns", ix.name);
                }
                ok
            })
            .map(|ix| {
                let keyword = match ix.kind {
                    IndexKind::Unique => "CREATE UNIQUE INDEX",
                    IndexKind::Fulltext if self.dialect.supports_fulltext() => {
                        "CREATE FULLTEXT INDEX"
                    }
                    _ => "CREATE INDEX",
                };
                let columns = ix
                    .columns
                    .iter()
                    .map(|c| match c.order {
                        Some(SortOrder::Asc) => format!("`{}` ASC", c.name),
                        Some(SortOrder::Desc) => format!("`{}` DESC", c.name),
                        None => format!("`{}`", c.name),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                format!(
                    "{keyword} `{}` ON `{table}`({columns})",
                    sql_index_name(&table, &ix.name)
                )
            })
            .collect()
    }

    /// CREATE TABLE followed by its indexes.
    pub fn table_statements(&self, obj: &ExpandedObject) -> Vec<String> {
        let mut out = vec![self.create_table(obj)];
        out.extend(self.create_indexes(obj));
        out
    }

    /// Statements for the whole tree, child tables first.
    pub fn create_statements(&self, root: &ExpandedObject) -> Vec<String> {
        root.tables()
            .into_iter()
            .flat_map(|t| self.table_statements(t))
            .collect()
    }
}

/// The column carrying a single-column primary key.
fn primary_column(obj: &ExpandedObject) -> Option<&str> {
    match obj.indexes.primary()?.columns.as_slice() {
        [only] => Some(only.name.as_str()),
        _ => None,
    }
}

fn covers(obj: &ExpandedObject, index: &Index) -> bool {
    index.columns.iter().all(|c| obj.column(&c.name).is_some())
}

fn mysql_string(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}
