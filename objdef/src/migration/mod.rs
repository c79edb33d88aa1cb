//! Incremental migration: compares expanded tables against what a live
//! database reports and emits the ALTER statements that close the gap.

use crate::ddl::{DdlGenerator, Dialect, Rendering};
use crate::error::Result;
use crate::expand::ExpandedObject;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Read access to the structure of live tables.
pub trait TableInspector {
    fn table_exists(&self, table: &str) -> Result<bool>;

    fn column_exists(&self, table: &str, column: &str) -> Result<bool>;

    /// Whether the live column's short signature equals `signature`.
    fn same_signature(&self, table: &str, column: &str, signature: &str) -> Result<bool>;
}

/// A single structural change to a live column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnChange {
    Added {
        table: String,
        column: String,
        clause: String,
        signature: String,
    },
    Modified {
        table: String,
        column: String,
        clause: String,
        signature: String,
    },
}

impl ColumnChange {
    pub fn table(&self) -> &str {
        match self {
            ColumnChange::Added { table, .. } | ColumnChange::Modified { table, .. } => table,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            ColumnChange::Added { column, .. } | ColumnChange::Modified { column, .. } => column,
        }
    }

    /// Short signature the column has once the change is applied.
    pub fn signature(&self) -> &str {
        match self {
            ColumnChange::Added { signature, .. } | ColumnChange::Modified { signature, .. } => {
                signature
            }
        }
    }

    pub fn statement(&self, dialect: Dialect) -> String {
        match (self, dialect) {
            (ColumnChange::Added { table, clause, .. }, Dialect::Sqlite) => {
                format!("ALTER TABLE `{table}` ADD COLUMN {clause}")
            }
            (ColumnChange::Added { table, clause, .. }, Dialect::Mysql) => {
                format!("ALTER TABLE `{table}` ADD {clause}")
            }
            (ColumnChange::Modified { table, clause, .. }, _) => {
                format!("ALTER TABLE `{table}` MODIFY {clause}")
            }
        }
    }

    /// Human-readable description of this change.
    pub fn describe(&self) -> String {
        match self {
            ColumnChange::Added { table, column, .. } => {
                format!("Column '{}.{}' added", table, column)
            }
            ColumnChange::Modified {
                table,
                column,
                signature,
                ..
            } => {
                format!("Column '{}.{}' changed to {}", table, column, signature)
            }
        }
    }
}

/// Outcome of comparing one table with its live counterpart.
#[derive(Debug, Clone, PartialEq)]
pub enum TableDiff {
    /// No live table, or it could not be inspected.
    Missing,
    Changes(Vec<ColumnChange>),
}

impl TableDiff {
    pub fn is_in_sync(&self) -> bool {
        matches!(self, TableDiff::Changes(changes) if changes.is_empty())
    }
}

/// Compare the scalar columns of `obj` against the live table. Columns only
/// present live are left alone.
pub fn diff_table(
    obj: &ExpandedObject,
    generator: &DdlGenerator,
    inspector: &dyn TableInspector,
) -> TableDiff {
    match column_changes(obj, generator, inspector) {
        Ok(Some(changes)) => TableDiff::Changes(changes),
        Ok(None) => TableDiff::Missing,
        Err(e) => {
            log::warn!(
                "{}: cannot inspect live table, treating it as absent: {e}",
                obj.table_name()
            );
            TableDiff::Missing
        }
    }
}

fn column_changes(
    obj: &ExpandedObject,
    generator: &DdlGenerator,
    inspector: &dyn TableInspector,
) -> Result<Option<Vec<ColumnChange>>> {
    let table = obj.table_name();
    if !inspector.table_exists(&table)? {
        return Ok(None);
    }
    let mut changes = Vec::new();
    for (name, property) in obj.columns() {
        let clause = generator.column_clause(obj, name, property, Rendering::Full);
        let signature = generator.column_clause(obj, name, property, Rendering::Short);
        if !inspector.column_exists(&table, name)? {
            changes.push(ColumnChange::Added {
                table: table.clone(),
                column: name.to_string(),
                clause,
                signature,
            });
        } else if !inspector.same_signature(&table, name, &signature)? {
            if generator.dialect().supports_modify_column() {
                changes.push(ColumnChange::Modified {
                    table: table.clone(),
                    column: name.to_string(),
                    clause,
                    signature,
                });
            } else {
                log::debug!(
                    "{table}.{name}: {} cannot modify columns, skipping",
                    generator.dialect().as_str()
                );
            }
        }
    }
    Ok(Some(changes))
}

/// ALTER statements for every table of the tree, with full CREATE
/// statements for tables the inspector does not know. Child tables first.
pub fn plan_migration(
    root: &ExpandedObject,
    generator: &DdlGenerator,
    inspector: &dyn TableInspector,
) -> Vec<String> {
    let mut statements = Vec::new();
    for table in root.tables() {
        match diff_table(table, generator, inspector) {
            TableDiff::Missing => statements.extend(generator.table_statements(table)),
            TableDiff::Changes(changes) => statements.extend(
                changes
                    .iter()
                    .map(|c| c.statement(generator.dialect())),
            ),
        }
    }
    statements
}

/// Recorded short signatures of live tables, keyed by table then column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSnapshot {
    tables: IndexMap<String, IndexMap<String, String>>,
}

impl TableSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, table: &str, column: &str, signature: &str) -> Self {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string(), signature.to_string());
        self
    }

    /// Record every table of `root` as if its CREATE statements had run.
    pub fn record(&mut self, root: &ExpandedObject, generator: &DdlGenerator) {
        for table in root.tables() {
            let columns = table
                .columns()
                .map(|(name, p)| {
                    (
                        name.to_string(),
                        generator.column_clause(table, name, p, Rendering::Short),
                    )
                })
                .collect();
            self.tables.insert(table.table_name(), columns);
        }
    }

    /// Reflect an executed change.
    pub fn apply(&mut self, change: &ColumnChange) {
        self.tables
            .entry(change.table().to_string())
            .or_default()
            .insert(change.column().to_string(), change.signature().to_string());
    }

    pub fn columns(&self, table: &str) -> Option<&IndexMap<String, String>> {
        self.tables.get(table)
    }
}

impl TableInspector for TableSnapshot {
    fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.tables.contains_key(table))
    }

    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self
            .tables
            .get(table)
            .map(|cols| cols.contains_key(column))
            .unwrap_or(false))
    }

    fn same_signature(&self, table: &str, column: &str, signature: &str) -> Result<bool> {
        Ok(self
            .tables
            .get(table)
            .and_then(|cols| cols.get(column))
            .map(|s| s == signature)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObjdefError;
    use crate::expand::Expander;
    use crate::schema::parse_document_yaml_str;
    use pretty_assertions::assert_eq;

    fn expand_yaml(yaml: &str, identifier: &str) -> ExpandedObject {
        let doc = parse_document_yaml_str(yaml).unwrap();
        let def = doc.definition(identifier).unwrap();
        Expander::new(false).expand(&def).unwrap()
    }

    const USERS_V1: &str = r#"
users:
  type: object
  name: { type: string, size: 64, comment: "display name" }
"#;

    const USERS_V2: &str = r#"
users:
  type: object
  name: { type: string, size: 64, comment: "shown in the header" }
  email: { type: string, size: 128 }
  points: { type: int, default: 10 }
"#;

    const USERS_V3: &str = r#"
users:
  type: object
  name: { type: string, size: 100 }
"#;

    struct BrokenInspector;

    impl TableInspector for BrokenInspector {
        fn table_exists(&self, _table: &str) -> Result<bool> {
            Err(ObjdefError::Inspection("connection refused".into()))
        }

        fn column_exists(&self, _table: &str, _column: &str) -> Result<bool> {
            Err(ObjdefError::Inspection("connection refused".into()))
        }

        fn same_signature(&self, _table: &str, _column: &str, _signature: &str) -> Result<bool> {
            Err(ObjdefError::Inspection("connection refused".into()))
        }
    }

    fn live(yaml: &str, generator: &DdlGenerator) -> TableSnapshot {
        let mut snapshot = TableSnapshot::new();
        snapshot.record(&expand_yaml(yaml, "users"), generator);
        snapshot
    }

    #[test]
    fn test_missing_table_gets_full_create() {
        let generator = DdlGenerator::new(Dialect::Mysql);
        let obj = expand_yaml(USERS_V1, "users");
        assert_eq!(diff_table(&obj, &generator, &TableSnapshot::new()), TableDiff::Missing);
        let plan = plan_migration(&obj, &generator, &TableSnapshot::new());
        assert_eq!(plan, generator.create_statements(&obj));
    }

    #[test]
    fn test_in_sync_is_noop() {
        let generator = DdlGenerator::new(Dialect::Mysql);
        let obj = expand_yaml(USERS_V1, "users");
        let snapshot = live(USERS_V1, &generator);
        assert!(diff_table(&obj, &generator, &snapshot).is_in_sync());
        assert!(plan_migration(&obj, &generator, &snapshot).is_empty());
    }

    #[test]
    fn test_added_columns_then_idempotent() {
        let generator = DdlGenerator::new(Dialect::Mysql);
        let obj = expand_yaml(USERS_V2, "users");
        let mut snapshot = live(USERS_V1, &generator);

        let first = plan_migration(&obj, &generator, &snapshot);
        assert_eq!(
            first,
            vec![
                "ALTER TABLE `users` ADD `email` varchar(128) DEFAULT ''",
                "ALTER TABLE `users` ADD `points` int DEFAULT '10'",
            ]
        );
        assert_eq!(plan_migration(&obj, &generator, &snapshot), first);

        match diff_table(&obj, &generator, &snapshot) {
            TableDiff::Changes(changes) => {
                assert_eq!(changes[0].describe(), "Column 'users.email' added");
                for change in &changes {
                    snapshot.apply(change);
                }
            }
            TableDiff::Missing => panic!("table should exist"),
        }
        assert!(plan_migration(&obj, &generator, &snapshot).is_empty());
    }

    #[test]
    fn test_comment_only_change_is_noop() {
        let generator = DdlGenerator::new(Dialect::Mysql);
        let mut obj = expand_yaml(USERS_V1, "users");
        let snapshot = live(USERS_V1, &generator);
        if let Some(crate::expand::Entry::Column(name)) = obj.entries.get_mut("name") {
            name.comment = Some("a different comment".into());
            name.pattern = Some("^.+$".into());
        }
        assert!(plan_migration(&obj, &generator, &snapshot).is_empty());
    }

    #[test]
    fn test_modified_column_per_dialect() {
        let mysql = DdlGenerator::new(Dialect::Mysql);
        let obj = expand_yaml(USERS_V3, "users");
        let plan = plan_migration(&obj, &mysql, &live(USERS_V1, &mysql));
        assert_eq!(
            plan,
            vec!["ALTER TABLE `users` MODIFY `name` varchar(100) DEFAULT ''"]
        );

        let sqlite = DdlGenerator::new(Dialect::Sqlite);
        assert!(plan_migration(&obj, &sqlite, &live(USERS_V1, &sqlite)).is_empty());
    }

    #[test]
    fn test_live_only_columns_are_kept() {
        let generator = DdlGenerator::new(Dialect::Mysql);
        let obj = expand_yaml(USERS_V1, "users");
        let snapshot = live(USERS_V1, &generator).with_column("users", "legacy", "`legacy` int");
        assert!(plan_migration(&obj, &generator, &snapshot).is_empty());
    }

    #[test]
    fn test_inspection_failure_means_absent() {
        let generator = DdlGenerator::new(Dialect::Sqlite);
        let obj = expand_yaml(USERS_V1, "users");
        assert_eq!(diff_table(&obj, &generator, &BrokenInspector), TableDiff::Missing);
        assert_eq!(
            plan_migration(&obj, &generator, &BrokenInspector),
            generator.create_statements(&obj)
        );
    }

    #[test]
    fn test_snapshot_serde_round_trip() {
        let generator = DdlGenerator::new(Dialect::Sqlite);
        let snapshot = live(USERS_V1, &generator);
        let yaml = serde_yaml::to_string(&snapshot).unwrap();
        let back: TableSnapshot = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(
            back.columns("users").unwrap().get("name").map(String::as_str),
            Some("`name` varchar(64) DEFAULT ''")
        );
    }

    #[test]
    fn test_generated_sqlite_statements_execute() {
        let generator = DdlGenerator::new(Dialect::Sqlite);
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let mut snapshot = TableSnapshot::new();

        let v1 = expand_yaml(USERS_V1, "users");
        for statement in plan_migration(&v1, &generator, &snapshot) {
            conn.execute_batch(&statement).unwrap();
        }
        snapshot.record(&v1, &generator);

        let v2 = expand_yaml(USERS_V2, "users");
        let plan = plan_migration(&v2, &generator, &snapshot);
        assert_eq!(plan.len(), 2);
        for statement in &plan {
            conn.execute_batch(statement).unwrap();
        }
        conn.execute("INSERT INTO `users` (`name`, `email`) VALUES ('ann', 'a@x.io')", [])
            .unwrap();
        let points: i64 = conn
            .query_row("SELECT `points` FROM `users` WHERE `name` = 'ann'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(points, 10);
    }
}
