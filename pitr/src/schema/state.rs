use std::collections::HashMap;

use crate::bail;
use crate::error::{ErrorKind, PitrResult};
use crate::types::SchemaEvent;

/// In-memory schema catalog with a monotonically advancing version.
///
/// The state is scoped to one run and owned by its replayer; it is never
/// shared across concurrent runs.
#[derive(Debug, Default)]
pub struct SchemaState {
    databases: HashMap<String, Database>,
    current_version: i64,
}

#[derive(Debug, Default)]
struct Database {
    tables: HashMap<String, Table>,
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
}

impl SchemaState {
    /// Creates an empty catalog at version zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently active schema version.
    pub fn current_version(&self) -> i64 {
        self.current_version
    }

    /// Whether the catalog knows the given table. Database names are
    /// case-insensitive.
    pub fn has_table(&self, database: &str, table: &str) -> bool {
        self.databases
            .get(&database.to_lowercase())
            .is_some_and(|db| db.tables.contains_key(table))
    }

    /// Columns of a table, when it exists.
    pub fn columns(&self, database: &str, table: &str) -> Option<&[String]> {
        self.databases
            .get(&database.to_lowercase())
            .and_then(|db| db.tables.get(table))
            .map(|table| table.columns.as_slice())
    }

    /// Applies one schema event, advancing the version.
    ///
    /// The event's version must be strictly greater than the current one; a
    /// regression means the caller fed events out of order, which is fatal.
    /// A descriptor that is malformed or conflicts with the current catalog
    /// fails with [`ErrorKind::DdlApply`].
    pub fn apply(&mut self, event: &SchemaEvent) -> PitrResult<()> {
        if event.version <= self.current_version {
            bail!(
                ErrorKind::DdlApply,
                "schema version regression",
                format!(
                    "event version {} is not past current version {}",
                    event.version, self.current_version
                )
            );
        }

        self.execute(&event.ddl)?;
        self.current_version = event.version;

        Ok(())
    }

    /// Executes one DDL descriptor against the catalog.
    ///
    /// Descriptors are whitespace-separated, keyword-first:
    /// `create database <db>`, `drop database <db>`,
    /// `create table <db>.<table>`, `drop table <db>.<table>`,
    /// `add column <db>.<table> <column>`, `drop column <db>.<table> <column>`.
    fn execute(&mut self, ddl: &str) -> PitrResult<()> {
        let tokens: Vec<&str> = ddl.split_whitespace().collect();
        let action = tokens
            .first()
            .map(|token| token.to_lowercase())
            .unwrap_or_default();
        let object = tokens
            .get(1)
            .map(|token| token.to_lowercase())
            .unwrap_or_default();

        match (action.as_str(), object.as_str(), &tokens[2..]) {
            ("create", "database", [name]) => {
                let name = name.to_lowercase();
                if self.databases.contains_key(&name) {
                    bail!(ErrorKind::DdlApply, "database already exists", name);
                }
                self.databases.insert(name, Database::default());
            }
            ("drop", "database", [name]) => {
                let name = name.to_lowercase();
                if self.databases.remove(&name).is_none() {
                    bail!(ErrorKind::DdlApply, "database does not exist", name);
                }
            }
            ("create", "table", [reference]) => {
                let (database, table) = split_reference(reference, ddl)?;
                let db = self.database_mut(&database, ddl)?;
                if db.tables.contains_key(&table) {
                    bail!(ErrorKind::DdlApply, "table already exists", ddl.to_string());
                }
                db.tables.insert(table, Table::default());
            }
            ("drop", "table", [reference]) => {
                let (database, table) = split_reference(reference, ddl)?;
                let db = self.database_mut(&database, ddl)?;
                if db.tables.remove(&table).is_none() {
                    bail!(ErrorKind::DdlApply, "table does not exist", ddl.to_string());
                }
            }
            ("add", "column", [reference, column]) => {
                let table = self.table_mut(reference, ddl)?;
                if table.columns.iter().any(|existing| existing == column) {
                    bail!(ErrorKind::DdlApply, "column already exists", ddl.to_string());
                }
                table.columns.push(column.to_string());
            }
            ("drop", "column", [reference, column]) => {
                let table = self.table_mut(reference, ddl)?;
                let position = table.columns.iter().position(|existing| existing == column);
                match position {
                    Some(position) => {
                        table.columns.remove(position);
                    }
                    None => {
                        bail!(ErrorKind::DdlApply, "column does not exist", ddl.to_string());
                    }
                }
            }
            _ => {
                bail!(
                    ErrorKind::DdlApply,
                    "malformed ddl descriptor",
                    ddl.to_string()
                );
            }
        }

        Ok(())
    }

    fn database_mut(&mut self, database: &str, ddl: &str) -> PitrResult<&mut Database> {
        match self.databases.get_mut(database) {
            Some(db) => Ok(db),
            None => {
                bail!(ErrorKind::DdlApply, "database does not exist", ddl.to_string());
            }
        }
    }

    fn table_mut(&mut self, reference: &str, ddl: &str) -> PitrResult<&mut Table> {
        let (database, table) = split_reference(reference, ddl)?;
        let db = self.database_mut(&database, ddl)?;
        match db.tables.get_mut(&table) {
            Some(table) => Ok(table),
            None => {
                bail!(ErrorKind::DdlApply, "table does not exist", ddl.to_string());
            }
        }
    }
}

fn split_reference(reference: &str, ddl: &str) -> PitrResult<(String, String)> {
    match reference.split_once('.') {
        Some((database, table)) if !database.is_empty() && !table.is_empty() => {
            Ok((database.to_lowercase(), table.to_string()))
        }
        _ => {
            bail!(
                ErrorKind::DdlApply,
                "table reference must be db.table",
                ddl.to_string()
            );
        }
    }
}
