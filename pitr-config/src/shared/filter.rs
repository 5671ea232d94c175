use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Allow/deny lists over databases and tables.
///
/// Table entries are `db.table` references. Deny lists win over allow lists
/// when both match; an empty allow list with no deny list means allow all.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FilterConfig {
    /// Databases to replicate. Empty means all databases.
    #[serde(default)]
    pub do_dbs: Vec<String>,
    /// Tables to replicate, as `db.table` references. Empty means all tables.
    #[serde(default)]
    pub do_tables: Vec<String>,
    /// Databases to suppress.
    #[serde(default)]
    pub ignore_dbs: Vec<String>,
    /// Tables to suppress, as `db.table` references.
    #[serde(default)]
    pub ignore_tables: Vec<String>,
}

impl FilterConfig {
    /// Validates that every table reference is of the form `db.table`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for table_ref in self.do_tables.iter().chain(self.ignore_tables.iter()) {
            let mut parts = table_ref.splitn(2, '.');
            let db = parts.next().unwrap_or_default();
            let table = parts.next().unwrap_or_default();
            if db.is_empty() || table.is_empty() {
                return Err(ValidationError::InvalidTableReference(table_ref.clone()));
            }
        }

        Ok(())
    }
}
