//! Allow/deny table filtering of the merged change stream.

use std::collections::HashSet;

use pitr_config::shared::FilterConfig;

/// Pure predicate over `(database, table)` pairs.
///
/// Deny lists take precedence over allow lists; an empty allow list with no
/// deny entries allows everything. Database names are case-insensitive,
/// table names are not.
#[derive(Debug, Default)]
pub struct TableFilter {
    do_dbs: HashSet<String>,
    do_tables: HashSet<(String, String)>,
    ignore_dbs: HashSet<String>,
    ignore_tables: HashSet<(String, String)>,
}

impl TableFilter {
    /// Builds the filter from its configuration.
    ///
    /// Table references must be `db.table`; malformed entries are rejected
    /// by config validation before this point and skipped here.
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            do_dbs: lowercase_set(&config.do_dbs),
            do_tables: reference_set(&config.do_tables),
            ignore_dbs: lowercase_set(&config.ignore_dbs),
            ignore_tables: reference_set(&config.ignore_tables),
        }
    }

    /// Whether changes of this table pass the filter.
    pub fn allows(&self, database: &str, table: &str) -> bool {
        let database = database.to_lowercase();
        let reference = (database.clone(), table.to_string());

        if self.ignore_dbs.contains(&database) || self.ignore_tables.contains(&reference) {
            return false;
        }

        if self.do_dbs.is_empty() && self.do_tables.is_empty() {
            return true;
        }

        self.do_dbs.contains(&database) || self.do_tables.contains(&reference)
    }
}

fn lowercase_set(names: &[String]) -> HashSet<String> {
    names.iter().map(|name| name.to_lowercase()).collect()
}

fn reference_set(references: &[String]) -> HashSet<(String, String)> {
    references
        .iter()
        .filter_map(|reference| reference.split_once('.'))
        .map(|(database, table)| (database.to_lowercase(), table.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        do_dbs: &[&str],
        do_tables: &[&str],
        ignore_dbs: &[&str],
        ignore_tables: &[&str],
    ) -> FilterConfig {
        let owned = |items: &[&str]| items.iter().map(|item| item.to_string()).collect();
        FilterConfig {
            do_dbs: owned(do_dbs),
            do_tables: owned(do_tables),
            ignore_dbs: owned(ignore_dbs),
            ignore_tables: owned(ignore_tables),
        }
    }

    #[test]
    fn empty_filter_allows_everything() {
        let filter = TableFilter::from_config(&config(&[], &[], &[], &[]));
        assert!(filter.allows("orders", "items"));
    }

    #[test]
    fn allow_list_restricts_to_listed_objects() {
        let filter = TableFilter::from_config(&config(&["orders"], &["audit.log"], &[], &[]));
        assert!(filter.allows("orders", "items"));
        assert!(filter.allows("audit", "log"));
        assert!(!filter.allows("audit", "other"));
        assert!(!filter.allows("billing", "invoices"));
    }

    #[test]
    fn deny_wins_over_allow() {
        let filter =
            TableFilter::from_config(&config(&["orders"], &[], &[], &["orders.internal"]));
        assert!(filter.allows("orders", "items"));
        assert!(!filter.allows("orders", "internal"));

        let filter = TableFilter::from_config(&config(&["orders"], &[], &["orders"], &[]));
        assert!(!filter.allows("orders", "items"));
    }

    #[test]
    fn database_names_are_case_insensitive() {
        let filter = TableFilter::from_config(&config(&["Orders"], &[], &[], &[]));
        assert!(filter.allows("ORDERS", "items"));
        assert!(filter.allows("orders", "items"));
    }
}
