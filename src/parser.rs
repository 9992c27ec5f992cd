//! Query metadata extraction
//!
//! The engine needs to know which resource tables a query mentions before it
//! can materialize them. We parse the SQL with `sqlparser` (SQLite dialect)
//! and walk the AST collecting relation names. A relation spelled
//! `schema.table` carries an explicit region; a bare `table` defaults to the
//! session's home region. Resource tables always look like
//! `<resource_kind>_<collection_name>`, so relations without an underscore
//! (CTE aliases, scratch tables) are left for SQLite itself to resolve.

use std::collections::HashSet;
use std::ops::ControlFlow;

use sqlparser::ast::{visit_relations, ObjectName, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::error::{CloudqError, Result};

/// A table referenced by a query: optional region schema plus table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableReference {
    /// Region schema the query named explicitly, normalized spelling.
    pub database: Option<String>,
    /// Table name in `<resource_kind>_<collection_name>` form.
    pub table: String,
}

impl TableReference {
    /// Split the table name on the first `_` into (resource kind, collection).
    pub fn split(&self) -> Result<(&str, &str)> {
        self.table.split_once('_').ok_or_else(|| {
            CloudqError::query(format!(
                "table `{}` is not a <resource>_<collection> reference",
                self.table
            ))
        })
    }
}

/// Extract the resource table references mentioned by `sql`.
///
/// Duplicates are collapsed; order of first appearance is preserved so table
/// loads happen in the order the query names them.
pub fn table_references(sql: &str) -> Result<Vec<TableReference>> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, sql)
        .map_err(|e| CloudqError::query(format!("SQL parse error: {}", e)))?;

    let mut refs: Vec<TableReference> = Vec::new();
    for statement in &statements {
        let cte_names = cte_names(statement);
        let _ = visit_relations(statement, |name: &ObjectName| {
            if let Some(table_ref) = to_table_reference(name, &cte_names) {
                if !refs.contains(&table_ref) {
                    refs.push(table_ref);
                }
            }
            ControlFlow::<()>::Continue(())
        });
    }
    Ok(refs)
}

fn to_table_reference(name: &ObjectName, cte_names: &HashSet<String>) -> Option<TableReference> {
    let parts: Vec<&str> = name.0.iter().map(|ident| ident.value.as_str()).collect();
    match parts.as_slice() {
        [table] if table.contains('_') && !cte_names.contains(*table) => Some(TableReference {
            database: None,
            table: (*table).to_string(),
        }),
        [database, table] if table.contains('_') => Some(TableReference {
            database: Some((*database).to_string()),
            table: (*table).to_string(),
        }),
        _ => None,
    }
}

/// Names bound by a top-level WITH clause; these shadow resource tables.
fn cte_names(statement: &Statement) -> HashSet<String> {
    let mut names = HashSet::new();
    if let Statement::Query(query) = statement {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                names.insert(cte.alias.name.value.clone());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_select() {
        let refs = table_references("select id from ec2_instances").unwrap();
        assert_eq!(
            refs,
            vec![TableReference {
                database: None,
                table: "ec2_instances".to_string(),
            }]
        );
    }

    #[test]
    fn test_qualified_table() {
        let refs =
            table_references("select * from us_west_2.ec2_volumes where size > 100").unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].database.as_deref(), Some("us_west_2"));
        assert_eq!(refs[0].table, "ec2_volumes");
    }

    #[test]
    fn test_join_collects_both_sides() {
        let refs = table_references(
            "select i.id, v.id from ec2_instances i \
             join us_east_1.ec2_volumes v on v.id = i.id",
        )
        .unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].table, "ec2_instances");
        assert_eq!(refs[1].table, "ec2_volumes");
    }

    #[test]
    fn test_duplicates_collapsed() {
        let refs = table_references(
            "select * from ec2_instances union select * from ec2_instances",
        )
        .unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_no_tables() {
        let refs = table_references("select 1 + 1").unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn test_cte_alias_not_a_resource_table() {
        let refs = table_references(
            "with running_set as (select id from ec2_instances) \
             select count(*) from running_set",
        )
        .unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].table, "ec2_instances");
    }

    #[test]
    fn test_parse_error_is_query_error() {
        let err = table_references("select from from").unwrap_err();
        assert!(matches!(err, CloudqError::Query(_)));
    }

    #[test]
    fn test_split() {
        let r = TableReference {
            database: None,
            table: "s3_buckets".to_string(),
        };
        assert_eq!(r.split().unwrap(), ("s3", "buckets"));

        let bad = TableReference {
            database: None,
            table: "buckets".to_string(),
        };
        assert!(bad.split().is_err());
    }
}
