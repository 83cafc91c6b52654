//! AST table extraction.
//!
//! Extraction is a depth-first walk driven by `sqlparser`'s [`Visitor`]:
//! every relation the parser marks as a table reference yields one
//! [`TableReference`], wherever it sits in the tree. Subqueries, CTE
//! bodies, set operations and join trees are reached by the generic walk
//! without enumerating grammar productions here.
//!
//! A relation that names a CTE in scope is not a table. A CTE is in scope
//! inside later sibling definitions and the query body; inside its own
//! definition only under `WITH RECURSIVE`.

use crate::error::SqlError;
use sqlparser::ast::{
    ObjectName, ObjectNamePart, Query, SetExpr, Statement, TableFactor, Visit, Visitor,
};
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use warden_core::TableReference;

/// How relations without a schema qualifier are handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaPolicy {
    /// Unqualified names are an extraction failure.
    Require,
    /// Unqualified names are qualified with the given schema.
    Qualify(String),
    /// Unqualified names are kept as-is.
    AllowBare,
}

/// Extract the set of tables `statement` references.
///
/// Duplicates collapse. A relation with an empty name is skipped with a
/// warning; a name that cannot be resolved to `[schema.]table` fails.
pub fn extract_tables(
    statement: &Statement,
    policy: &SchemaPolicy,
) -> Result<BTreeSet<TableReference>, SqlError> {
    let mut collector = TableCollector {
        policy,
        scopes: Vec::new(),
        tables: BTreeSet::new(),
    };

    match statement.visit(&mut collector) {
        ControlFlow::Continue(()) => Ok(collector.tables),
        ControlFlow::Break(err) => Err(err),
    }
}

#[derive(Default)]
struct CteScope {
    /// CTE names with the address of their defining query.
    names: Vec<(String, *const Query)>,
    recursive: bool,
    /// How many of `names` are currently visible.
    visible: usize,
}

impl CteScope {
    fn position(&self, query: &Query) -> Option<usize> {
        self.names
            .iter()
            .position(|(_, defined)| std::ptr::eq(*defined, query))
    }
}

struct TableCollector<'p> {
    policy: &'p SchemaPolicy,
    scopes: Vec<CteScope>,
    tables: BTreeSet<TableReference>,
}

impl TableCollector<'_> {
    fn is_cte(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .any(|scope| scope.names[..scope.visible].iter().any(|(n, _)| n == name))
    }

    fn record(&mut self, schema: Option<&str>, name: &str) -> Result<(), SqlError> {
        if schema.is_none() && self.is_cte(&name.to_lowercase()) {
            return Ok(());
        }

        let table = TableReference::new(schema, name);
        let table = match (table.is_qualified(), self.policy) {
            (true, _) | (false, SchemaPolicy::AllowBare) => table,
            (false, SchemaPolicy::Qualify(default)) => table.qualify_with(default),
            (false, SchemaPolicy::Require) => {
                return Err(SqlError::UnqualifiedTable { name: table.name });
            }
        };

        tracing::trace!(table = %table, "extracted table reference");
        self.tables.insert(table);
        Ok(())
    }

    fn record_relation(&mut self, relation: &ObjectName) -> Result<(), SqlError> {
        let mut parts = Vec::with_capacity(relation.0.len());
        for part in &relation.0 {
            match part {
                ObjectNamePart::Identifier(ident) => parts.push(ident.value.as_str()),
                #[allow(unreachable_patterns)]
                _ => {
                    return Err(SqlError::UnsupportedReference {
                        name: relation.to_string(),
                    });
                }
            }
        }

        match parts.as_slice() {
            [] | [""] => {
                tracing::warn!(relation = %relation, "skipping table reference without a name");
                Ok(())
            }
            [name] => self.record(None, name),
            [schema, name] => self.record(Some(schema), name),
            _ => Err(SqlError::UnsupportedReference {
                name: relation.to_string(),
            }),
        }
    }

    /// `TABLE name` bodies carry plain strings rather than an `ObjectName`,
    /// so the relation hook never sees them.
    fn record_table_bodies(&mut self, body: &SetExpr) -> Result<(), SqlError> {
        match body {
            SetExpr::Table(table) => match &table.table_name {
                Some(name) => self.record(table.schema_name.as_deref(), name),
                None => {
                    tracing::warn!("skipping TABLE statement without a name");
                    Ok(())
                }
            },
            SetExpr::SetOperation { left, right, .. } => {
                self.record_table_bodies(left)?;
                self.record_table_bodies(right)
            }
            _ => Ok(()),
        }
    }
}

impl Visitor for TableCollector<'_> {
    type Break = SqlError;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(parent) = self.scopes.last_mut()
            && let Some(index) = parent.position(query)
        {
            parent.visible = if parent.recursive { parent.names.len() } else { index };
        }

        let scope = match &query.with {
            Some(with) => CteScope {
                names: with
                    .cte_tables
                    .iter()
                    .map(|cte| {
                        (
                            cte.alias.name.value.to_lowercase(),
                            cte.query.as_ref() as *const Query,
                        )
                    })
                    .collect(),
                recursive: with.recursive,
                visible: 0,
            },
            None => CteScope::default(),
        };
        self.scopes.push(scope);
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        // The body sees every CTE of its own WITH clause.
        if let Some(scope) = self.scopes.last_mut() {
            scope.visible = scope.names.len();
        }
        if let Err(err) = self.record_table_bodies(&query.body) {
            return ControlFlow::Break(err);
        }
        self.scopes.pop();

        if let Some(parent) = self.scopes.last_mut()
            && let Some(index) = parent.position(query)
        {
            parent.visible = if parent.recursive {
                parent.names.len()
            } else {
                index + 1
            };
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        match self.record_relation(relation) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => ControlFlow::Break(err),
        }
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        match factor {
            TableFactor::Table { .. }
            | TableFactor::Derived { .. }
            | TableFactor::NestedJoin { .. } => ControlFlow::Continue(()),
            other => ControlFlow::Break(SqlError::UnsupportedTableSource {
                detail: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlAnalyzer;
    use pretty_assertions::assert_eq;

    fn extract(sql: &str, policy: SchemaPolicy) -> Result<Vec<String>, SqlError> {
        let stmts = SqlAnalyzer::new().parse(sql).unwrap();
        extract_tables(&stmts[0], &policy)
            .map(|tables| tables.into_iter().map(|t| t.to_string()).collect())
    }

    fn strict(sql: &str) -> Vec<String> {
        extract(sql, SchemaPolicy::Require).unwrap()
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(strict("SELECT * FROM app_data.users"), vec!["app_data.users"]);
    }

    #[test]
    fn test_names_are_lowercased() {
        assert_eq!(strict("SELECT * FROM App_Data.USERS"), vec!["app_data.users"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        assert_eq!(
            strict("SELECT * FROM app_data.users a JOIN app_data.users b ON a.id = b.id"),
            vec!["app_data.users"]
        );
    }

    #[test]
    fn test_joins() {
        assert_eq!(
            strict(
                "SELECT * FROM app_data.orders o \
                 JOIN app_data.users u ON o.user_id = u.id \
                 LEFT JOIN app_data.items i ON i.order_id = o.id"
            ),
            vec!["app_data.items", "app_data.orders", "app_data.users"]
        );
    }

    #[test]
    fn test_subquery_in_where() {
        assert_eq!(
            strict(
                "SELECT id FROM app_data.users \
                 WHERE id IN (SELECT user_id FROM app_data.secrets)"
            ),
            vec!["app_data.secrets", "app_data.users"]
        );
    }

    #[test]
    fn test_scalar_subquery_in_projection() {
        assert_eq!(
            strict("SELECT (SELECT max(total) FROM app_data.orders) AS m FROM app_data.users"),
            vec!["app_data.orders", "app_data.users"]
        );
    }

    #[test]
    fn test_derived_table() {
        assert_eq!(
            strict("SELECT * FROM (SELECT * FROM app_data.secrets) AS s"),
            vec!["app_data.secrets"]
        );
    }

    #[test]
    fn test_union() {
        assert_eq!(
            strict("SELECT id FROM app_data.users UNION SELECT id FROM app_data.admins"),
            vec!["app_data.admins", "app_data.users"]
        );
    }

    #[test]
    fn test_cte_names_are_not_tables() {
        assert_eq!(
            strict(
                "WITH recent AS (SELECT * FROM app_data.orders) \
                 SELECT * FROM recent"
            ),
            vec!["app_data.orders"]
        );
    }

    #[test]
    fn test_later_cte_sees_earlier_one() {
        assert_eq!(
            strict(
                "WITH a AS (SELECT * FROM app_data.orders), b AS (SELECT * FROM a) \
                 SELECT * FROM b"
            ),
            vec!["app_data.orders"]
        );
    }

    #[test]
    fn test_cte_does_not_shadow_inside_its_own_definition() {
        let tables = extract(
            "WITH users AS (SELECT * FROM users) SELECT * FROM users",
            SchemaPolicy::Qualify("public".to_string()),
        )
        .unwrap();
        assert_eq!(tables, vec!["public.users"]);
    }

    #[test]
    fn test_recursive_cte_references_itself() {
        assert_eq!(
            strict(
                "WITH RECURSIVE tree AS ( \
                   SELECT id, parent_id FROM app_data.nodes \
                   UNION ALL \
                   SELECT n.id, n.parent_id FROM app_data.nodes n JOIN tree t ON n.parent_id = t.id) \
                 SELECT * FROM tree"
            ),
            vec!["app_data.nodes"]
        );
    }

    #[test]
    fn test_cte_scope_ends_with_its_query() {
        let tables = extract(
            "SELECT * FROM (WITH x AS (SELECT * FROM app_data.orders) SELECT * FROM x) AS d \
             JOIN x ON true",
            SchemaPolicy::AllowBare,
        )
        .unwrap();
        assert_eq!(tables, vec!["app_data.orders", "x"]);
    }

    #[test]
    fn test_strict_rejects_unqualified() {
        let err = extract("SELECT * FROM users", SchemaPolicy::Require).unwrap_err();
        assert!(matches!(err, SqlError::UnqualifiedTable { ref name } if name == "users"));
    }

    #[test]
    fn test_lenient_qualifies_bare_names() {
        let tables = extract(
            "SELECT * FROM users JOIN sales.orders o ON o.user_id = users.id",
            SchemaPolicy::Qualify("app_data".to_string()),
        )
        .unwrap();
        assert_eq!(tables, vec!["app_data.users", "sales.orders"]);
    }

    #[test]
    fn test_allow_bare() {
        let tables = extract("SELECT * FROM artifact", SchemaPolicy::AllowBare).unwrap();
        assert_eq!(tables, vec!["artifact"]);
    }

    #[test]
    fn test_three_part_names_fail() {
        let err = extract("SELECT * FROM db.app_data.users", SchemaPolicy::Require).unwrap_err();
        assert!(matches!(err, SqlError::UnsupportedReference { .. }));
    }

    #[test]
    fn test_table_function_is_a_reference() {
        let tables = extract(
            "SELECT * FROM read_csv_auto('/etc/passwd')",
            SchemaPolicy::AllowBare,
        )
        .unwrap();
        assert_eq!(tables, vec!["read_csv_auto"]);
    }

    #[test]
    fn test_table_statement_body() {
        assert_eq!(strict("TABLE app_data.users"), vec!["app_data.users"]);
    }

    #[test]
    fn test_table_body_naming_a_cte() {
        assert_eq!(
            strict("WITH a AS (SELECT id FROM app_data.users) TABLE a"),
            vec!["app_data.users"]
        );
        assert_eq!(
            strict("WITH a AS (TABLE app_data.orders) SELECT id FROM a UNION TABLE a"),
            vec!["app_data.orders"]
        );
    }

    #[test]
    fn test_no_tables() {
        assert!(strict("SELECT 1").is_empty());
    }
}
