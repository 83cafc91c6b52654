//! SQL policy validation.

use crate::error::SqlError;
use crate::extractor::{SchemaPolicy, extract_tables};
use crate::parser::{SqlAnalyzer, leading_keyword};
use sqlparser::ast::{
    Expr, GroupByExpr, JoinConstraint, JoinOperator, LimitClause, ObjectName, ObjectNamePart,
    Query, Select, SelectItem, SetExpr, Statement, TableFactor, TableWithJoins, Visit, Visitor,
};
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use warden_core::{
    AllowlistConfig, QueryMode, Rejection, RejectionKind, SafetyDecision, SchemaPolicyMode,
    TableReference, ValidationConfig,
};

/// The only table an artifact query may reference.
pub const ARTIFACT_TABLE: &str = "artifact";

const AGGREGATE_FUNCTIONS: &[&str] = &["count", "sum", "avg", "min", "max"];

/// Functions that run SQL text, touch the server filesystem, reach other
/// databases or read and change settings.
const FORBIDDEN_FUNCTIONS: &[&str] = &[
    "query_to_xml",
    "query_to_xml_and_xmlschema",
    "query_to_xmlschema",
    "pg_read_file",
    "pg_read_binary_file",
    "pg_stat_file",
    "pg_file_write",
    "lo_import",
    "lo_export",
    "lo_get",
    "lo_put",
    "lo_from_bytea",
    "current_setting",
    "set_config",
];

/// Prefixes of function families handled like [`FORBIDDEN_FUNCTIONS`].
const FORBIDDEN_FUNCTION_PREFIXES: &[&str] = &[
    "table_to_xml",
    "cursor_to_xml",
    "database_to_xml",
    "schema_to_xml",
    "pg_ls_",
    "dblink",
];

/// A statement that passed every check.
#[derive(Debug, Clone)]
pub struct ValidatedQuery {
    pub statement: Statement,
    /// Tables the statement references, qualified per the schema policy.
    pub tables: BTreeSet<TableReference>,
}

/// Validates untrusted SQL against the allowlist.
#[derive(Debug, Clone)]
pub struct SqlValidator {
    analyzer: SqlAnalyzer,
    allowlist: Arc<AllowlistConfig>,
    schema_policy: SchemaPolicyMode,
    default_schema: String,
}

impl SqlValidator {
    /// Create a validator with the strict schema policy.
    pub fn new(allowlist: Arc<AllowlistConfig>) -> Self {
        let defaults = ValidationConfig::default();
        Self {
            analyzer: SqlAnalyzer::new(),
            allowlist,
            schema_policy: defaults.schema_policy,
            default_schema: defaults.default_schema,
        }
    }

    /// Apply the `validation` section of the config.
    pub fn with_config(mut self, config: &ValidationConfig) -> Self {
        self.schema_policy = config.schema_policy;
        self.default_schema = config.default_schema.clone();
        self
    }

    pub fn allowlist(&self) -> &Arc<AllowlistConfig> {
        &self.allowlist
    }

    /// Validate `sql` for `mode`, stopping at the first failed check.
    pub fn validate(&self, sql: &str, mode: QueryMode) -> Result<ValidatedQuery, Rejection> {
        let mut statements = self.analyzer.parse(sql).map_err(|e| {
            Rejection::new(RejectionKind::InvalidSyntax, "Invalid SQL syntax").with_hint(e.to_string())
        })?;

        let statement = match statements.len() {
            0 => {
                return Err(Rejection::new(RejectionKind::InvalidSyntax, "Query is empty"));
            }
            1 => statements.remove(0),
            n => {
                return Err(Rejection::new(
                    RejectionKind::BatchNotAllowed,
                    format!("Only a single statement is allowed, found {n}"),
                ));
            }
        };

        let query = match &statement {
            Statement::Query(query) => query,
            other => {
                return Err(forbidden(&self.analyzer.statement_kind(other)));
            }
        };
        inspect(&statement, Inspection::ReadOnly)?;

        let tables = extract_tables(&statement, &self.schema_policy_for(mode)).map_err(|e| {
            let hint = match e {
                SqlError::UnqualifiedTable { .. } => "Fully qualify table names as schema.table",
                _ => RejectionKind::ExtractionFailed.default_hint(),
            };
            Rejection::new(RejectionKind::ExtractionFailed, e.to_string()).with_hint(hint)
        })?;

        match mode {
            QueryMode::Artifact => self.check_artifact_tables(&tables)?,
            QueryMode::Database => {
                self.check_allowlisted_tables(&tables)?;
                inspect(&statement, Inspection::Joins)?;
            }
        }

        if !has_limit(query) && !is_pure_aggregate(query) {
            return Err(Rejection::new(
                RejectionKind::LimitRequired,
                "Query must include a LIMIT clause",
            ));
        }

        tracing::debug!(mode = %mode, tables = tables.len(), "query accepted");
        Ok(ValidatedQuery { statement, tables })
    }

    /// Validate and collapse the outcome into a [`SafetyDecision`].
    pub fn decide(&self, sql: &str, mode: QueryMode) -> SafetyDecision {
        SafetyDecision::from(&self.validate(sql, mode))
    }

    fn schema_policy_for(&self, mode: QueryMode) -> SchemaPolicy {
        match (mode, self.schema_policy) {
            (QueryMode::Artifact, _) => SchemaPolicy::AllowBare,
            (QueryMode::Database, SchemaPolicyMode::Strict) => SchemaPolicy::Require,
            (QueryMode::Database, SchemaPolicyMode::Lenient) => {
                SchemaPolicy::Qualify(self.default_schema.clone())
            }
        }
    }

    fn check_artifact_tables(&self, tables: &BTreeSet<TableReference>) -> Result<(), Rejection> {
        match tables
            .iter()
            .find(|t| t.is_qualified() || t.name != ARTIFACT_TABLE)
        {
            Some(table) => Err(Rejection::new(
                RejectionKind::OutOfScopeTable,
                format!("Query must reference only the '{ARTIFACT_TABLE}' table, found '{table}'"),
            )),
            None => Ok(()),
        }
    }

    fn check_allowlisted_tables(&self, tables: &BTreeSet<TableReference>) -> Result<(), Rejection> {
        match tables.iter().find(|t| !self.allowlist.contains(t)) {
            Some(table) => {
                let allowed = self.allowlist.table_names();
                let hint = if allowed.is_empty() {
                    "No tables are allowlisted".to_string()
                } else {
                    format!("Allowed tables: {}", allowed.join(", "))
                };
                Err(Rejection::new(
                    RejectionKind::TableNotAllowed,
                    format!("Table '{table}' is not allowlisted"),
                )
                .with_hint(hint))
            }
            None => Ok(()),
        }
    }
}

fn forbidden(kind: &str) -> Rejection {
    Rejection::new(
        RejectionKind::ForbiddenStatementType,
        format!("Only SELECT queries are allowed, found {kind}"),
    )
}

fn forbidden_function(name: &str) -> Rejection {
    Rejection::new(
        RejectionKind::ForbiddenStatementType,
        format!("Function '{name}' is not allowed"),
    )
    .with_hint("Query allowlisted tables with plain SELECT expressions")
}

/// Lower-cased unqualified name of a function call.
fn function_name(name: &ObjectName) -> Option<String> {
    match name.0.last() {
        Some(ObjectNamePart::Identifier(ident)) => Some(ident.value.to_lowercase()),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn is_forbidden_function(name: &str) -> bool {
    FORBIDDEN_FUNCTIONS.contains(&name)
        || FORBIDDEN_FUNCTION_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

fn check_function(name: &ObjectName) -> ControlFlow<Rejection> {
    match function_name(name) {
        Some(function) if is_forbidden_function(&function) => {
            ControlFlow::Break(forbidden_function(&function))
        }
        _ => ControlFlow::Continue(()),
    }
}

fn has_limit(query: &Query) -> bool {
    let limited = match &query.limit_clause {
        Some(LimitClause::LimitOffset { limit, .. }) => limit.is_some(),
        Some(LimitClause::OffsetCommaLimit { .. }) => true,
        None => false,
    };
    limited || query.fetch.is_some()
}

/// A single ungrouped `SELECT` whose every projection is a recognized
/// aggregate call. Such a query returns exactly one row.
fn is_pure_aggregate(query: &Query) -> bool {
    let SetExpr::Select(select) = query.body.as_ref() else {
        return false;
    };
    let ungrouped = matches!(&select.group_by, GroupByExpr::Expressions(exprs, _) if exprs.is_empty());

    ungrouped
        && !select.projection.is_empty()
        && select.projection.iter().all(|item| match item {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                is_aggregate_call(expr)
            }
            _ => false,
        })
}

fn is_aggregate_call(expr: &Expr) -> bool {
    let Expr::Function(function) = expr else {
        return false;
    };
    if function.over.is_some() {
        return false;
    }
    function_name(&function.name)
        .is_some_and(|name| AGGREGATE_FUNCTIONS.contains(&name.as_str()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inspection {
    /// Reject writes hidden inside a query (`SELECT INTO`, data-modifying
    /// bodies) and calls to forbidden functions.
    ReadOnly,
    /// Reject joins without an `ON` condition, including comma joins.
    Joins,
}

fn inspect(statement: &Statement, inspection: Inspection) -> Result<(), Rejection> {
    match statement.visit(&mut ShapeInspector { inspection }) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(rejection) => Err(rejection),
    }
}

struct ShapeInspector {
    inspection: Inspection,
}

impl ShapeInspector {
    fn check_body(&self, body: &SetExpr) -> Result<(), Rejection> {
        match body {
            SetExpr::Select(select) => self.check_select(select),
            SetExpr::SetOperation { left, right, .. } => {
                self.check_body(left)?;
                self.check_body(right)
            }
            SetExpr::Query(_) | SetExpr::Values(_) | SetExpr::Table(_) => Ok(()),
            other => match self.inspection {
                Inspection::ReadOnly => Err(forbidden(&leading_keyword(&other.to_string()))),
                Inspection::Joins => Ok(()),
            },
        }
    }

    fn check_select(&self, select: &Select) -> Result<(), Rejection> {
        match self.inspection {
            Inspection::ReadOnly => {
                if select.into.is_some() {
                    return Err(forbidden("SELECT INTO"));
                }
                Ok(())
            }
            Inspection::Joins => {
                if select.from.len() > 1 {
                    return Err(Rejection::new(
                        RejectionKind::ImplicitJoinRejected,
                        "Implicit JOINs are not allowed",
                    )
                    .with_hint("Use explicit JOIN ... ON syntax"));
                }
                select.from.iter().try_for_each(check_joins)
            }
        }
    }
}

fn check_joins(table: &TableWithJoins) -> Result<(), Rejection> {
    for join in &table.joins {
        if !matches!(join_constraint(&join.join_operator), Some(JoinConstraint::On(_))) {
            return Err(Rejection::new(
                RejectionKind::ImplicitJoinRejected,
                format!("JOIN without ON clause: {join}"),
            ));
        }
    }
    Ok(())
}

fn join_constraint(operator: &JoinOperator) -> Option<&JoinConstraint> {
    match operator {
        JoinOperator::Join(c)
        | JoinOperator::Inner(c)
        | JoinOperator::Left(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::Right(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c)
        | JoinOperator::Semi(c)
        | JoinOperator::LeftSemi(c)
        | JoinOperator::RightSemi(c)
        | JoinOperator::Anti(c)
        | JoinOperator::LeftAnti(c)
        | JoinOperator::RightAnti(c) => Some(c),
        JoinOperator::AsOf { constraint, .. } => Some(constraint),
        _ => None,
    }
}

impl Visitor for ShapeInspector {
    type Break = Rejection;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        match self.check_body(&query.body) {
            Ok(()) => ControlFlow::Continue(()),
            Err(rejection) => ControlFlow::Break(rejection),
        }
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        match (self.inspection, expr) {
            (Inspection::ReadOnly, Expr::Function(function)) => check_function(&function.name),
            _ => ControlFlow::Continue(()),
        }
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        if self.inspection == Inspection::ReadOnly {
            return match factor {
                TableFactor::Table {
                    name, args: Some(_), ..
                } => check_function(name),
                TableFactor::Function { name, .. } => check_function(name),
                _ => ControlFlow::Continue(()),
            };
        }
        match factor {
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => match check_joins(table_with_joins) {
                Ok(()) => ControlFlow::Continue(()),
                Err(rejection) => ControlFlow::Break(rejection),
            },
            _ => ControlFlow::Continue(()),
        }
    }
}
