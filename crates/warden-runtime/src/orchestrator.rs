use crate::adapter::ReadOnlyDatabase;
use crate::error::RuntimeError;
use crate::result::{
    ArtifactOutcome, ColumnDescription, DeliverySlip, QueryRows, SLIP_NOTE, TableDescription,
};
use std::sync::Arc;
use std::time::Instant;
use warden_artifact::{ArtifactEngine, ArtifactError, ArtifactStore};
use warden_audit::AuditLogger;
use warden_core::{
    AllowlistConfig, ColumnSet, QueryMode, Rejection, RejectionKind, WardenConfig,
};
use warden_policy::{ColumnFilter, RowLimitGovernor, identify};
use warden_sql::SqlValidator;

/// Outer `Result` is infrastructure, inner is the policy verdict.
pub type Outcome<T> = Result<Result<T, Rejection>, RuntimeError>;

/// Composes validation, execution, governance and filtering into the
/// `analyze_artifact` and `read_query` request handlers.
pub struct Orchestrator {
    allowlist: Arc<AllowlistConfig>,
    validator: SqlValidator,
    governor: RowLimitGovernor,
    audit: Arc<AuditLogger>,
    artifacts: ArtifactStore,
    engine: ArtifactEngine,
    database: Arc<dyn ReadOnlyDatabase>,
}

impl Orchestrator {
    pub fn new(
        config: &WardenConfig,
        allowlist: Arc<AllowlistConfig>,
        audit: Arc<AuditLogger>,
        database: Arc<dyn ReadOnlyDatabase>,
    ) -> Self {
        Self {
            validator: SqlValidator::new(allowlist.clone()).with_config(&config.validation),
            allowlist,
            governor: RowLimitGovernor::new(&config.governor),
            audit,
            artifacts: ArtifactStore::new(config.artifacts_dir()),
            engine: ArtifactEngine::new(),
            database,
        }
    }

    pub fn validator(&self) -> &SqlValidator {
        &self.validator
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Run `sql` against the uploaded artifact `file_id`.
    pub async fn analyze_artifact(
        &self,
        file_id: &str,
        sql: &str,
        justification: &str,
    ) -> Outcome<ArtifactOutcome> {
        self.audit
            .log_analyze_artifact(file_id, sql, justification)
            .await?;

        let file = match self.artifacts.resolve(file_id) {
            Ok(file) => file,
            Err(ArtifactError::NotFound { .. } | ArtifactError::InvalidFileId { .. }) => {
                return Ok(Err(rejected(Rejection::new(
                    RejectionKind::ArtifactNotFound,
                    format!("Artifact not found: {}", file_id),
                ))));
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(rejection) = self.validator.validate(sql, QueryMode::Artifact) {
            return Ok(Err(rejected(rejection)));
        }

        if file.format().is_err() {
            return Ok(Err(rejected(Rejection::new(
                RejectionKind::UnsupportedFileFormat,
                format!("Unsupported file format: {}", file_id),
            ))));
        }

        let start = Instant::now();
        let query = self.engine.query(&file, sql).await?;
        tracing::debug!(
            file_id,
            rows = query.result.rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "artifact query finished"
        );

        let Some(matched) = identify(&query.headers, &self.allowlist) else {
            return Ok(Err(rejected(Rejection::new(
                RejectionKind::SchemaIdentificationFailed,
                format!(
                    "Could not identify an allowlisted table for artifact {}",
                    file_id
                ),
            ))));
        };
        let Some(policy) = self.allowlist.lookup(&matched.table) else {
            return Ok(Err(rejected(Rejection::new(
                RejectionKind::InternalAllowlistLookupFailure,
                format!("No allowlist entry for {}", matched.table),
            ))));
        };
        let filter = ColumnFilter::new(ColumnSet::from(policy));

        let rows = query.result.rows;
        let Some(sample) = rows.first() else {
            return Ok(Ok(ArtifactOutcome::Rows(QueryRows::empty())));
        };

        let limit = self.governor.row_limit(sample);
        if !limit.permits(rows.len()) {
            let columns: Vec<String> = query
                .result
                .columns
                .into_iter()
                .filter(|column| filter.permits(column))
                .collect();
            let total = rows.len();
            let file_id = self
                .artifacts
                .write_slip(&columns, &filter.filter_rows(rows))?;

            tracing::info!(
                file_id = %file_id,
                rows = total,
                allowed_rows = limit.allowed_rows,
                "artifact result overflowed; returning delivery slip"
            );
            return Ok(Ok(ArtifactOutcome::Slip {
                delivery_slip: DeliverySlip {
                    file_id,
                    rows: total,
                    allowed_rows: limit.allowed_rows,
                    note: SLIP_NOTE.to_string(),
                },
            }));
        }

        let result = QueryRows::new(filter.filter_rows(rows));
        tracing::info!(table = %matched.table, rows = result.rows, "artifact query served");
        Ok(Ok(ArtifactOutcome::Rows(result)))
    }

    /// Run `sql` against the live database.
    pub async fn read_query(&self, sql: &str, justification: &str) -> Outcome<QueryRows> {
        self.audit.log_read_query(sql, justification).await?;

        let validated = match self.validator.validate(sql, QueryMode::Database) {
            Ok(validated) => validated,
            Err(rejection) => return Ok(Err(rejected(rejection))),
        };

        if let Some(missing) = validated
            .tables
            .iter()
            .find(|table| !self.allowlist.contains(table))
        {
            return Ok(Err(rejected(Rejection::new(
                RejectionKind::InternalAllowlistLookupFailure,
                format!("No allowlist entry for {}", missing),
            ))));
        }
        let Some(columns) = self.allowlist.merge_allowlists(&validated.tables) else {
            return Ok(Err(rejected(Rejection::new(
                RejectionKind::PolicyMissing,
                "No allowlist policy found for the referenced tables",
            ))));
        };

        let start = Instant::now();
        let rows = self
            .database
            .fetch(sql)
            .await
            .map_err(RuntimeError::Database)?;
        tracing::debug!(
            rows = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "database query finished"
        );

        let Some(sample) = rows.first() else {
            return Ok(Ok(QueryRows::empty()));
        };

        let limit = self.governor.row_limit(sample);
        if !limit.permits(rows.len()) {
            return Ok(Err(rejected(
                Rejection::new(
                    RejectionKind::ResultTooLarge,
                    format!(
                        "Result has {} rows but only {} fit the token budget",
                        rows.len(),
                        limit.allowed_rows
                    ),
                )
                .with_hint(format!(
                    "Add a tighter LIMIT (at most {}) or select fewer columns",
                    limit.allowed_rows
                )),
            )));
        }

        let result = QueryRows::new(ColumnFilter::new(columns).filter_rows(rows));
        tracing::info!(rows = result.rows, "database query served");
        Ok(Ok(result))
    }

    /// Allowlisted columns that also exist in the live database.
    pub async fn describe_schema(&self) -> Result<Vec<TableDescription>, RuntimeError> {
        describe(&self.allowlist, self.database.as_ref()).await
    }
}

/// Build the safe schema view: for each allowlisted table, the columns that
/// are both allowlisted and present in `database`.
pub async fn describe(
    allowlist: &AllowlistConfig,
    database: &dyn ReadOnlyDatabase,
) -> Result<Vec<TableDescription>, RuntimeError> {
    let mut tables = Vec::new();

    for (table, policy) in allowlist.tables() {
        let live = database
            .columns(&table)
            .await
            .map_err(RuntimeError::Database)?;

        let columns: Vec<ColumnDescription> = policy
            .iter()
            .filter_map(|(name, column)| {
                let info = live.iter().find(|c| c.name.eq_ignore_ascii_case(name))?;
                Some(ColumnDescription {
                    name: name.clone(),
                    data_type: info.data_type.clone(),
                    description: column.description.clone(),
                })
            })
            .collect();

        if columns.is_empty() {
            tracing::debug!(table = %table, "no allowlisted columns present in database");
            continue;
        }
        tables.push(TableDescription {
            table: table.to_string(),
            columns,
        });
    }

    Ok(tables)
}

fn rejected(rejection: Rejection) -> Rejection {
    tracing::warn!(kind = %rejection.kind, message = %rejection.message, "request rejected");
    rejection
}
