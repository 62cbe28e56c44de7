//! Audit history read-back.
//!
//! Audit rows store only the pre-mutation snapshot. Reading history
//! reconstructs each row's "new" state from the next row's old snapshot
//! (a `lead` window), and — when no later row exists — from the current
//! live row. The diff is computed at read time from the two snapshots.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use sqlx::PgConnection;
use tracing::error;
use uuid::Uuid;

use orghub_core::types::criteria::Criteria;
use orghub_core::types::pagination::PageLinks;
use orghub_core::types::query::EntityQuery;
use orghub_core::types::value::{Params, SqlValue};
use orghub_core::{AppError, AppResult};
use orghub_entity::audit::model::{AuditAction, AuditRecord, DIFF_CREATED, DIFF_DELETED};

use crate::audit;
use crate::store;

/// Snapshot columns stripped before diffing: the revision churns on
/// every save and updated_at is server-assigned, so neither is signal.
const SNAPSHOT_STRIP: &str = " - 'revision' - 'updated_at'";

/// One page of audit history plus the criteria that produced it.
#[derive(Debug)]
pub struct Audits {
    /// The page rows, newest first.
    pub data: Vec<AuditRecord>,
    /// The criteria that produced this page.
    pub criteria: Criteria,
    /// Total rows matching the criteria across all pages.
    pub total: u64,
}

type AuditRow = (
    Uuid,
    Uuid,
    Option<Uuid>,
    String,
    DateTime<Utc>,
    String,
    Option<String>,
    String,
    Option<Value>,
    Option<Value>,
);

impl Audits {
    /// Fetch the page of audit history selected by `criteria`.
    ///
    /// Supported queries: all rows, by organisation, by entity. Filters
    /// do not apply to the audit log.
    pub async fn find_all(conn: &mut PgConnection, criteria: Criteria) -> AppResult<Self> {
        let mut params = Params::new();

        let predicate = match &criteria.query {
            EntityQuery::All => "true".to_string(),
            EntityQuery::ByOrganisation(id) => {
                let p = params.push(SqlValue::Uuid(*id));
                format!("audit_log.organisation_id = {p}")
            }
            EntityQuery::ByEntity(id) => {
                let p = params.push(SqlValue::Uuid(*id));
                format!("audit_log.entity_id = {p}")
            }
            other => {
                error!(model = "audit_log", query = other.name(), "unsupported query variant");
                return Err(AppError::invalid_query(format!(
                    "audits cannot execute {} queries",
                    other.name()
                )));
            }
        };

        let select_sql = format!(
            "SELECT audit_log.id, audit_log.entity_id, audit_log.organisation_id, \
             audit_log.table_name, audit_log.stamp, audit_log.user_id, users.email, \
             audit_log.action, \
             audit_log.old_row_data{SNAPSHOT_STRIP} AS old_row_data, \
             lead(audit_log.old_row_data{SNAPSHOT_STRIP}, 1) \
             OVER (PARTITION BY audit_log.entity_id ORDER BY audit_log.stamp) AS new_row_data \
             FROM audit_log LEFT JOIN users ON audit_log.user_id = users.id::text \
             WHERE {predicate} \
             ORDER BY audit_log.stamp DESC, audit_log.id ASC{}",
            criteria.pagination.sql_clause()
        );
        let count_sql = format!("SELECT COUNT(*) FROM audit_log WHERE {predicate}");
        let bound = params.into_values();

        let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
        for value in &bound {
            count_query = store::bind_as(count_query, value.clone());
        }
        let (total,) = count_query
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| store::map_db_error("audit_log", e))?;

        let mut select_query = sqlx::query_as::<_, AuditRow>(&select_sql);
        for value in &bound {
            select_query = store::bind_as(select_query, value.clone());
        }
        let rows = select_query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| store::map_db_error("audit_log", e))?;

        let mut data = Vec::with_capacity(rows.len());
        for row in rows {
            let (
                id,
                entity_id,
                organisation_id,
                table_name,
                stamp,
                user_id,
                user_email,
                action,
                old,
                mut new,
            ) = row;

            let is_delete = AuditAction::from_code(&action) == Some(AuditAction::Delete);

            // The newest entry for a live entity has no later audit row:
            // its "new" state is the row as it stands now.
            if new.is_none() && !is_delete {
                new = fetch_live_row(conn, &table_name, entity_id).await?;
            }

            let created = old.is_none();
            let old_row_data = old.unwrap_or_else(|| json!({}));
            let new_row_data = new.unwrap_or_else(|| json!({}));

            let diff = if is_delete {
                DIFF_DELETED.to_string()
            } else if created {
                DIFF_CREATED.to_string()
            } else {
                audit::field_diff(&old_row_data, &new_row_data)
            };

            let user_name = user_email.unwrap_or_else(|| user_id.clone());
            data.push(AuditRecord {
                id,
                entity_id,
                organisation_id,
                table_name,
                stamp,
                user_id,
                user_name,
                action,
                old_row_data,
                new_row_data,
                diff,
            });
        }

        Ok(Self {
            data,
            criteria,
            total: total.max(0) as u64,
        })
    }

    /// Page-link descriptors for the window this page covers.
    pub fn links(&self) -> PageLinks {
        self.criteria.pagination.links(self.total)
    }
}

/// Fetch the present state of an audited row, with the same exclusions
/// its audit snapshots carry. `None` when the row no longer exists.
async fn fetch_live_row(
    conn: &mut PgConnection,
    table: &str,
    entity_id: Uuid,
) -> AppResult<Option<Value>> {
    let Some(sensitive) = audit::sensitive_columns(table) else {
        return Err(AppError::internal(format!(
            "audit_log references unaudited table {table}"
        )));
    };

    let sql = format!(
        "SELECT to_jsonb({table}) - 'ts'{SNAPSHOT_STRIP}{} FROM {table} WHERE id = $1",
        audit::exclusion_sql(sensitive)
    );
    let row: Option<Option<Value>> = sqlx::query_scalar(&sql)
        .bind(entity_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| store::map_db_error(table, e))?;
    Ok(row.flatten())
}
