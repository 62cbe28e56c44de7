//! The generic revisioned store.
//!
//! Save, delete, and find primitives over any [`Persistable`] entity.
//! A save is one statement: a data-modifying CTE performs the guarded
//! upsert, and the audit insert selects from it, so the audit row
//! materializes exactly when the mutation lands and both commit or roll
//! back together.
//!
//! Every operation runs against a connection supplied by the caller —
//! the store has no connection-lifecycle responsibility.

use sqlx::PgConnection;
use sqlx::postgres::{PgArguments, PgRow, Postgres};
use uuid::Uuid;

use orghub_core::error::ErrorKind;
use orghub_core::traits::Persistable;
use orghub_core::types::actor::Actor;
use orghub_core::types::query::Constructed;
use orghub_core::types::revision::Revision;
use orghub_core::types::value::SqlValue;
use orghub_core::{AppError, AppResult};

use crate::audit;

/// PostgreSQL error code for unique-constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;
type PgQueryAs<'q, O> = sqlx::query::QueryAs<'q, Postgres, O, PgArguments>;

/// Save an entity, enforcing optimistic concurrency.
///
/// A new id inserts; an existing id updates only when the presented
/// revision matches the stored one. On success the entity receives a
/// fresh revision token; on a mismatch the row is untouched, no audit
/// row is written, and a [`ErrorKind::RevisionConflict`] error is
/// returned for the caller to re-fetch and retry.
pub async fn save<E: Persistable>(
    conn: &mut PgConnection,
    entity: &mut E,
    actor: &Actor,
) -> AppResult<()> {
    let values = entity.values();
    debug_assert_eq!(values.len(), E::COLUMNS.len());

    let new_revision = Revision::generate();
    let sql = build_save_sql(E::TABLE, E::COLUMNS, E::SENSITIVE);

    let mut query = sqlx::query(&sql)
        .bind(entity.revision().as_str().to_string())
        .bind(entity.id())
        .bind(new_revision.as_str().to_string());
    for value in values {
        query = bind(query, value);
    }
    query = bind(query, SqlValue::OptUuid(entity.organisation_id()));
    query = bind(query, SqlValue::Text(actor.audit_id()));

    let result = query
        .execute(&mut *conn)
        .await
        .map_err(|e| map_db_error(E::TABLE, e))?;

    if result.rows_affected() == 0 {
        return Err(AppError::revision_conflict(E::TABLE, entity.id()));
    }

    entity.set_revision(new_revision);
    Ok(())
}

/// Delete an entity, guarded by its revision, writing the audit record
/// in the same statement.
pub async fn delete<E: Persistable>(
    conn: &mut PgConnection,
    entity: &E,
    actor: &Actor,
) -> AppResult<()> {
    let sql = build_delete_sql(E::TABLE, E::SENSITIVE);

    let result = sqlx::query(&sql)
        .bind(entity.id())
        .bind(entity.revision().as_str().to_string())
        .bind(entity.organisation_id())
        .bind(actor.audit_id())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_db_error(E::TABLE, e))?;

    if result.rows_affected() == 0 {
        return Err(AppError::revision_conflict(E::TABLE, entity.id()));
    }
    Ok(())
}

/// Find a single entity by an arbitrary column over the standard column
/// list. `None` means no row matched; errors are reserved for failures.
pub async fn find_by_column<E>(
    conn: &mut PgConnection,
    column: &str,
    value: SqlValue,
) -> AppResult<Option<E>>
where
    E: Persistable + for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
{
    let columns = E::select_columns();
    if !columns.iter().any(|known| *known == column) {
        return Err(AppError::invalid_query(format!(
            "unknown column {column} for {}",
            E::TABLE
        )));
    }

    let sql = build_find_sql(E::TABLE, &columns, column);
    bind_as(sqlx::query_as::<Postgres, E>(&sql), value)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_db_error(E::TABLE, e))
}

/// Find a single entity by primary key.
pub async fn find_by_id<E>(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<E>>
where
    E: Persistable + for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
{
    find_by_column(conn, "id", SqlValue::Uuid(id)).await
}

/// Run a constructed statement pair: count first, then the paginated
/// select, binding the same values to both.
pub(crate) async fn fetch_page<E>(
    conn: &mut PgConnection,
    table: &str,
    built: &Constructed,
) -> AppResult<(Vec<E>, u64)>
where
    E: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
{
    let mut count_query = sqlx::query_as::<Postgres, (i64,)>(&built.count_sql);
    for value in &built.params {
        count_query = bind_as(count_query, value.clone());
    }
    let (total,) = count_query
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_db_error(table, e))?;

    let mut select_query = sqlx::query_as::<Postgres, E>(&built.select_sql);
    for value in &built.params {
        select_query = bind_as(select_query, value.clone());
    }
    let rows = select_query
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_db_error(table, e))?;

    Ok((rows, total.max(0) as u64))
}

/// Build the combined upsert + audit statement for one entity table.
///
/// Parameter layout: `$1` the presented revision, `$2` the id, `$3` the
/// fresh revision, `$4..` the column values in declaration order, then
/// the organisation id and the acting user.
///
/// The audit insert selects `FROM mutated`, so a conflicted save writes
/// nothing at all. Its old-row subselect sees the statement's snapshot:
/// the pre-mutation state, or no row at all for a creation.
pub fn build_save_sql(table: &str, columns: &[&str], sensitive: &[&str]) -> String {
    let column_list = columns.join(", ");
    let value_list = (0..columns.len())
        .map(|i| format!("${}", i + 4))
        .collect::<Vec<_>>()
        .join(", ");
    let org_param = format!("${}", columns.len() + 4);
    let actor_param = format!("${}", columns.len() + 5);
    let exclusions = audit::exclusion_sql(sensitive);

    format!(
        "WITH mutated AS ( \
         INSERT INTO {table} (updated_at, id, revision, {column_list}) \
         VALUES (now(), $2, $3, {value_list}) \
         ON CONFLICT (id) DO UPDATE SET (updated_at, revision, {column_list}) = (now(), $3, {value_list}) \
         WHERE {table}.revision = $1 \
         RETURNING id \
         ) \
         INSERT INTO audit_log (entity_id, organisation_id, table_name, user_id, action, old_row_data) \
         SELECT $2, {org_param}, '{table}', {actor_param}, 'U', \
         (SELECT to_jsonb({table}) - 'ts'{exclusions} FROM {table} WHERE {table}.id = $2) \
         FROM mutated"
    )
}

/// Build the revision-guarded delete + audit statement.
///
/// Parameter layout: `$1` the id, `$2` the presented revision, `$3` the
/// organisation id, `$4` the acting user.
pub fn build_delete_sql(table: &str, sensitive: &[&str]) -> String {
    let exclusions = audit::exclusion_sql(sensitive);

    format!(
        "WITH mutated AS ( \
         DELETE FROM {table} WHERE id = $1 AND revision = $2 RETURNING id \
         ) \
         INSERT INTO audit_log (entity_id, organisation_id, table_name, user_id, action, old_row_data) \
         SELECT $1, $3, '{table}', $4, 'D', \
         (SELECT to_jsonb({table}) - 'ts'{exclusions} FROM {table} WHERE {table}.id = $1) \
         FROM mutated"
    )
}

/// Build a single-row lookup by one column.
pub fn build_find_sql(table: &str, columns: &[&str], by_column: &str) -> String {
    format!(
        "SELECT {} FROM {table} WHERE {by_column} = $1",
        columns.join(", ")
    )
}

/// Bind one dynamic value onto a statement.
pub(crate) fn bind(query: PgQuery<'_>, value: SqlValue) -> PgQuery<'_> {
    match value {
        SqlValue::Uuid(v) => query.bind(v),
        SqlValue::OptUuid(v) => query.bind(v),
        SqlValue::Text(v) => query.bind(v),
        SqlValue::OptText(v) => query.bind(v),
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::Int(v) => query.bind(v),
        SqlValue::Float(v) => query.bind(v),
        SqlValue::Timestamp(v) => query.bind(v),
        SqlValue::OptTimestamp(v) => query.bind(v),
        SqlValue::TextArray(v) => query.bind(v),
        SqlValue::OptTextArray(v) => query.bind(v),
        SqlValue::UuidArray(v) => query.bind(v),
        SqlValue::Json(v) => query.bind(v),
    }
}

/// Bind one dynamic value onto a typed-row statement.
pub(crate) fn bind_as<O>(query: PgQueryAs<'_, O>, value: SqlValue) -> PgQueryAs<'_, O> {
    match value {
        SqlValue::Uuid(v) => query.bind(v),
        SqlValue::OptUuid(v) => query.bind(v),
        SqlValue::Text(v) => query.bind(v),
        SqlValue::OptText(v) => query.bind(v),
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::Int(v) => query.bind(v),
        SqlValue::Float(v) => query.bind(v),
        SqlValue::Timestamp(v) => query.bind(v),
        SqlValue::OptTimestamp(v) => query.bind(v),
        SqlValue::TextArray(v) => query.bind(v),
        SqlValue::OptTextArray(v) => query.bind(v),
        SqlValue::UuidArray(v) => query.bind(v),
        SqlValue::Json(v) => query.bind(v),
    }
}

/// Map a database error, surfacing unique violations as a distinct
/// duplicate condition so callers can present "already exists".
pub(crate) fn map_db_error(table: &str, err: sqlx::Error) -> AppError {
    let duplicate = match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Some(
                db_err
                    .constraint()
                    .unwrap_or("unique constraint")
                    .to_string(),
            )
        }
        _ => None,
    };
    match duplicate {
        Some(constraint) => AppError::with_source(
            ErrorKind::Duplicate,
            format!("{table}: duplicate value for {constraint}"),
            err,
        ),
        None => AppError::with_source(ErrorKind::Database, format!("{table}: query failed"), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [&str; 3] = ["name", "description", "organisation_id"];

    #[test]
    fn test_save_sql_guards_on_revision() {
        let sql = build_save_sql("things", &COLUMNS, &[]);
        assert!(sql.contains("ON CONFLICT (id) DO UPDATE"));
        assert!(sql.contains("WHERE things.revision = $1"));
        assert!(sql.contains("VALUES (now(), $2, $3, $4, $5, $6)"));
    }

    #[test]
    fn test_save_sql_audits_from_the_mutation() {
        let sql = build_save_sql("things", &COLUMNS, &[]);
        let audit_insert = sql
            .split_once("INSERT INTO audit_log")
            .expect("audit insert present")
            .1;
        assert!(audit_insert.contains("FROM mutated"));
        assert!(audit_insert.contains("SELECT $2, $7, 'things', $8, 'U'"));
    }

    #[test]
    fn test_save_sql_excludes_sensitive_columns() {
        let sql = build_save_sql("users", &["email", "password"], &["password", "totp_secret"]);
        assert!(sql.contains("to_jsonb(users) - 'ts' - 'password' - 'totp_secret'"));
    }

    #[test]
    fn test_delete_sql_guards_on_revision() {
        let sql = build_delete_sql("memberships", &[]);
        assert!(sql.contains("DELETE FROM memberships WHERE id = $1 AND revision = $2"));
        assert!(sql.contains("'D'"));
        assert!(sql.contains("FROM mutated"));
    }

    #[test]
    fn test_find_sql_selects_standard_columns() {
        let sql = build_find_sql("things", &["id", "revision", "name"], "name");
        assert_eq!(sql, "SELECT id, revision, name FROM things WHERE name = $1");
    }
}
