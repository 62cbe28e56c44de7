//! The closed set of query variants and the statement builder.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::result::AppResult;

use super::filter::FilterSet;
use super::pagination::PageRequest;
use super::sorting::SortField;
use super::value::{Params, SqlValue};

/// The predicate a collection query selects rows by.
///
/// A closed enum: every collection matches the variants it supports and
/// rejects the rest with a distinguished invalid-query error, so adding
/// a variant surfaces every unhandled call site at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityQuery {
    /// Every row.
    All,
    /// Rows scoped to one organisation.
    ByOrganisation(Uuid),
    /// Rows matching any of a set of ids.
    ByIds(Vec<Uuid>),
    /// Rows belonging to one user.
    ByUser(Uuid),
    /// Audit rows for one entity.
    ByEntity(Uuid),
    /// Organisations that have the given user as a member.
    ContainingUser(Uuid),
    /// Rows whose search vector matches a free-text phrase, scoped to
    /// one organisation.
    ByPhrase {
        /// Tenant scope.
        organisation_id: Uuid,
        /// Free-text phrase.
        phrase: String,
    },
}

impl EntityQuery {
    /// Short variant name for error messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::ByOrganisation(_) => "by-organisation",
            Self::ByIds(_) => "by-ids",
            Self::ByUser(_) => "by-user",
            Self::ByEntity(_) => "by-entity",
            Self::ContainingUser(_) => "containing-user",
            Self::ByPhrase { .. } => "by-phrase",
        }
    }

    /// Assemble the full select and count statements for this query over
    /// `table`, with filters, a deterministic sort (the caller's column
    /// plus an `id` tiebreak), and a pagination window.
    ///
    /// Variants that require a collection-specific join
    /// ([`EntityQuery::ContainingUser`]) are rejected here; the owning
    /// collection builds those statements itself.
    pub fn construct(
        &self,
        columns: &[&str],
        table: &str,
        filters: &FilterSet,
        pagination: &PageRequest,
        sort: &SortField,
    ) -> AppResult<Constructed> {
        let mut params = Params::new();

        let (from_sql, predicate) = match self {
            Self::All => (table.to_string(), "true".to_string()),
            Self::ByOrganisation(id) => {
                let p = params.push(SqlValue::Uuid(*id));
                (table.to_string(), format!("organisation_id = {p}"))
            }
            Self::ByIds(ids) => {
                let p = params.push(SqlValue::UuidArray(ids.clone()));
                (table.to_string(), format!("id = ANY({p})"))
            }
            Self::ByUser(id) => {
                let p = params.push(SqlValue::Uuid(*id));
                (table.to_string(), format!("user_id = {p}"))
            }
            Self::ByEntity(id) => {
                let p = params.push(SqlValue::Uuid(*id));
                (table.to_string(), format!("entity_id = {p}"))
            }
            Self::ByPhrase {
                organisation_id,
                phrase,
            } => {
                let p_org = params.push(SqlValue::Uuid(*organisation_id));
                let p_phrase = params.push(SqlValue::Text(phrase.clone()));
                (
                    format!("{table}, plainto_tsquery('english', {p_phrase}) query"),
                    format!("organisation_id = {p_org} AND query @@ ts"),
                )
            }
            Self::ContainingUser(_) => {
                return Err(AppError::invalid_query(format!(
                    "{} cannot be constructed generically for {table}",
                    self.name()
                )));
            }
        };

        let where_clause = match filters.clause(&mut params) {
            Some(clause) => format!("{predicate} AND {clause}"),
            None => predicate,
        };

        let column_list = columns.join(", ");
        let select_sql = format!(
            "SELECT {column_list} FROM {from_sql} WHERE {where_clause} ORDER BY {} {}, id ASC{}",
            sort.field,
            sort.direction.as_sql(),
            pagination.sql_clause(),
        );
        let count_sql = format!("SELECT COUNT(*) FROM {from_sql} WHERE {where_clause}");

        Ok(Constructed {
            select_sql,
            count_sql,
            params: params.into_values(),
        })
    }
}

/// A fully assembled statement pair plus its bind values.
///
/// The same values bind both statements: the count statement is the
/// select statement minus the sort and pagination tail, which carry no
/// parameters.
#[derive(Debug, Clone)]
pub struct Constructed {
    /// The paginated select statement.
    pub select_sql: String,
    /// The matching unpaginated count statement.
    pub count_sql: String,
    /// Bind values in placeholder order.
    pub params: Vec<SqlValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::filter::{FilterRegistry, FilterSet, standard_filters};
    use crate::types::criteria::RequestQuery;

    const COLS: [&str; 5] = ["id", "revision", "created_at", "updated_at", "name"];

    #[test]
    fn test_all_query_shape() {
        let built = EntityQuery::All
            .construct(
                &COLS,
                "things",
                &FilterSet::default(),
                &PageRequest::default(),
                &SortField::asc("name"),
            )
            .expect("construct");
        assert_eq!(
            built.select_sql,
            "SELECT id, revision, created_at, updated_at, name FROM things \
             WHERE true ORDER BY name ASC, id ASC LIMIT 25 OFFSET 0"
        );
        assert_eq!(built.count_sql, "SELECT COUNT(*) FROM things WHERE true");
        assert!(built.params.is_empty());
    }

    #[test]
    fn test_by_organisation_binds_tenant() {
        let org = Uuid::new_v4();
        let built = EntityQuery::ByOrganisation(org)
            .construct(
                &COLS,
                "things",
                &FilterSet::default(),
                &PageRequest::default(),
                &SortField::asc("name"),
            )
            .expect("construct");
        assert!(built.select_sql.contains("WHERE organisation_id = $1"));
        assert_eq!(built.params, vec![SqlValue::Uuid(org)]);
    }

    #[test]
    fn test_by_ids_uses_any() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let built = EntityQuery::ByIds(ids.clone())
            .construct(
                &COLS,
                "things",
                &FilterSet::default(),
                &PageRequest::default(),
                &SortField::asc("name"),
            )
            .expect("construct");
        assert!(built.select_sql.contains("WHERE id = ANY($1)"));
        assert_eq!(built.params, vec![SqlValue::UuidArray(ids)]);
    }

    #[test]
    fn test_by_phrase_cross_joins_tsquery() {
        let org = Uuid::new_v4();
        let built = EntityQuery::ByPhrase {
            organisation_id: org,
            phrase: "widget".to_string(),
        }
        .construct(
            &COLS,
            "things",
            &FilterSet::default(),
            &PageRequest::default(),
            &SortField::asc("name"),
        )
        .expect("construct");
        assert!(
            built
                .select_sql
                .contains("FROM things, plainto_tsquery('english', $2) query")
        );
        assert!(
            built
                .select_sql
                .contains("WHERE organisation_id = $1 AND query @@ ts")
        );
        assert_eq!(
            built.params,
            vec![
                SqlValue::Uuid(org),
                SqlValue::Text("widget".to_string())
            ]
        );
    }

    #[test]
    fn test_filters_follow_query_params() {
        let org = Uuid::new_v4();
        let registry = FilterRegistry::from_filters(standard_filters("things"));
        let req = RequestQuery::from_pairs([("custom-filter", "updated-within-fortnight")]);
        let filters = FilterSet::from_request(&req, &registry);
        let built = EntityQuery::ByOrganisation(org)
            .construct(
                &COLS,
                "things",
                &filters,
                &PageRequest::default(),
                &SortField::asc("name"),
            )
            .expect("construct");
        assert!(
            built
                .select_sql
                .contains("WHERE organisation_id = $1 AND age(things.updated_at) < $2::interval")
        );
        assert_eq!(built.params.len(), 2);
    }

    #[test]
    fn test_containing_user_is_not_generic() {
        let err = EntityQuery::ContainingUser(Uuid::new_v4())
            .construct(
                &COLS,
                "things",
                &FilterSet::default(),
                &PageRequest::default(),
                &SortField::asc("name"),
            )
            .expect_err("must reject");
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidQuery);
    }

    #[test]
    fn test_pagination_windows_never_overlap() {
        let page_one = EntityQuery::All
            .construct(
                &COLS,
                "things",
                &FilterSet::default(),
                &PageRequest::new(1, 10),
                &SortField::asc("name"),
            )
            .expect("construct");
        let page_two = EntityQuery::All
            .construct(
                &COLS,
                "things",
                &FilterSet::default(),
                &PageRequest::new(2, 10),
                &SortField::asc("name"),
            )
            .expect("construct");
        assert!(page_one.select_sql.ends_with("LIMIT 10 OFFSET 0"));
        assert!(page_two.select_sql.ends_with("LIMIT 10 OFFSET 10"));
    }
}
