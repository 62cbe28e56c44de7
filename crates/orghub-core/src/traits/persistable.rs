//! The contract every revisioned entity implements.

use uuid::Uuid;

use crate::types::revision::Revision;
use crate::types::value::SqlValue;

/// Columns shared by every revisioned entity table, in hydration order.
pub const STANDARD_COLUMNS: [&str; 4] = ["id", "revision", "created_at", "updated_at"];

/// Declares how an entity maps onto its table: the column list, the
/// sensitive columns excluded from audit snapshots, and accessors for
/// the fields the revisioned store manages.
///
/// `values()` must yield bound values in exactly `COLUMNS` order; the
/// store zips the two when building statements.
pub trait Persistable {
    /// The entity's table name.
    const TABLE: &'static str;

    /// Entity-specific columns, excluding the standard
    /// id/revision/created_at/updated_at set.
    const COLUMNS: &'static [&'static str];

    /// Columns stripped from audit snapshots (passwords, secrets,
    /// recovery codes).
    const SENSITIVE: &'static [&'static str] = &[];

    /// Stable identifier, assigned at creation.
    fn id(&self) -> Uuid;

    /// The revision token the caller currently holds.
    fn revision(&self) -> &Revision;

    /// Store the fresh revision issued by a successful save.
    fn set_revision(&mut self, revision: Revision);

    /// Tenant scope, absent for tenant-less entities.
    fn organisation_id(&self) -> Option<Uuid>;

    /// Bound values for `COLUMNS`, in column order.
    fn values(&self) -> Vec<SqlValue>;

    /// The full select column list: standard columns then entity columns.
    fn select_columns() -> Vec<&'static str> {
        STANDARD_COLUMNS.into_iter().chain(Self::COLUMNS.iter().copied()).collect()
    }
}
