//! Collection repositories for all OrgHub entities.

pub mod audit;
pub mod communication;
pub mod membership;
pub mod organisation;
pub mod thing;
pub mod user;

pub use audit::Audits;
pub use communication::Communications;
pub use membership::Memberships;
pub use organisation::Organisations;
pub use thing::Things;
pub use user::Users;
