//! Database entities module

pub mod metric;
pub mod project;
pub mod user;

pub use metric::Entity as Metric;
pub use project::Entity as Project;
pub use user::Entity as User;
