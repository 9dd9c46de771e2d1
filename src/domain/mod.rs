//! # Domain value objects
//!
//! Typed entities that cross the repository boundary. The boundary
//! JSON-encodes them as-is, hence the serde renames.

pub mod service;
pub mod team;
pub mod debt;
pub mod release;
pub mod dependency;
pub mod report;

pub use service::{Service, NewService, ServiceUpdate};
pub use team::{Team, NewTeam, TeamUpdate};
pub use debt::{Debt, NewDebt, DebtType, DebtStatus};
pub use release::{Release, NewRelease};
pub use dependency::{Dependency, DependencyTarget};
pub use report::{RiskReport, ServiceDebtCount};
