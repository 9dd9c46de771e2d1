//! # Repositories
//!
//! One repository per aggregate. Each public method runs exactly one
//! transaction through [`GraphStore`](crate::store::GraphStore); existence
//! checks always share the transaction of the read or write they guard.
//!
//! ## Graph layout
//!
//! ```text
//! (:Team)-[:OWNS]->(:Service)-[:DEPENDS_ON {version?}]->(:Service)
//!                  (:Service)-[:OWNS]->(:Debt)
//!                  (:Service)-[:RELEASED]->(:Release)
//! ```
//!
//! Every node carries a generated string `id` property; repositories address
//! nodes by it, never by backend `NodeId`.

pub mod service;
pub mod team;
pub mod dependency;
pub mod ownership;
pub mod debt;
pub mod release;
pub mod report;

pub use service::ServiceRepository;
pub use team::TeamRepository;
pub use dependency::DependencyGraphRepository;
pub use ownership::OwnershipRepository;
pub use debt::DebtRepository;
pub use release::ReleaseRepository;
pub use report::ReportAggregator;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{Node, Value};
use crate::storage::StorageBackend;
use crate::store::StoreTx;
use crate::{Error, Result};

pub(crate) mod labels {
    pub const SERVICE: &str = "Service";
    pub const TEAM: &str = "Team";
    pub const DEBT: &str = "Debt";
    pub const RELEASE: &str = "Release";
}

pub(crate) mod edges {
    pub const DEPENDS_ON: &str = "DEPENDS_ON";
    pub const OWNS: &str = "OWNS";
    pub const RELEASED: &str = "RELEASED";
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn not_found(label: &str, ids: &[&str]) -> Error {
    Error::NotFound(format!("{} {}", label.to_lowercase(), ids.join(", ")))
}

/// Node with `label` and `id`, or NotFound.
pub(crate) async fn require_node<B: StorageBackend>(
    tx: &StoreTx<B>,
    label: &str,
    id: &str,
) -> Result<Node> {
    tx.find_node(label, "id", id)
        .await?
        .ok_or_else(|| not_found(label, &[id]))
}

// ============================================================================
// Property decoding
// ============================================================================

fn type_error(key: &str, expected: &str, got: Option<&Value>) -> Error {
    Error::TypeError {
        expected: format!("{expected} property '{key}'"),
        got: got.map_or("missing", Value::type_name).to_owned(),
    }
}

pub(crate) fn string_prop(node: &Node, key: &str) -> Result<String> {
    match node.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(type_error(key, "STRING", other)),
    }
}

pub(crate) fn opt_string_prop(node: &Node, key: &str) -> Result<Option<String>> {
    match node.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        other => Err(type_error(key, "STRING", other)),
    }
}

pub(crate) fn datetime_prop(node: &Node, key: &str) -> Result<DateTime<Utc>> {
    match node.get(key) {
        Some(Value::DateTime(dt)) => Ok(*dt),
        other => Err(type_error(key, "DATETIME", other)),
    }
}
