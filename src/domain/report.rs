//! Aggregate read models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Risk report for one service.
///
/// `debt_count` only holds types that occur at least once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub dependent_count: u64,
    pub debt_count: BTreeMap<String, u64>,
}

/// Open (pending or in-progress) debt per service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDebtCount {
    pub service_id: String,
    pub name: String,
    pub count: u64,
}
