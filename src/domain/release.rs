//! Release: a dated, versioned deployment of one service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: String,
    pub service_id: String,
    pub release_date: DateTime<Utc>,
    pub url: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRelease {
    pub release_date: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
    pub version: String,
}
