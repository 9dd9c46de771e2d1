//! Store configuration.
//!
//! ```toml
//! transaction_timeout_ms = 5000
//! log_filter = "servicegraph=debug"
//!
//! [backend]
//! kind = "memory"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::BackendConfig;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    /// Upper bound for a single unit of work, applied on top of the
    /// caller's deadline. `None` leaves it to the caller.
    pub transaction_timeout_ms: Option<u64>,
    /// `tracing-subscriber` filter directive that
    /// [`ServiceGraph::open`](crate::ServiceGraph::open) hands to
    /// [`init_tracing`](crate::logging::init_tracing).
    pub log_filter: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Memory,
            transaction_timeout_ms: None,
            log_filter: "info".to_owned(),
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    pub fn transaction_timeout(&self) -> Option<Duration> {
        self.transaction_timeout_ms.map(Duration::from_millis)
    }
}
