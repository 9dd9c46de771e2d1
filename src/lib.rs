//! # servicegraph: Service Dependency & Risk Graph
//!
//! A property graph of services, their dependency and ownership edges, and
//! the technical-debt items and releases hanging off them, plus aggregate
//! risk queries over it.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StorageBackend` is the contract between repositories and storage
//! 2. **One transaction per operation**: existence checks share the transaction they guard
//! 3. **Typed failures**: `Error::NotFound` vs infrastructure errors, never string matching
//! 4. **One store handle**: built once, injected by value into every repository
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use servicegraph::{Context, ServiceGraph};
//! use servicegraph::domain::{DebtType, DependencyTarget, NewDebt, NewService};
//!
//! # async fn example() -> servicegraph::Result<()> {
//! let graph = ServiceGraph::open_memory()?;
//! let ctx = Context::background();
//!
//! let api = graph.services.create_service(&ctx, NewService::new("api", "http")).await?;
//! let db = graph.services.create_service(&ctx, NewService::new("db", "storage")).await?;
//! graph.dependencies.add_dependency(&ctx, &api.id, DependencyTarget::new(&db.id)).await?;
//! graph.debts.create_debt_item(&ctx, &db.id, NewDebt::new(DebtType::Security, "TLS 1.0")).await?;
//!
//! let report = graph.reports.get_service_risk_report(&ctx, &db.id).await?;
//! assert_eq!(report.dependent_count, 1);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod domain;
pub mod storage;
pub mod tx;
pub mod store;
pub mod repository;
pub mod context;
pub mod config;
pub mod logging;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    Node, Relationship, Value, PropertyMap,
    NodeId, RelId, Direction,
};

pub use storage::{StorageBackend, BackendConfig, MemoryBackend};

pub use tx::{Transaction, TxMode, TxId};

pub use store::{GraphStore, StoreTx, SessionInfo};

pub use repository::{
    ServiceRepository, TeamRepository, DependencyGraphRepository,
    OwnershipRepository, DebtRepository, ReleaseRepository, ReportAggregator,
};

pub use context::Context;
pub use config::StoreConfig;

// ============================================================================
// Top-level handle
// ============================================================================

/// Every repository, wired to one shared [`GraphStore`].
pub struct ServiceGraph<B: StorageBackend> {
    store: GraphStore<B>,
    pub services: ServiceRepository<B>,
    pub teams: TeamRepository<B>,
    pub releases: ReleaseRepository<B>,
    pub dependencies: DependencyGraphRepository<B>,
    pub ownership: OwnershipRepository<B>,
    pub debts: DebtRepository<B>,
    pub reports: ReportAggregator<B>,
}

impl<B: StorageBackend> ServiceGraph<B> {
    pub fn new(store: GraphStore<B>) -> Self {
        let dependencies = DependencyGraphRepository::new(store.clone());
        let debts = DebtRepository::new(store.clone());
        Self {
            services: ServiceRepository::new(store.clone()),
            teams: TeamRepository::new(store.clone()),
            releases: ReleaseRepository::new(store.clone()),
            ownership: OwnershipRepository::new(store.clone()),
            reports: ReportAggregator::new(store.clone(), dependencies.clone(), debts.clone()),
            dependencies,
            debts,
            store,
        }
    }

    pub fn store(&self) -> &GraphStore<B> {
        &self.store
    }
}

impl ServiceGraph<MemoryBackend> {
    /// In-memory graph for testing and embedding.
    pub fn open_memory() -> Result<Self> {
        Self::open(StoreConfig::default())
    }

    /// Open the configured backend and install tracing with
    /// `config.log_filter`.
    pub fn open(config: StoreConfig) -> Result<Self> {
        logging::init_tracing(&config.log_filter)?;
        Ok(Self::new(GraphStore::open(config)?))
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Transaction error: {0}")]
    TxError(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Status code the boundary reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::Validation(_) => 400,
            Error::Cancelled => 499,
            Error::DeadlineExceeded => 504,
            Error::TypeError { .. }
            | Error::StorageError(_)
            | Error::TxError(_)
            | Error::ConstraintViolation(_)
            | Error::Config(_)
            | Error::Io(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Structured error handed to the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusError {
    pub code: u16,
    pub message: String,
}

impl From<&Error> for StatusError {
    fn from(err: &Error) -> Self {
        Self { code: err.status_code(), message: err.to_string() }
    }
}

impl From<Error> for StatusError {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
