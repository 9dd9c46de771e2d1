//! # GraphStore
//!
//! Runs units of work inside read or write transactions against a
//! [`StorageBackend`].
//!
//! ```rust,no_run
//! use servicegraph::{Context, GraphStore, MemoryBackend, Value};
//! use servicegraph::model::property_map::props;
//!
//! # async fn example() -> servicegraph::Result<()> {
//! let store = GraphStore::with_backend(MemoryBackend::new());
//! let ctx = Context::background();
//!
//! store
//!     .execute_write(&ctx, |tx| Box::pin(async move {
//!         tx.create_node(&["Service"], props([("name", Value::from("billing"))])).await?;
//!         Ok(())
//!     }))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Guarantees:
//! - exactly one session per call, closed on every exit path;
//! - a failing, cancelled or panicking write commits nothing;
//! - domain "not found" errors raised inside `work` come back unchanged,
//!   so callers can match on [`Error::NotFound`](crate::Error::NotFound).

pub mod session;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::context::Context;
use crate::model::*;
use crate::storage::{BackendConfig, MemoryBackend, StorageBackend};
use crate::tx::{Transaction, TxMode};
use crate::{Error, Result};

pub use session::{Session, SessionInfo};
use session::SessionRegistry;

/// Future returned by a unit of work.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// GraphStore
// ============================================================================

/// Shared store handle. Construct once, clone into every repository.
pub struct GraphStore<B: StorageBackend> {
    inner: Arc<StoreInner<B>>,
}

struct StoreInner<B: StorageBackend> {
    backend: B,
    config: StoreConfig,
    sessions: Arc<SessionRegistry>,
}

impl<B: StorageBackend> Clone for GraphStore<B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B: StorageBackend> GraphStore<B> {
    pub fn new(backend: B, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend,
                config,
                sessions: Arc::new(SessionRegistry::default()),
            }),
        }
    }

    /// Store with default configuration.
    pub fn with_backend(backend: B) -> Self {
        Self::new(backend, StoreConfig::default())
    }

    /// Access the underlying backend (for advanced use).
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Sessions currently open.
    pub fn open_sessions(&self) -> Vec<SessionInfo> {
        self.inner.sessions.snapshot()
    }

    /// Sessions opened over the lifetime of this store.
    pub fn sessions_opened(&self) -> u64 {
        self.inner.sessions.total_opened()
    }

    /// Run `work` inside a read-only transaction.
    pub async fn execute_read<T, F>(&self, ctx: &Context, work: F) -> Result<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut StoreTx<B>) -> BoxFuture<'t, Result<T>> + Send,
    {
        self.execute(ctx, TxMode::ReadOnly, work).await
    }

    /// Run `work` inside a write transaction. Commits only if `work`
    /// returns `Ok`; otherwise every mutation it made is discarded.
    pub async fn execute_write<T, F>(&self, ctx: &Context, work: F) -> Result<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut StoreTx<B>) -> BoxFuture<'t, Result<T>> + Send,
    {
        self.execute(ctx, TxMode::ReadWrite, work).await
    }

    async fn execute<T, F>(&self, ctx: &Context, mode: TxMode, work: F) -> Result<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut StoreTx<B>) -> BoxFuture<'t, Result<T>> + Send,
    {
        ctx.check()?;
        let session = self.inner.sessions.open(mode, ctx.correlation_id());
        let backend = &self.inner.backend;

        let tx = ctx.run(backend.begin_tx(mode)).await?;
        let mut stx = StoreTx {
            store: Arc::clone(&self.inner),
            tx,
            session,
        };

        let outcome = match self.inner.config.transaction_timeout() {
            Some(limit) => {
                ctx.child()
                    .with_timeout(limit)
                    .run(work(&mut stx))
                    .await
            }
            None => ctx.run(work(&mut stx)).await,
        };

        let StoreTx { tx, session, .. } = stx;
        let tx_id = tx.id();
        match outcome {
            Ok(value) => {
                backend.commit_tx(tx).await?;
                debug!(session = session.id(), tx = %tx_id, %mode, "transaction committed");
                Ok(value)
            }
            Err(err) => {
                if err.is_not_found() {
                    debug!(session = session.id(), tx = %tx_id, error = %err, "not found, rolling back");
                } else if mode.is_write() {
                    warn!(session = session.id(), tx = %tx_id, error = %err, "rolling back write transaction");
                }
                if let Err(rollback_err) = backend.rollback_tx(tx).await {
                    warn!(tx = %tx_id, error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl GraphStore<MemoryBackend> {
    /// Open the backend named by `config`.
    pub fn open(config: StoreConfig) -> Result<Self> {
        match config.backend {
            BackendConfig::Memory => Ok(Self::new(MemoryBackend::new(), config)),
        }
    }
}

// ============================================================================
// StoreTx: the handle a unit of work receives
// ============================================================================

/// A live transaction bound to one session.
///
/// Thin convenience layer over the backend calls; every method runs in this
/// transaction.
pub struct StoreTx<B: StorageBackend> {
    store: Arc<StoreInner<B>>,
    tx: B::Tx,
    session: Session,
}

impl<B: StorageBackend> StoreTx<B> {
    pub fn mode(&self) -> TxMode {
        self.tx.mode()
    }

    pub fn session_id(&self) -> u64 {
        self.session.id()
    }

    /// First node with `label` whose property `key` equals `value`.
    pub async fn find_node(&self, label: &str, key: &str, value: impl Into<Value>) -> Result<Option<Node>> {
        let value = value.into();
        let mut found = self.store.backend.nodes_by_property(&self.tx, label, key, &value).await?;
        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    pub async fn nodes_by_label(&self, label: &str) -> Result<Vec<Node>> {
        self.store.backend.nodes_by_label(&self.tx, label).await
    }

    pub async fn get_node(&self, id: NodeId) -> Result<Option<Node>> {
        self.store.backend.get_node(&self.tx, id).await
    }

    pub async fn create_node(&mut self, labels: &[&str], props: PropertyMap) -> Result<NodeId> {
        self.store.backend.create_node(&mut self.tx, labels, props).await
    }

    pub async fn set_node_property(&mut self, id: NodeId, key: &str, val: impl Into<Value>) -> Result<()> {
        self.store.backend.set_node_property(&mut self.tx, id, key, val.into()).await
    }

    pub async fn detach_delete_node(&mut self, id: NodeId) -> Result<bool> {
        self.store.backend.detach_delete_node(&mut self.tx, id).await
    }

    pub async fn create_relationship(
        &mut self,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
        props: PropertyMap,
    ) -> Result<RelId> {
        self.store.backend.create_relationship(&mut self.tx, src, dst, rel_type, props).await
    }

    pub async fn delete_relationship(&mut self, id: RelId) -> Result<bool> {
        self.store.backend.delete_relationship(&mut self.tx, id).await
    }

    pub async fn relationships(
        &self,
        node: NodeId,
        dir: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>> {
        self.store.backend.get_relationships(&self.tx, node, dir, rel_type).await
    }

    /// Edges of `rel_type` going from `src` to `dst`.
    pub async fn relationships_between(
        &self,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
    ) -> Result<Vec<Relationship>> {
        Ok(self
            .relationships(src, Direction::Outgoing, Some(rel_type))
            .await?
            .into_iter()
            .filter(|rel| rel.dst == dst)
            .collect())
    }

    /// Nodes reached from `node` over `rel_type` edges in `dir`, paired with
    /// the edge that reached them. Nodes without `label` are skipped.
    pub async fn neighbours(
        &self,
        node: NodeId,
        dir: Direction,
        rel_type: &str,
        label: &str,
    ) -> Result<Vec<(Relationship, Node)>> {
        let rels = self.relationships(node, dir, Some(rel_type)).await?;
        let mut out = Vec::with_capacity(rels.len());
        for rel in rels {
            let Some(other) = rel.other_node(node) else { continue };
            match self.get_node(other).await? {
                Some(n) if n.has_label(label) => out.push((rel, n)),
                Some(_) => {}
                None => {
                    return Err(Error::StorageError(format!(
                        "relationship {} points at missing node {other}",
                        rel.id
                    )));
                }
            }
        }
        Ok(out)
    }
}
