//! In-memory storage backend.
//!
//! This is the reference implementation of `StorageBackend`.
//!
//! ## Transactions
//!
//! The whole graph sits behind one `tokio::sync::RwLock`:
//!
//! - **Read transactions** hold a shared guard for their lifetime, so they see
//!   one consistent snapshot and run alongside other readers.
//! - **Write transactions** hold the exclusive guard and mutate a *staged*
//!   copy of the graph. `commit_tx()` publishes the staged copy;
//!   `rollback_tx()` (or simply dropping the transaction) throws it away.
//!
//! Writers are therefore fully serialized, and an existence check followed
//! by a mutation inside one write transaction cannot interleave with any
//! other writer. Staging clones the graph once per write transaction, which
//! is fine for the sizes this backend is meant for (tests, embedding).
//!
//! Id counters are not transactional: a rolled-back create burns its id.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::model::*;
use crate::tx::{Transaction, TxId, TxMode};
use crate::{Error, Result};
use super::StorageBackend;

// ============================================================================
// GraphData
// ============================================================================

/// The graph itself. Cloned into every write transaction as its staging area.
#[derive(Debug, Clone, Default)]
struct GraphData {
    nodes: HashMap<NodeId, Node>,
    relationships: HashMap<RelId, Relationship>,
    /// node_id → list of relationship IDs
    adjacency: HashMap<NodeId, Vec<RelId>>,
    /// label → node IDs (poor man's label index)
    label_index: HashMap<String, Vec<NodeId>>,
}

impl GraphData {
    fn insert_node(&mut self, node: Node) {
        for label in &node.labels {
            self.label_index.entry(label.clone()).or_default().push(node.id);
        }
        self.adjacency.insert(node.id, Vec::new());
        self.nodes.insert(node.id, node);
    }

    fn remove_node(&mut self, id: NodeId) -> Result<bool> {
        // Neo4j semantics: can't delete a connected node
        if let Some(rels) = self.adjacency.get(&id) {
            if !rels.is_empty() {
                return Err(Error::ConstraintViolation(format!(
                    "Cannot delete node {id} with {} relationships. Delete relationships first.",
                    rels.len()
                )));
            }
        }

        let removed = self.nodes.remove(&id);
        self.adjacency.remove(&id);
        if let Some(node) = &removed {
            for label in &node.labels {
                if let Some(ids) = self.label_index.get_mut(label) {
                    ids.retain(|nid| *nid != id);
                }
            }
        }
        Ok(removed.is_some())
    }

    fn insert_relationship(&mut self, rel: Relationship) -> Result<()> {
        if !self.nodes.contains_key(&rel.src) {
            return Err(Error::StorageError(format!("Source node {} does not exist", rel.src)));
        }
        if !self.nodes.contains_key(&rel.dst) {
            return Err(Error::StorageError(format!("Target node {} does not exist", rel.dst)));
        }

        self.adjacency.entry(rel.src).or_default().push(rel.id);
        if rel.src != rel.dst {
            self.adjacency.entry(rel.dst).or_default().push(rel.id);
        }
        self.relationships.insert(rel.id, rel);
        Ok(())
    }

    fn remove_relationship(&mut self, id: RelId) -> bool {
        let Some(rel) = self.relationships.remove(&id) else {
            return false;
        };
        for endpoint in [rel.src, rel.dst] {
            if let Some(rels) = self.adjacency.get_mut(&endpoint) {
                rels.retain(|rid| *rid != id);
            }
        }
        true
    }

    fn relationships_of(&self, node: NodeId, dir: Direction, rel_type: Option<&str>) -> Vec<Relationship> {
        let Some(rel_ids) = self.adjacency.get(&node) else {
            return Vec::new();
        };
        rel_ids
            .iter()
            .filter_map(|rid| self.relationships.get(rid))
            .filter(|rel| rel.matches_direction(node, dir))
            .filter(|rel| rel_type.is_none_or(|t| rel.rel_type == t))
            .cloned()
            .collect()
    }

    fn nodes_with_label(&self, label: &str) -> Vec<Node> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id).cloned()).collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory property graph storage.
///
/// Cloning is cheap and yields a handle to the same graph.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    graph: Arc<RwLock<GraphData>>,
    next_node_id: AtomicU64,
    next_rel_id: AtomicU64,
    next_tx_id: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                graph: Arc::new(RwLock::new(GraphData::default())),
                next_node_id: AtomicU64::new(1),
                next_rel_id: AtomicU64::new(1),
                next_tx_id: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MemoryTx
// ============================================================================

enum TxView {
    Read(OwnedRwLockReadGuard<GraphData>),
    Write {
        guard: OwnedRwLockWriteGuard<GraphData>,
        staged: GraphData,
    },
}

/// In-memory transaction. Owns its lock guard, so it is `Send` and can be
/// held across awaits.
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
    view: TxView,
}

impl MemoryTx {
    fn data(&self) -> &GraphData {
        match &self.view {
            TxView::Read(guard) => guard,
            TxView::Write { staged, .. } => staged,
        }
    }

    fn data_mut(&mut self) -> Result<&mut GraphData> {
        match &mut self.view {
            TxView::Read(_) => Err(Error::TxError(format!(
                "write attempted in read-only transaction {}",
                self.id
            ))),
            TxView::Write { staged, .. } => Ok(staged),
        }
    }
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
}

// ============================================================================
// StorageBackend impl
// ============================================================================

#[async_trait]
impl StorageBackend for MemoryBackend {
    type Tx = MemoryTx;

    async fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        let graph = Arc::clone(&self.inner.graph);
        let view = match mode {
            TxMode::ReadOnly => TxView::Read(graph.read_owned().await),
            TxMode::ReadWrite => {
                let guard = graph.write_owned().await;
                let staged = guard.clone();
                TxView::Write { guard, staged }
            }
        };
        Ok(MemoryTx { id, mode, view })
    }

    async fn commit_tx(&self, tx: MemoryTx) -> Result<()> {
        if let TxView::Write { mut guard, staged } = tx.view {
            *guard = staged;
        }
        Ok(())
    }

    async fn rollback_tx(&self, tx: MemoryTx) -> Result<()> {
        // Dropping the view releases the lock; staged writes go with it.
        drop(tx);
        Ok(())
    }

    // ========================================================================
    // Node CRUD
    // ========================================================================

    async fn create_node(
        &self,
        tx: &mut MemoryTx,
        labels: &[&str],
        props: PropertyMap,
    ) -> Result<NodeId> {
        let data = tx.data_mut()?;
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        let node = Node {
            id,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties: props,
        };
        data.insert_node(node);
        Ok(id)
    }

    async fn get_node(&self, tx: &MemoryTx, id: NodeId) -> Result<Option<Node>> {
        Ok(tx.data().nodes.get(&id).cloned())
    }

    async fn delete_node(&self, tx: &mut MemoryTx, id: NodeId) -> Result<bool> {
        tx.data_mut()?.remove_node(id)
    }

    async fn set_node_property(
        &self,
        tx: &mut MemoryTx,
        id: NodeId,
        key: &str,
        val: Value,
    ) -> Result<()> {
        let node = tx
            .data_mut()?
            .nodes
            .get_mut(&id)
            .ok_or_else(|| Error::StorageError(format!("Node {id} does not exist")))?;
        node.properties.insert(key.to_string(), val);
        Ok(())
    }

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    async fn create_relationship(
        &self,
        tx: &mut MemoryTx,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
        props: PropertyMap,
    ) -> Result<RelId> {
        let data = tx.data_mut()?;
        let id = RelId(self.inner.next_rel_id.fetch_add(1, Ordering::Relaxed));
        let mut rel = Relationship::new(id, src, dst, rel_type);
        rel.properties = props;
        data.insert_relationship(rel)?;
        Ok(id)
    }

    async fn get_relationship(&self, tx: &MemoryTx, id: RelId) -> Result<Option<Relationship>> {
        Ok(tx.data().relationships.get(&id).cloned())
    }

    async fn delete_relationship(&self, tx: &mut MemoryTx, id: RelId) -> Result<bool> {
        Ok(tx.data_mut()?.remove_relationship(id))
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    async fn get_relationships(
        &self,
        tx: &MemoryTx,
        node: NodeId,
        dir: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>> {
        Ok(tx.data().relationships_of(node, dir, rel_type))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn node_count(&self, tx: &MemoryTx) -> Result<u64> {
        Ok(tx.data().nodes.len() as u64)
    }

    async fn relationship_count(&self, tx: &MemoryTx) -> Result<u64> {
        Ok(tx.data().relationships.len() as u64)
    }

    // ========================================================================
    // Scan
    // ========================================================================

    async fn nodes_by_label(&self, tx: &MemoryTx, label: &str) -> Result<Vec<Node>> {
        Ok(tx.data().nodes_with_label(label))
    }
}

// ============================================================================
// Tests
// ============================================================================
