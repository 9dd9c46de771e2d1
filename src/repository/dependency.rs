//! DependsOn edges between services.
//!
//! Edge identity is `(from, to)` for an unversioned edge and
//! `(from, to, version)` for a versioned one. An unversioned add matches any
//! existing edge between the pair, like an unconstrained `MERGE`.

use std::collections::HashSet;

use tracing::{debug, info, instrument};

use crate::context::Context;
use crate::domain::{Dependency, DependencyTarget};
use crate::model::property_map::props;
use crate::model::{Direction, Node, Relationship, Value};
use crate::storage::StorageBackend;
use crate::store::{GraphStore, StoreTx};
use crate::{Error, Result};
use super::{edges, labels, not_found, require_node, string_prop};

fn decode_dependency(rel: &Relationship, node: &Node) -> Result<Dependency> {
    Ok(Dependency {
        id: string_prop(node, "id")?,
        name: string_prop(node, "name")?,
        service_type: string_prop(node, "type")?,
        version: rel.get("version").and_then(Value::as_str).map(str::to_owned),
    })
}

/// Look up both endpoints in one go so NotFound can name every missing id.
async fn require_pair<B: StorageBackend>(
    tx: &StoreTx<B>,
    from_id: &str,
    to_id: &str,
) -> Result<(Node, Node)> {
    let from = tx.find_node(labels::SERVICE, "id", from_id).await?;
    let to = tx.find_node(labels::SERVICE, "id", to_id).await?;
    match (from, to) {
        (Some(from), Some(to)) => Ok((from, to)),
        (from, to) => {
            let missing: Vec<&str> = [(from.is_none(), from_id), (to.is_none(), to_id)]
                .into_iter()
                .filter_map(|(absent, id)| absent.then_some(id))
                .collect();
            Err(not_found(labels::SERVICE, &missing))
        }
    }
}

pub struct DependencyGraphRepository<B: StorageBackend> {
    store: GraphStore<B>,
}

impl<B: StorageBackend> Clone for DependencyGraphRepository<B> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<B: StorageBackend> DependencyGraphRepository<B> {
    pub fn new(store: GraphStore<B>) -> Self {
        Self { store }
    }

    /// Record that `service_id` depends on `target`. Idempotent per edge key.
    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), service_id = %service_id, target_id = %target.id))]
    pub async fn add_dependency(
        &self,
        ctx: &Context,
        service_id: &str,
        target: DependencyTarget,
    ) -> Result<()> {
        let service_id = service_id.to_owned();
        let created = self
            .store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let (from, to) = require_pair(tx, &service_id, &target.id).await?;

                let existing = tx.relationships_between(from.id, to.id, edges::DEPENDS_ON).await?;
                let already = existing.iter().any(|rel| match &target.version {
                    None => true,
                    Some(v) => rel.get("version").and_then(Value::as_str) == Some(v.as_str()),
                });
                if already {
                    return Ok(false);
                }

                let props = props([("version", Value::from(target.version))]);
                tx.create_relationship(from.id, to.id, edges::DEPENDS_ON, props).await?;
                Ok(true)
            }))
            .await?;

        if created {
            info!("dependency added");
        } else {
            debug!("dependency already present");
        }
        Ok(())
    }

    /// Remove every DependsOn edge from `service_id` to `target_id`,
    /// whatever its version.
    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), service_id = %service_id, target_id = %target_id))]
    pub async fn delete_dependency(&self, ctx: &Context, service_id: &str, target_id: &str) -> Result<()> {
        let service_id = service_id.to_owned();
        let target_id = target_id.to_owned();
        let removed = self
            .store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let missing_edge =
                    || Error::NotFound(format!("dependency {service_id} -> {target_id}"));

                let from = tx.find_node(labels::SERVICE, "id", service_id.as_str()).await?;
                let to = tx.find_node(labels::SERVICE, "id", target_id.as_str()).await?;
                let (Some(from), Some(to)) = (from, to) else {
                    return Err(missing_edge());
                };

                let rels = tx.relationships_between(from.id, to.id, edges::DEPENDS_ON).await?;
                if rels.is_empty() {
                    return Err(missing_edge());
                }
                for rel in &rels {
                    tx.delete_relationship(rel.id).await?;
                }
                Ok(rels.len())
            }))
            .await?;

        info!(removed, "dependency deleted");
        Ok(())
    }

    /// Services `service_id` depends on.
    pub async fn get_dependencies(&self, ctx: &Context, service_id: &str) -> Result<Vec<Dependency>> {
        self.adjacent(ctx, service_id, Direction::Outgoing).await
    }

    /// Services that depend on `service_id`.
    pub async fn get_dependents(&self, ctx: &Context, service_id: &str) -> Result<Vec<Dependency>> {
        self.adjacent(ctx, service_id, Direction::Incoming).await
    }

    /// Number of distinct services with a DependsOn edge into `service_id`.
    pub async fn count_dependents(&self, ctx: &Context, service_id: &str) -> Result<u64> {
        let service_id = service_id.to_owned();
        self.store
            .execute_read(ctx, move |tx| Box::pin(async move {
                let node = require_node(tx, labels::SERVICE, &service_id).await?;
                let sources: HashSet<_> = tx
                    .relationships(node.id, Direction::Incoming, Some(edges::DEPENDS_ON))
                    .await?
                    .into_iter()
                    .map(|rel| rel.src)
                    .collect();
                Ok(sources.len() as u64)
            }))
            .await
    }

    async fn adjacent(&self, ctx: &Context, service_id: &str, dir: Direction) -> Result<Vec<Dependency>> {
        let service_id = service_id.to_owned();
        self.store
            .execute_read(ctx, move |tx| Box::pin(async move {
                let node = require_node(tx, labels::SERVICE, &service_id).await?;
                tx.neighbours(node.id, dir, edges::DEPENDS_ON, labels::SERVICE)
                    .await?
                    .iter()
                    .map(|(rel, other)| decode_dependency(rel, other))
                    .collect()
            }))
            .await
    }
}
