//! Team → Service ownership edges.

use tracing::{info, instrument};

use crate::context::Context;
use crate::domain::{Service, Team};
use crate::model::{Direction, Node, PropertyMap};
use crate::storage::StorageBackend;
use crate::store::{GraphStore, StoreTx};
use crate::{Error, Result};
use super::service::decode_service;
use super::team::decode_team;
use super::{edges, labels, not_found, require_node};

async fn require_team_and_service<B: StorageBackend>(
    tx: &StoreTx<B>,
    team_id: &str,
    service_id: &str,
) -> Result<(Node, Node)> {
    let team = tx.find_node(labels::TEAM, "id", team_id).await?;
    let service = tx.find_node(labels::SERVICE, "id", service_id).await?;
    match (team, service) {
        (Some(team), Some(service)) => Ok((team, service)),
        (None, _) => Err(not_found(labels::TEAM, &[team_id])),
        (_, None) => Err(not_found(labels::SERVICE, &[service_id])),
    }
}

pub struct OwnershipRepository<B: StorageBackend> {
    store: GraphStore<B>,
}

impl<B: StorageBackend> Clone for OwnershipRepository<B> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<B: StorageBackend> OwnershipRepository<B> {
    pub fn new(store: GraphStore<B>) -> Self {
        Self { store }
    }

    /// Make `team_id` an owner of `service_id`. Re-creating an existing
    /// association is a no-op.
    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), team_id = %team_id, service_id = %service_id))]
    pub async fn create_association(&self, ctx: &Context, team_id: &str, service_id: &str) -> Result<()> {
        let team_id = team_id.to_owned();
        let service_id = service_id.to_owned();
        self.store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let (team, service) = require_team_and_service(tx, &team_id, &service_id).await?;
                if tx.relationships_between(team.id, service.id, edges::OWNS).await?.is_empty() {
                    tx.create_relationship(team.id, service.id, edges::OWNS, PropertyMap::new()).await?;
                }
                Ok(())
            }))
            .await?;

        info!("ownership association created");
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), team_id = %team_id, service_id = %service_id))]
    pub async fn delete_association(&self, ctx: &Context, team_id: &str, service_id: &str) -> Result<()> {
        let team_id = team_id.to_owned();
        let service_id = service_id.to_owned();
        self.store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let (team, service) = require_team_and_service(tx, &team_id, &service_id).await?;
                let rels = tx.relationships_between(team.id, service.id, edges::OWNS).await?;
                if rels.is_empty() {
                    return Err(Error::NotFound(format!(
                        "association team {team_id} -> service {service_id}"
                    )));
                }
                for rel in &rels {
                    tx.delete_relationship(rel.id).await?;
                }
                Ok(())
            }))
            .await?;

        info!("ownership association deleted");
        Ok(())
    }

    /// Services owned by `team_id`, by name. NotFound if the team is absent.
    pub async fn get_services_by_team(&self, ctx: &Context, team_id: &str) -> Result<Vec<Service>> {
        let team_id = team_id.to_owned();
        let mut services = self
            .store
            .execute_read(ctx, move |tx| Box::pin(async move {
                let team = require_node(tx, labels::TEAM, &team_id).await?;
                tx.neighbours(team.id, Direction::Outgoing, edges::OWNS, labels::SERVICE)
                    .await?
                    .iter()
                    .map(|(_, node)| decode_service(node))
                    .collect::<Result<Vec<_>>>()
            }))
            .await?;
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    /// Teams owning `service_id`, by name. NotFound if the service is absent.
    pub async fn get_teams_by_service_id(&self, ctx: &Context, service_id: &str) -> Result<Vec<Team>> {
        let service_id = service_id.to_owned();
        let mut teams = self
            .store
            .execute_read(ctx, move |tx| Box::pin(async move {
                let service = require_node(tx, labels::SERVICE, &service_id).await?;
                tx.neighbours(service.id, Direction::Incoming, edges::OWNS, labels::TEAM)
                    .await?
                    .iter()
                    .map(|(_, node)| decode_team(node))
                    .collect::<Result<Vec<_>>>()
            }))
            .await?;
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }
}
