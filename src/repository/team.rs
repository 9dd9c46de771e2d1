//! Team CRUD.

use chrono::Utc;
use tracing::{info, instrument};

use crate::context::Context;
use crate::domain::{NewTeam, Team, TeamUpdate};
use crate::model::property_map::props;
use crate::model::{Node, Value};
use crate::storage::StorageBackend;
use crate::store::GraphStore;
use crate::Result;
use super::{datetime_prop, labels, new_id, require_node, string_prop};

pub(crate) fn decode_team(node: &Node) -> Result<Team> {
    Ok(Team {
        id: string_prop(node, "id")?,
        name: string_prop(node, "name")?,
        created: datetime_prop(node, "created")?,
        updated: datetime_prop(node, "updated")?,
    })
}

pub struct TeamRepository<B: StorageBackend> {
    store: GraphStore<B>,
}

impl<B: StorageBackend> Clone for TeamRepository<B> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<B: StorageBackend> TeamRepository<B> {
    pub fn new(store: GraphStore<B>) -> Self {
        Self { store }
    }

    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), name = %new.name))]
    pub async fn create_team(&self, ctx: &Context, new: NewTeam) -> Result<Team> {
        let now = Utc::now();
        let team = Team {
            id: new_id(),
            name: new.name,
            created: now,
            updated: now,
        };
        let props = props([
            ("id", Value::from(&team.id)),
            ("name", Value::from(&team.name)),
            ("created", Value::from(now)),
            ("updated", Value::from(now)),
        ]);

        self.store
            .execute_write(ctx, move |tx| Box::pin(async move {
                tx.create_node(&[labels::TEAM], props).await?;
                Ok(())
            }))
            .await?;

        info!(team_id = %team.id, "team created");
        Ok(team)
    }

    pub async fn get_team(&self, ctx: &Context, team_id: &str) -> Result<Team> {
        let team_id = team_id.to_owned();
        self.store
            .execute_read(ctx, move |tx| Box::pin(async move {
                decode_team(&require_node(tx, labels::TEAM, &team_id).await?)
            }))
            .await
    }

    pub async fn list_teams(&self, ctx: &Context) -> Result<Vec<Team>> {
        let mut teams = self
            .store
            .execute_read(ctx, |tx| Box::pin(async move {
                tx.nodes_by_label(labels::TEAM)
                    .await?
                    .iter()
                    .map(decode_team)
                    .collect::<Result<Vec<_>>>()
            }))
            .await?;
        teams.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(teams)
    }

    pub async fn update_team(&self, ctx: &Context, team_id: &str, update: TeamUpdate) -> Result<Team> {
        let team_id = team_id.to_owned();
        self.store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let node = require_node(tx, labels::TEAM, &team_id).await?;
                if let Some(name) = update.name {
                    tx.set_node_property(node.id, "name", name).await?;
                }
                tx.set_node_property(node.id, "updated", Utc::now()).await?;
                decode_team(&require_node(tx, labels::TEAM, &team_id).await?)
            }))
            .await
    }

    /// Remove the team and its ownership edges. Owned services survive.
    pub async fn delete_team(&self, ctx: &Context, team_id: &str) -> Result<()> {
        let id = team_id.to_owned();
        self.store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let node = require_node(tx, labels::TEAM, &id).await?;
                tx.detach_delete_node(node.id).await?;
                Ok(())
            }))
            .await?;

        info!(team_id, "team deleted");
        Ok(())
    }
}
