//! Service CRUD.

use chrono::Utc;
use tracing::{info, instrument};

use crate::context::Context;
use crate::domain::{NewService, Service, ServiceUpdate};
use crate::model::property_map::props;
use crate::model::{Node, PropertyMap, Value};
use crate::storage::StorageBackend;
use crate::store::GraphStore;
use crate::Result;
use super::{datetime_prop, labels, new_id, opt_string_prop, require_node, string_prop};

pub(crate) fn decode_service(node: &Node) -> Result<Service> {
    Ok(Service {
        id: string_prop(node, "id")?,
        name: string_prop(node, "name")?,
        service_type: string_prop(node, "type")?,
        description: opt_string_prop(node, "description")?.unwrap_or_default(),
        url: opt_string_prop(node, "url")?,
        created: datetime_prop(node, "created")?,
        updated: datetime_prop(node, "updated")?,
    })
}

fn service_props(service: &Service) -> PropertyMap {
    props([
        ("id", Value::from(&service.id)),
        ("name", Value::from(&service.name)),
        ("type", Value::from(&service.service_type)),
        ("description", Value::from(&service.description)),
        ("url", Value::from(service.url.clone())),
        ("created", Value::from(service.created)),
        ("updated", Value::from(service.updated)),
    ])
}

pub struct ServiceRepository<B: StorageBackend> {
    store: GraphStore<B>,
}

impl<B: StorageBackend> Clone for ServiceRepository<B> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<B: StorageBackend> ServiceRepository<B> {
    pub fn new(store: GraphStore<B>) -> Self {
        Self { store }
    }

    /// Insert a new service with a generated id.
    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), name = %new.name))]
    pub async fn create_service(&self, ctx: &Context, new: NewService) -> Result<Service> {
        let now = Utc::now();
        let service = Service {
            id: new_id(),
            name: new.name,
            service_type: new.service_type,
            description: new.description,
            url: new.url,
            created: now,
            updated: now,
        };
        let props = service_props(&service);

        self.store
            .execute_write(ctx, move |tx| Box::pin(async move {
                tx.create_node(&[labels::SERVICE], props).await?;
                Ok(())
            }))
            .await?;

        info!(service_id = %service.id, "service created");
        Ok(service)
    }

    pub async fn get_service(&self, ctx: &Context, service_id: &str) -> Result<Service> {
        let service_id = service_id.to_owned();
        self.store
            .execute_read(ctx, move |tx| Box::pin(async move {
                let node = require_node(tx, labels::SERVICE, &service_id).await?;
                decode_service(&node)
            }))
            .await
    }

    /// All services, by name.
    pub async fn list_services(&self, ctx: &Context) -> Result<Vec<Service>> {
        let mut services = self
            .store
            .execute_read(ctx, |tx| Box::pin(async move {
                tx.nodes_by_label(labels::SERVICE)
                    .await?
                    .iter()
                    .map(decode_service)
                    .collect::<Result<Vec<_>>>()
            }))
            .await?;
        services.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(services)
    }

    /// Apply the `Some` fields of `update` in place and bump `updated`.
    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), service_id = %service_id))]
    pub async fn update_service(
        &self,
        ctx: &Context,
        service_id: &str,
        update: ServiceUpdate,
    ) -> Result<Service> {
        let service_id = service_id.to_owned();
        let service = self
            .store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let node = require_node(tx, labels::SERVICE, &service_id).await?;
                let changes = [
                    ("name", update.name),
                    ("type", update.service_type),
                    ("description", update.description),
                    ("url", update.url),
                ];
                for (key, value) in changes {
                    if let Some(value) = value {
                        tx.set_node_property(node.id, key, value).await?;
                    }
                }
                tx.set_node_property(node.id, "updated", Utc::now()).await?;

                let node = require_node(tx, labels::SERVICE, &service_id).await?;
                decode_service(&node)
            }))
            .await?;

        info!(service_id = %service.id, "service updated");
        Ok(service)
    }

    /// Remove the service and every edge touching it.
    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), service_id = %service_id))]
    pub async fn delete_service(&self, ctx: &Context, service_id: &str) -> Result<()> {
        let id = service_id.to_owned();
        self.store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let node = require_node(tx, labels::SERVICE, &id).await?;
                tx.detach_delete_node(node.id).await?;
                Ok(())
            }))
            .await?;

        info!(service_id, "service deleted");
        Ok(())
    }
}
