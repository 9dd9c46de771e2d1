//! Releases of a service.

use tracing::{info, instrument};

use crate::context::Context;
use crate::domain::{NewRelease, Release};
use crate::model::property_map::props;
use crate::model::{Direction, Node, PropertyMap, Value};
use crate::storage::StorageBackend;
use crate::store::GraphStore;
use crate::Result;
use super::{datetime_prop, edges, labels, new_id, opt_string_prop, require_node, string_prop};

fn decode_release(node: &Node) -> Result<Release> {
    Ok(Release {
        id: string_prop(node, "id")?,
        service_id: string_prop(node, "serviceId")?,
        release_date: datetime_prop(node, "releaseDate")?,
        url: opt_string_prop(node, "url")?,
        version: string_prop(node, "version")?,
    })
}

pub struct ReleaseRepository<B: StorageBackend> {
    store: GraphStore<B>,
}

impl<B: StorageBackend> Clone for ReleaseRepository<B> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<B: StorageBackend> ReleaseRepository<B> {
    pub fn new(store: GraphStore<B>) -> Self {
        Self { store }
    }

    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), service_id = %service_id, version = %new.version))]
    pub async fn create_release(&self, ctx: &Context, service_id: &str, new: NewRelease) -> Result<Release> {
        let release = Release {
            id: new_id(),
            service_id: service_id.to_owned(),
            release_date: new.release_date,
            url: new.url,
            version: new.version,
        };
        let props = props([
            ("id", Value::from(&release.id)),
            ("serviceId", Value::from(&release.service_id)),
            ("releaseDate", Value::from(release.release_date)),
            ("url", Value::from(release.url.clone())),
            ("version", Value::from(&release.version)),
        ]);

        let service_id = release.service_id.clone();
        self.store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let service = require_node(tx, labels::SERVICE, &service_id).await?;
                let node = tx.create_node(&[labels::RELEASE], props).await?;
                tx.create_relationship(service.id, node, edges::RELEASED, PropertyMap::new()).await?;
                Ok(())
            }))
            .await?;

        info!(release_id = %release.id, "release created");
        Ok(release)
    }

    /// Releases of `service_id`, newest first. NotFound if the service is absent.
    pub async fn get_releases_by_service_id(&self, ctx: &Context, service_id: &str) -> Result<Vec<Release>> {
        let service_id = service_id.to_owned();
        let mut releases = self
            .store
            .execute_read(ctx, move |tx| Box::pin(async move {
                let service = require_node(tx, labels::SERVICE, &service_id).await?;
                tx.neighbours(service.id, Direction::Outgoing, edges::RELEASED, labels::RELEASE)
                    .await?
                    .iter()
                    .map(|(_, node)| decode_release(node))
                    .collect::<Result<Vec<_>>>()
            }))
            .await?;
        releases.sort_by(|a, b| b.release_date.cmp(&a.release_date));
        Ok(releases)
    }
}
