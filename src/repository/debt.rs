//! Debt items owned by services.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{info, instrument};

use crate::context::Context;
use crate::domain::{Debt, DebtStatus, DebtType, NewDebt};
use crate::model::property_map::props;
use crate::model::{Direction, Node, PropertyMap, Value};
use crate::storage::StorageBackend;
use crate::store::GraphStore;
use crate::{Error, Result};
use super::{datetime_prop, edges, labels, new_id, not_found, opt_string_prop, require_node, string_prop};

/// Unknown `type` or `status` strings decode to the `Other` variants; only a
/// missing or non-string property is an error.
fn decode_debt(node: &Node) -> Result<Debt> {
    Ok(Debt {
        id: string_prop(node, "id")?,
        debt_type: DebtType::from(string_prop(node, "type")?),
        title: string_prop(node, "title")?,
        description: opt_string_prop(node, "description")?.unwrap_or_default(),
        status: DebtStatus::from(string_prop(node, "status")?),
        created: datetime_prop(node, "created")?,
    })
}

/// Page bounds as `(skip, limit)`, rejecting non-positive input.
fn page_window(page: i64, page_size: i64) -> Result<(usize, usize)> {
    if page < 1 {
        return Err(Error::Validation(format!("page must be >= 1, got {page}")));
    }
    if page_size < 1 {
        return Err(Error::Validation(format!("page size must be >= 1, got {page_size}")));
    }
    let skip = (page - 1)
        .checked_mul(page_size)
        .and_then(|s| usize::try_from(s).ok())
        .ok_or_else(|| Error::Validation(format!("page {page} of size {page_size} is out of range")))?;
    let limit = usize::try_from(page_size)
        .map_err(|_| Error::Validation(format!("page size {page_size} is out of range")))?;
    Ok((skip, limit))
}

pub struct DebtRepository<B: StorageBackend> {
    store: GraphStore<B>,
}

impl<B: StorageBackend> Clone for DebtRepository<B> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<B: StorageBackend> DebtRepository<B> {
    pub fn new(store: GraphStore<B>) -> Self {
        Self { store }
    }

    /// Attach a new debt item to `service_id`.
    ///
    /// The item is always stored as [`DebtStatus::Pending`]; `debt.status`
    /// is ignored.
    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), service_id = %service_id, debt_type = %debt.debt_type))]
    pub async fn create_debt_item(&self, ctx: &Context, service_id: &str, debt: NewDebt) -> Result<Debt> {
        if !debt.debt_type.is_known() {
            return Err(Error::Validation(format!("invalid debt type: {:?}", debt.debt_type.as_str())));
        }
        let item = Debt {
            id: new_id(),
            debt_type: debt.debt_type,
            title: debt.title,
            description: debt.description,
            status: DebtStatus::default(),
            created: Utc::now(),
        };
        let props = props([
            ("id", Value::from(&item.id)),
            ("type", Value::from(item.debt_type.as_str())),
            ("title", Value::from(&item.title)),
            ("description", Value::from(&item.description)),
            ("status", Value::from(item.status.as_str())),
            ("created", Value::from(item.created)),
        ]);

        let service_id = service_id.to_owned();
        self.store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let service = require_node(tx, labels::SERVICE, &service_id).await?;
                let debt_node = tx.create_node(&[labels::DEBT], props).await?;
                tx.create_relationship(service.id, debt_node, edges::OWNS, PropertyMap::new()).await?;
                Ok(())
            }))
            .await?;

        info!(debt_id = %item.id, "debt item created");
        Ok(item)
    }

    pub async fn get_debt_item(&self, ctx: &Context, debt_id: &str) -> Result<Debt> {
        let debt_id = debt_id.to_owned();
        self.store
            .execute_read(ctx, move |tx| Box::pin(async move {
                decode_debt(&require_node(tx, labels::DEBT, &debt_id).await?)
            }))
            .await
    }

    /// One page of a service's debt, newest first. With `only_resolved`,
    /// only remediated items. An unknown service yields an empty page.
    pub async fn get_debt_by_service_id(
        &self,
        ctx: &Context,
        service_id: &str,
        page: i64,
        page_size: i64,
        only_resolved: bool,
    ) -> Result<Vec<Debt>> {
        let (skip, limit) = page_window(page, page_size)?;

        let service_id = service_id.to_owned();
        let mut items = self
            .store
            .execute_read(ctx, move |tx| Box::pin(async move {
                let Some(service) = tx.find_node(labels::SERVICE, "id", service_id.as_str()).await? else {
                    return Ok(Vec::new());
                };
                let remediated = Value::from(DebtStatus::Remediated.as_str());
                tx.neighbours(service.id, Direction::Outgoing, edges::OWNS, labels::DEBT)
                    .await?
                    .iter()
                    .filter(|(_, node)| !only_resolved || node.get("status") == Some(&remediated))
                    .map(|(_, node)| decode_debt(node))
                    .collect::<Result<Vec<_>>>()
            }))
            .await?;

        items.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.id.cmp(&b.id)));
        Ok(items.into_iter().skip(skip).take(limit).collect())
    }

    /// Set the status unconditionally.
    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), debt_id = %debt_id, %status))]
    pub async fn update_status(&self, ctx: &Context, debt_id: &str, status: DebtStatus) -> Result<()> {
        if !status.is_known() {
            return Err(Error::Validation(format!("invalid debt status: {:?}", status.as_str())));
        }
        let debt_id = debt_id.to_owned();
        self.store
            .execute_write(ctx, move |tx| Box::pin(async move {
                let Some(node) = tx.find_node(labels::DEBT, "id", debt_id.as_str()).await? else {
                    return Err(not_found(labels::DEBT, &[debt_id.as_str()]));
                };
                tx.set_node_property(node.id, "status", status.as_str()).await
            }))
            .await?;

        info!("debt status updated");
        Ok(())
    }

    /// Histogram of debt `type` over the items owned by `service_id`. Types
    /// with no items are absent.
    pub async fn count_by_type(&self, ctx: &Context, service_id: &str) -> Result<BTreeMap<String, u64>> {
        let service_id = service_id.to_owned();
        self.store
            .execute_read(ctx, move |tx| Box::pin(async move {
                let service = require_node(tx, labels::SERVICE, &service_id).await?;
                let mut histogram = BTreeMap::new();
                for (_, debt) in tx
                    .neighbours(service.id, Direction::Outgoing, edges::OWNS, labels::DEBT)
                    .await?
                {
                    *histogram.entry(string_prop(&debt, "type")?).or_insert(0) += 1;
                }
                Ok(histogram)
            }))
            .await
    }
}
