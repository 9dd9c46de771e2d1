//! Risk aggregation.
//!
//! `get_service_risk_report` runs in three steps:
//!
//! 1. one read transaction confirms the service exists;
//! 2. two independent reads run concurrently, each in its own transaction:
//!    the dependent count and the debt-type histogram;
//! 3. both are awaited before anything is inspected. Each branch writes a
//!    disjoint field of the report and pushes failures into a bounded error
//!    channel; the first error received fails the whole call.

use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::context::Context;
use crate::domain::{DebtStatus, RiskReport, ServiceDebtCount};
use crate::model::Direction;
use crate::storage::StorageBackend;
use crate::store::GraphStore;
use crate::{Error, Result};
use super::{edges, labels, require_node, string_prop, DebtRepository, DependencyGraphRepository};

/// Number of fan-out branches; also the error channel capacity.
const BRANCHES: usize = 2;

pub struct ReportAggregator<B: StorageBackend> {
    store: GraphStore<B>,
    dependencies: DependencyGraphRepository<B>,
    debts: DebtRepository<B>,
}

impl<B: StorageBackend> Clone for ReportAggregator<B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            dependencies: self.dependencies.clone(),
            debts: self.debts.clone(),
        }
    }
}

impl<B: StorageBackend> ReportAggregator<B> {
    pub fn new(
        store: GraphStore<B>,
        dependencies: DependencyGraphRepository<B>,
        debts: DebtRepository<B>,
    ) -> Self {
        Self { store, dependencies, debts }
    }

    #[instrument(level = "debug", skip_all, fields(correlation_id = %ctx.correlation_id(), service_id = %service_id))]
    pub async fn get_service_risk_report(&self, ctx: &Context, service_id: &str) -> Result<RiskReport> {
        let id = service_id.to_owned();
        self.store
            .execute_read(ctx, move |tx| Box::pin(async move {
                require_node(tx, labels::SERVICE, &id).await.map(drop)
            }))
            .await?;

        let mut report = RiskReport::default();
        let (errors_tx, mut errors_rx) = mpsc::channel::<Error>(BRANCHES);
        {
            let RiskReport { dependent_count, debt_count } = &mut report;
            let errors = &errors_tx;

            let dependents = async move {
                match self.dependencies.count_dependents(ctx, service_id).await {
                    Ok(n) => *dependent_count = n,
                    Err(e) => {
                        let queued = errors.try_send(e);
                        debug_assert!(queued.is_ok(), "one error slot per branch");
                    }
                }
            };
            let histogram = async move {
                match self.debts.count_by_type(ctx, service_id).await {
                    Ok(h) => *debt_count = h,
                    Err(e) => {
                        let queued = errors.try_send(e);
                        debug_assert!(queued.is_ok(), "one error slot per branch");
                    }
                }
            };
            tokio::join!(dependents, histogram);
        }
        drop(errors_tx);

        if let Some(err) = errors_rx.recv().await {
            warn!(error = %err, "risk report branch failed");
            return Err(err);
        }
        debug!(dependents = report.dependent_count, debt_types = report.debt_count.len(), "risk report assembled");
        Ok(report)
    }

    /// Open (pending or in-progress) debt per service, highest count first,
    /// ties by name. Services with no open debt are omitted, and so are
    /// statuses this crate does not know.
    pub async fn get_debt_count_by_service(&self, ctx: &Context) -> Result<Vec<ServiceDebtCount>> {
        let mut rows = self
            .store
            .execute_read(ctx, |tx| Box::pin(async move {
                let mut rows = Vec::new();
                for service in tx.nodes_by_label(labels::SERVICE).await? {
                    let mut count = 0u64;
                    for (_, debt) in tx
                        .neighbours(service.id, Direction::Outgoing, edges::OWNS, labels::DEBT)
                        .await?
                    {
                        if DebtStatus::from(string_prop(&debt, "status")?).is_open() {
                            count += 1;
                        }
                    }
                    if count > 0 {
                        rows.push(ServiceDebtCount {
                            service_id: string_prop(&service, "id")?,
                            name: string_prop(&service, "name")?,
                            count,
                        });
                    }
                }
                Ok(rows)
            }))
            .await?;

        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }
}
