use crate::{
    db::DbPool,
    errors::ServiceError,
    models::{
        payment_proof::{self, ProofStatus},
        profile::{self, UserType},
        quote::{self, QuoteStatus},
        shipment::{self, ShipmentStatus},
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// Back-office dashboard figures
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnalyticsSummary {
    pub total_shipments: u64,
    /// Shipment count per status; every status is present
    pub shipments_by_status: BTreeMap<String, u64>,
    /// Shipments neither delivered nor cancelled
    pub active_shipments: u64,
    pub exception_shipments: u64,
    /// Sum of `total_cost` over shipments that were not cancelled
    pub revenue: Decimal,
    pub total_quotes: u64,
    /// Quotes still `quoted` and not yet past expiry
    pub open_quotes: u64,
    pub pending_payment_proofs: u64,
    pub total_clients: u64,
    pub generated_at: DateTime<Utc>,
}

/// Aggregates for the admin dashboard
#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: Arc<DbPool>,
}

impl AnalyticsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Runs the independent reads concurrently
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<AnalyticsSummary, ServiceError> {
        let now = Utc::now();
        let (status_counts, revenue, total_quotes, open_quotes, pending_proofs, total_clients) =
            tokio::try_join!(
                self.status_counts(),
                self.revenue(),
                self.count_quotes(None),
                self.count_quotes(Some(now)),
                self.pending_proofs(),
                self.total_clients(),
            )?;

        let mut shipments_by_status: BTreeMap<String, u64> = ShipmentStatus::ALL
            .iter()
            .map(|status| (status.as_str().to_string(), 0))
            .collect();
        for (status, count) in &status_counts {
            shipments_by_status.insert(status.as_str().to_string(), *count);
        }

        let total_shipments = status_counts.iter().map(|(_, count)| count).sum();
        let active_shipments = status_counts
            .iter()
            .filter(|(status, _)| !status.is_terminal())
            .map(|(_, count)| count)
            .sum();
        let exception_shipments = status_counts
            .iter()
            .filter(|(status, _)| *status == ShipmentStatus::Exception)
            .map(|(_, count)| count)
            .sum();

        Ok(AnalyticsSummary {
            total_shipments,
            shipments_by_status,
            active_shipments,
            exception_shipments,
            revenue,
            total_quotes,
            open_quotes,
            pending_payment_proofs: pending_proofs,
            total_clients,
            generated_at: now,
        })
    }

    async fn status_counts(&self) -> Result<Vec<(ShipmentStatus, u64)>, ServiceError> {
        let rows: Vec<(ShipmentStatus, i64)> = shipment::Entity::find()
            .select_only()
            .column(shipment::Column::Status)
            .column_as(Expr::col(shipment::Column::Id).count(), "count")
            .group_by(shipment::Column::Status)
            .into_tuple()
            .all(self.db_pool.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| (status, u64::try_from(count).unwrap_or(0)))
            .collect())
    }

    async fn revenue(&self) -> Result<Decimal, ServiceError> {
        let totals: Vec<Decimal> = shipment::Entity::find()
            .select_only()
            .column(shipment::Column::TotalCost)
            .filter(shipment::Column::Status.ne(ShipmentStatus::Cancelled))
            .into_tuple()
            .all(self.db_pool.as_ref())
            .await?;

        Ok(totals.into_iter().sum::<Decimal>().round_dp(2))
    }

    /// All quotes, or only the open ones as of `open_at`
    async fn count_quotes(&self, open_at: Option<DateTime<Utc>>) -> Result<u64, ServiceError> {
        let mut query = quote::Entity::find();
        if let Some(now) = open_at {
            query = query.filter(QuoteStatus::Quoted.effective_condition(now));
        }
        Ok(query.count(self.db_pool.as_ref()).await?)
    }

    async fn pending_proofs(&self) -> Result<u64, ServiceError> {
        Ok(payment_proof::Entity::find()
            .filter(payment_proof::Column::Status.eq(ProofStatus::PendingReview))
            .count(self.db_pool.as_ref())
            .await?)
    }

    async fn total_clients(&self) -> Result<u64, ServiceError> {
        Ok(profile::Entity::find()
            .filter(profile::Column::UserType.eq(UserType::Client))
            .count(self.db_pool.as_ref())
            .await?)
    }
}
