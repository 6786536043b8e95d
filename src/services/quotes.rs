use crate::{
    commands::quotes::{CreateQuoteCommand, NewQuote},
    commands::Command,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{
        parcel::{cost_input, PackageDetails, ServiceOptions},
        quote::{self, QuoteStatus},
    },
    pricing::{CostBreakdown, CostCalculator},
    services::{like_pattern, page_index},
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Parameters of an instant rate estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct RateRequest {
    #[validate]
    pub package: PackageDetails,

    #[validate]
    pub service: ServiceOptions,
}

/// Rate estimates and guest quotes
#[derive(Clone)]
pub struct QuoteService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    calculator: Arc<dyn CostCalculator>,
    validity_days: i64,
    logger: Logger,
}

impl QuoteService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        calculator: Arc<dyn CostCalculator>,
        validity_days: i64,
        logger: Logger,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            calculator,
            validity_days,
            logger,
        }
    }

    /// Prices a parcel without storing anything
    #[instrument(skip(self, request))]
    pub async fn calculate_rate(&self, request: RateRequest) -> Result<CostBreakdown, ServiceError> {
        request.validate()?;
        let breakdown = self
            .calculator
            .calculate(&cost_input(&request.package, &request.service))
            .await?;
        Ok(breakdown)
    }

    #[instrument(skip(self, quote))]
    pub async fn create_quote(&self, quote: NewQuote) -> Result<quote::Model, ServiceError> {
        let command = CreateQuoteCommand {
            quote,
            calculator: self.calculator.clone(),
            validity_days: self.validity_days,
        };

        let created = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        slog::info!(self.logger, "Quote created";
            "quote_id" => %created.id,
            "estimated_cost" => %created.estimated_cost,
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_quote(&self, quote_id: Uuid) -> Result<quote::Model, ServiceError> {
        quote::Entity::find_by_id(quote_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote with ID {} not found", quote_id)))
    }

    /// Lists quotes, newest first. `status` matches the status shown to
    /// readers, so open quotes past expiry count as expired.
    #[instrument(skip(self))]
    pub async fn list_quotes(
        &self,
        status: Option<QuoteStatus>,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<quote::Model>, u64), ServiceError> {
        let mut query = quote::Entity::find().order_by_desc(quote::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(status.effective_condition(Utc::now()));
        }
        if let Some(pattern) = like_pattern(search.as_deref()) {
            query = query.filter(quote::Column::ContactEmail.like(pattern));
        }

        let paginator = query.paginate(self.db_pool.as_ref(), limit);
        let total = paginator.num_items().await?;
        let quotes = paginator.fetch_page(page_index(page)).await?;

        Ok((quotes, total))
    }
}
