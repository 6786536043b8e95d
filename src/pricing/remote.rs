use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{CostBreakdown, CostCalculator, CostError, CostInput};
use crate::config::RemoteProcedureConfig;
use crate::models::ServiceType;

pub const CALCULATE_SHIPPING_COST: &str = "calculate_shipping_cost";
pub const GENERATE_TRACKING_NUMBER: &str = "generate_tracking_number";

#[derive(Debug, Error)]
pub enum RemoteProcedureError {
    #[error("Remote procedures are not configured: {0}")]
    NotConfigured(String),

    #[error("Remote procedure transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Remote procedure {procedure} returned HTTP {status}")]
    Status { procedure: String, status: u16 },

    #[error("Remote procedure {procedure} returned an unreadable body: {message}")]
    Decode { procedure: String, message: String },
}

/// HTTP client for the database host's remote procedure endpoint
/// (`POST {base_url}/rest/v1/rpc/{name}`).
#[derive(Clone, Debug)]
pub struct RemoteProcedureClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteProcedureClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteProcedureError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(RemoteProcedureError::NotConfigured(
                "base_url is empty".into(),
            ));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &RemoteProcedureConfig) -> Result<Self, RemoteProcedureError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| RemoteProcedureError::NotConfigured("remote.base_url is unset".into()))?;
        Self::new(
            base_url,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn procedure_url(&self, procedure: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, procedure)
    }

    /// Invokes `procedure` with JSON `params` and decodes the JSON result.
    #[instrument(skip(self, params))]
    pub async fn call<P, R>(&self, procedure: &str, params: &P) -> Result<R, RemoteProcedureError>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let mut request = self.client.post(self.procedure_url(procedure)).json(params);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(procedure, status = status.as_u16(), "remote procedure failed");
            return Err(RemoteProcedureError::Status {
                procedure: procedure.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RemoteProcedureError::Decode {
            procedure: procedure.to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct CostParams {
    service_type: ServiceType,
    weight_kg: Decimal,
    length_cm: Option<Decimal>,
    width_cm: Option<Decimal>,
    height_cm: Option<Decimal>,
    declared_value: Decimal,
    signature_required: bool,
    insurance_required: bool,
}

impl From<&CostInput> for CostParams {
    fn from(input: &CostInput) -> Self {
        Self {
            service_type: input.service_type,
            weight_kg: input.weight_kg,
            length_cm: input.dimensions.map(|d| d.length_cm),
            width_cm: input.dimensions.map(|d| d.width_cm),
            height_cm: input.dimensions.map(|d| d.height_cm),
            declared_value: input.declared_value,
            signature_required: input.signature_required,
            insurance_required: input.insurance_required,
        }
    }
}

/// Result row of `calculate_shipping_cost`; older deployments omit the
/// optional components.
#[derive(Debug, Deserialize)]
struct CostRow {
    base_cost: Decimal,
    #[serde(default)]
    weight_cost: Decimal,
    billable_weight_kg: Option<Decimal>,
    #[serde(default)]
    insurance_cost: Decimal,
    #[serde(default)]
    signature_cost: Decimal,
    tax_amount: Decimal,
    total_cost: Decimal,
    estimated_delivery_days: u32,
}

/// Cost calculator backed by the `calculate_shipping_cost` remote procedure
#[derive(Clone, Debug)]
pub struct RemoteCostCalculator {
    client: RemoteProcedureClient,
}

impl RemoteCostCalculator {
    pub fn new(client: RemoteProcedureClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CostCalculator for RemoteCostCalculator {
    async fn calculate(&self, input: &CostInput) -> Result<CostBreakdown, CostError> {
        input.check()?;

        let row: CostRow = self
            .client
            .call(CALCULATE_SHIPPING_COST, &CostParams::from(input))
            .await?;

        let breakdown = CostBreakdown {
            base_cost: row.base_cost,
            weight_cost: row.weight_cost,
            billable_weight_kg: row.billable_weight_kg.unwrap_or(input.weight_kg),
            insurance_cost: row.insurance_cost,
            signature_cost: row.signature_cost,
            tax_amount: row.tax_amount,
            total_cost: row.total_cost,
            estimated_delivery_days: row.estimated_delivery_days,
        };

        if !breakdown.is_consistent() {
            return Err(CostError::MalformedResponse(format!(
                "total_cost {} does not match its components",
                breakdown.total_cost
            )));
        }

        debug!(total_cost = %breakdown.total_cost, "priced parcel remotely");
        Ok(breakdown)
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}
