use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    #[sea_orm(string_value = "paypal")]
    Paypal,
    #[sea_orm(string_value = "zelle")]
    Zelle,
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    #[sea_orm(string_value = "crypto")]
    Crypto,
    #[sea_orm(string_value = "cash_app")]
    CashApp,
    #[sea_orm(string_value = "other")]
    Other,
}

impl PaymentMethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethodType::Paypal => "paypal",
            PaymentMethodType::Zelle => "zelle",
            PaymentMethodType::BankTransfer => "bank_transfer",
            PaymentMethodType::Crypto => "crypto",
            PaymentMethodType::CashApp => "cash_app",
            PaymentMethodType::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin-configured way for a customer to settle an exception
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_options")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub method_type: PaymentMethodType,

    pub display_name: String,

    /// Handle, account number or instructions shown to the payer
    pub details: String,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
