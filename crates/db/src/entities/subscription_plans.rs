//! `SeaORM` Entity for subscription_plans table.

use super::sea_orm_active_enums::{BankSyncFrequency, SubscriptionTier};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tier: SubscriptionTier,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub price_monthly: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub price_yearly: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))", nullable)]
    pub promo_price_monthly: Option<Decimal>,
    pub highlight: bool,
    pub max_transactions_per_month: Option<i32>,
    pub has_ai_insights: bool,
    pub has_receipt_ocr: bool,
    pub has_pdf_reports: bool,
    pub has_csv_export: bool,
    pub has_custom_categories: bool,
    pub has_multi_user: bool,
    pub has_priority_support: bool,
    pub max_bank_accounts: Option<i32>,
    pub bank_sync_frequency: BankSyncFrequency,
    pub max_manual_syncs_per_day: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
