//! `SeaORM` Entity for tax_rule_sets table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tax_rule_sets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub effective_from: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Decimal(Some((7, 6)))")]
    pub vat_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub tax_free_threshold: Decimal,
    #[sea_orm(column_type = "JsonBinary")]
    pub income_tax_brackets: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub exempt_categories: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub exempt_keywords: Json,
    pub published_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
