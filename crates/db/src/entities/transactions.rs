//! `SeaORM` Entity for transactions table.

use super::sea_orm_active_enums::TransactionKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub kind: TransactionKind,
    pub category: String,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub amount: Decimal,
    pub transaction_date: Date,
    pub is_taxable: bool,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub vat_amount: Decimal,
    pub rule_set_id: Option<Uuid>,
    pub recorded_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::businesses::Entity",
        from = "Column::TenantId",
        to = "super::businesses::Column::TenantId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Businesses,
    #[sea_orm(
        belongs_to = "super::tax_rule_sets::Entity",
        from = "Column::RuleSetId",
        to = "super::tax_rule_sets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    TaxRuleSets,
}

impl Related<super::businesses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Businesses.def()
    }
}

impl Related<super::tax_rule_sets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TaxRuleSets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
