//! `SeaORM` Entity for promo_signups table.

use super::sea_orm_active_enums::SubscriptionTier;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "promo_signups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub identifier: String,
    pub tenant_id: Uuid,
    pub agent_user_id: Uuid,
    pub agent_tag: String,
    pub tier: SubscriptionTier,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub promo_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub savings: Decimal,
    pub created_at: DateTimeWithTimeZone,
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
}

impl Related<super::businesses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Businesses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
