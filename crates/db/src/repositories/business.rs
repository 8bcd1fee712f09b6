//! Business profile repository.
//!
//! Profiles are created lazily on first use, together with the tenant's
//! free subscription.

use chrono::{DateTime, Utc};
use monetrax_core::tenant::{Business, BusinessUpdate};
use monetrax_shared::types::TenantId;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    IntoActiveModel, QuerySelect, Set, Statement,
};
use tracing::info;

use super::db_time;
use crate::entities::businesses;

/// Error types for business profile operations.
#[derive(Debug, thiserror::Error)]
pub enum BusinessError {
    /// Profile update failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Inserts the tenant's free subscription unless a live one exists.
const INSERT_FREE_SUBSCRIPTION_SQL: &str = r"
INSERT INTO subscriptions (tenant_id, tier, billing_cycle, status, current_period_start)
VALUES ($1, 'free', 'monthly', 'active', $2)
ON CONFLICT (tenant_id) WHERE status <> 'cancelled' DO NOTHING
";

impl From<businesses::Model> for Business {
    fn from(model: businesses::Model) -> Self {
        Self {
            tenant_id: TenantId::from_uuid(model.tenant_id),
            name: model.name,
            business_type: model.business_type,
            industry: model.industry,
            tax_id: model.tax_id,
            contact_identifier: model.contact_identifier,
            agent_tag: model.agent_tag,
        }
    }
}

/// Creates the tenant's profile and free subscription if missing.
pub(crate) async fn ensure_tenant<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    now: DateTime<Utc>,
) -> Result<(), DbErr> {
    let profile = businesses::ActiveModel {
        tenant_id: Set(tenant_id.into_inner()),
        ..Default::default()
    };
    businesses::Entity::insert(profile)
        .on_conflict(
            OnConflict::column(businesses::Column::TenantId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    ensure_free_subscription(conn, tenant_id, now).await
}

/// Gives an existing tenant a free subscription if it has no live one.
pub(crate) async fn ensure_free_subscription<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    now: DateTime<Utc>,
) -> Result<(), DbErr> {
    let now: sea_orm::prelude::DateTimeWithTimeZone = db_time(now).into();
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        INSERT_FREE_SUBSCRIPTION_SQL,
        [tenant_id.into_inner().into(), now.into()],
    ))
    .await?;
    Ok(())
}

/// Ensures the tenant exists and takes its row lock for the rest of the
/// surrounding transaction. All per-tenant writes serialize on this lock.
pub(crate) async fn lock_tenant<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    now: DateTime<Utc>,
) -> Result<businesses::Model, DbErr> {
    ensure_tenant(conn, tenant_id, now).await?;
    lock_existing_tenant(conn, tenant_id)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("business {tenant_id}")))
}

/// Locks a tenant that must already exist.
pub(crate) async fn lock_existing_tenant<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
) -> Result<Option<businesses::Model>, DbErr> {
    businesses::Entity::find_by_id(tenant_id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
}

/// Business profile repository.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    db: DatabaseConnection,
}

impl BusinessRepository {
    /// Creates a new business repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the tenant's profile, creating a blank one on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_or_create(&self, tenant_id: TenantId) -> Result<Business, BusinessError> {
        ensure_tenant(&self.db, tenant_id, Utc::now()).await?;
        let model = businesses::Entity::find_by_id(tenant_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("business {tenant_id}")))?;
        Ok(model.into())
    }

    /// Returns the tenant's profile if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, tenant_id: TenantId) -> Result<Option<Business>, DbErr> {
        Ok(businesses::Entity::find_by_id(tenant_id.into_inner())
            .one(&self.db)
            .await?
            .map(Business::from))
    }

    /// Applies a profile update.
    ///
    /// # Errors
    ///
    /// Returns `BusinessError::Validation` for oversized or blank fields.
    pub async fn update(
        &self,
        tenant_id: TenantId,
        update: BusinessUpdate,
    ) -> Result<Business, BusinessError> {
        let mut business = self.get_or_create(tenant_id).await?;
        update
            .apply(&mut business)
            .map_err(BusinessError::Validation)?;

        let model = businesses::Entity::find_by_id(tenant_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("business {tenant_id}")))?;

        let mut active = model.into_active_model();
        active.name = Set(business.name.clone());
        active.business_type = Set(business.business_type.clone());
        active.industry = Set(business.industry.clone());
        active.tax_id = Set(business.tax_id.clone());
        let updated = active.update(&self.db).await?;

        info!(tenant_id = %tenant_id, "Business profile updated");
        Ok(updated.into())
    }
}
