//! Tax rule set repository.
//!
//! Rule sets are append-only versions. Publishing validates the candidate
//! first, so an invalid configuration never reaches the calculator through
//! this path.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use monetrax_core::tax::{IncomeTaxBracket, RuleSetHistory, TaxError, TaxRuleSet, TaxRuleVersion};
use monetrax_shared::types::{RuleSetId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{error, info};

use super::db_time;
use crate::entities::tax_rule_sets;

/// Error types for tax rule operations.
#[derive(Debug, thiserror::Error)]
pub enum TaxRuleError {
    /// The rule set failed validation, or no rule set exists.
    #[error(transparent)]
    Rules(#[from] TaxError),

    /// A stored version cannot be decoded.
    #[error("Stored tax rule set {0} is unreadable: {1}")]
    Corrupt(RuleSetId, String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

fn decode(model: tax_rule_sets::Model) -> Result<TaxRuleVersion, TaxRuleError> {
    let id = RuleSetId::from_uuid(model.id);
    let corrupt = |e: serde_json::Error| TaxRuleError::Corrupt(id, e.to_string());

    let income_tax_brackets: Vec<IncomeTaxBracket> =
        serde_json::from_value(model.income_tax_brackets).map_err(corrupt)?;
    let exempt_categories: BTreeSet<String> =
        serde_json::from_value(model.exempt_categories).map_err(corrupt)?;
    let exempt_keywords: BTreeSet<String> =
        serde_json::from_value(model.exempt_keywords).map_err(corrupt)?;

    Ok(TaxRuleVersion {
        id,
        effective_from: model.effective_from.to_utc(),
        rules: TaxRuleSet {
            vat_rate: model.vat_rate,
            tax_free_threshold: model.tax_free_threshold,
            income_tax_brackets,
            exempt_categories,
            exempt_keywords,
        },
    })
}

/// The version in force at `at`; the oldest version when `at` predates all
/// of them.
pub(crate) async fn version_at<C: ConnectionTrait>(
    conn: &C,
    at: DateTime<Utc>,
) -> Result<TaxRuleVersion, TaxRuleError> {
    let in_force = tax_rule_sets::Entity::find()
        .filter(tax_rule_sets::Column::EffectiveFrom.lte(at))
        .order_by_desc(tax_rule_sets::Column::EffectiveFrom)
        .one(conn)
        .await?;

    let model = match in_force {
        Some(model) => model,
        None => tax_rule_sets::Entity::find()
            .order_by_asc(tax_rule_sets::Column::EffectiveFrom)
            .one(conn)
            .await?
            .ok_or(TaxError::NoRuleSet)?,
    };
    decode(model)
}

/// Tax rule set repository.
#[derive(Debug, Clone)]
pub struct TaxRuleRepository {
    db: DatabaseConnection,
}

impl TaxRuleRepository {
    /// Creates a new tax rule repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads every published version.
    ///
    /// # Errors
    ///
    /// Returns `TaxRuleError::Corrupt` if a stored version cannot be decoded.
    pub async fn history(&self) -> Result<RuleSetHistory, TaxRuleError> {
        let models = tax_rule_sets::Entity::find()
            .order_by_asc(tax_rule_sets::Column::EffectiveFrom)
            .all(&self.db)
            .await?;

        let versions = models
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| error!(error = %e, "Failed to decode tax rule history"))?;
        Ok(RuleSetHistory::new(versions))
    }

    /// The most recently published version.
    ///
    /// # Errors
    ///
    /// Returns `TaxError::NoRuleSet` when nothing has been published.
    pub async fn latest(&self) -> Result<TaxRuleVersion, TaxRuleError> {
        let model = tax_rule_sets::Entity::find()
            .order_by_desc(tax_rule_sets::Column::EffectiveFrom)
            .one(&self.db)
            .await?
            .ok_or(TaxError::NoRuleSet)?;
        decode(model)
    }

    /// Validates and publishes a new version effective from `now`.
    ///
    /// Earlier versions are untouched, so transactions already recorded keep
    /// the VAT computed under the rules in force at the time.
    ///
    /// # Errors
    ///
    /// Returns `TaxError::InvalidBracketConfig` for an invalid rule set.
    pub async fn publish(
        &self,
        rules: TaxRuleSet,
        published_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<TaxRuleVersion, TaxRuleError> {
        let rules = rules.validate()?;
        let id = RuleSetId::new();
        let effective_from = db_time(now);

        let to_json = |value: serde_json::Result<serde_json::Value>| {
            value.map_err(|e| TaxRuleError::Corrupt(id, e.to_string()))
        };

        tax_rule_sets::ActiveModel {
            id: Set(id.into_inner()),
            effective_from: Set(effective_from.into()),
            vat_rate: Set(rules.vat_rate),
            tax_free_threshold: Set(rules.tax_free_threshold),
            income_tax_brackets: Set(to_json(serde_json::to_value(&rules.income_tax_brackets))?),
            exempt_categories: Set(to_json(serde_json::to_value(&rules.exempt_categories))?),
            exempt_keywords: Set(to_json(serde_json::to_value(&rules.exempt_keywords))?),
            published_by: Set(Some(published_by.into_inner())),
            created_at: Set(effective_from.into()),
        }
        .insert(&self.db)
        .await?;

        info!(
            rule_set_id = %id,
            vat_rate = %rules.vat_rate,
            brackets = rules.income_tax_brackets.len(),
            "Published tax rule set"
        );

        Ok(TaxRuleVersion {
            id,
            effective_from,
            rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use uuid::Uuid;

    fn model(brackets: serde_json::Value) -> tax_rule_sets::Model {
        let at = Utc::now().into();
        tax_rule_sets::Model {
            id: Uuid::now_v7(),
            effective_from: at,
            vat_rate: dec!(0.075),
            tax_free_threshold: dec!(800000),
            income_tax_brackets: brackets,
            exempt_categories: json!(["medical"]),
            exempt_keywords: json!(["hospital"]),
            published_by: None,
            created_at: at,
        }
    }

    #[test]
    fn test_decode_seed_shape() {
        let version = decode(model(json!([
            {"upper_bound": "300000", "rate": "0.07"},
            {"upper_bound": "600000", "rate": "0.11"},
            {"upper_bound": null, "rate": "0.15"}
        ])))
        .unwrap();

        let brackets = &version.rules.income_tax_brackets;
        assert_eq!(brackets.len(), 3);
        assert_eq!(brackets[0].upper_bound, Some(dec!(300000)));
        assert_eq!(brackets[2].upper_bound, None);
        assert!(version.rules.check().is_ok());
        assert!(version.rules.exempt_categories.contains("medical"));
    }

    #[test]
    fn test_decode_rejects_malformed_brackets() {
        assert!(matches!(
            decode(model(json!({"not": "a list"}))),
            Err(TaxRuleError::Corrupt(_, _))
        ));
    }
}
