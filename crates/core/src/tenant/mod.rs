//! Tenant profile and per-request tenant context.

use monetrax_shared::Role;
use monetrax_shared::types::{TenantId, UserId};
use serde::{Deserialize, Serialize};

/// Maximum length of free-text profile fields.
pub const MAX_PROFILE_FIELD_LEN: usize = 200;

/// The business behind a tenant. One per tenant, created lazily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Trading name.
    pub name: String,
    /// Legal form, e.g. sole proprietorship.
    pub business_type: String,
    /// Industry sector.
    pub industry: String,
    /// Tax identification number, if registered.
    pub tax_id: Option<String>,
    /// Normalized email or phone used for promo signups.
    pub contact_identifier: Option<String>,
    /// Initials of the agent who onboarded the tenant.
    pub agent_tag: Option<String>,
}

impl Business {
    /// A blank profile for a tenant seen for the first time.
    #[must_use]
    pub fn blank(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            name: String::new(),
            business_type: String::new(),
            industry: String::new(),
            tax_id: None,
            contact_identifier: None,
            agent_tag: None,
        }
    }

    /// Returns true when name, business type and industry are all filled in.
    #[must_use]
    pub fn is_profile_complete(&self) -> bool {
        [&self.name, &self.business_type, &self.industry]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    /// Returns true when a non-blank tax ID is recorded.
    #[must_use]
    pub fn has_tax_id(&self) -> bool {
        self.tax_id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BusinessUpdate {
    /// New trading name.
    pub name: Option<String>,
    /// New legal form.
    pub business_type: Option<String>,
    /// New industry.
    pub industry: Option<String>,
    /// New tax ID; an empty string clears it.
    pub tax_id: Option<String>,
}

impl BusinessUpdate {
    /// Applies the update, trimming values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first field that exceeds
    /// `MAX_PROFILE_FIELD_LEN`.
    pub fn apply(self, business: &mut Business) -> Result<(), String> {
        fn field(value: String, name: &str) -> Result<String, String> {
            let value = value.trim().to_string();
            if value.chars().count() > MAX_PROFILE_FIELD_LEN {
                return Err(format!("{name} exceeds {MAX_PROFILE_FIELD_LEN} characters"));
            }
            Ok(value)
        }

        if let Some(name) = self.name {
            business.name = field(name, "name")?;
        }
        if let Some(business_type) = self.business_type {
            business.business_type = field(business_type, "business_type")?;
        }
        if let Some(industry) = self.industry {
            business.industry = field(industry, "industry")?;
        }
        if let Some(tax_id) = self.tax_id {
            let tax_id = field(tax_id, "tax_id")?;
            business.tax_id = (!tax_id.is_empty()).then_some(tax_id);
        }
        Ok(())
    }
}

/// Identity of the caller, supplied per request by the identity collaborator.
///
/// Passed explicitly into every operation; nothing about the current tenant
/// is held in ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    /// Authenticated user.
    pub user_id: UserId,
    /// Tenant the user acts for.
    pub tenant_id: TenantId,
    /// Caller's role.
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_profile_incomplete() {
        let business = Business::blank(TenantId::new());
        assert!(!business.is_profile_complete());
        assert!(!business.has_tax_id());
    }

    #[test]
    fn test_update_trims_and_clears_tax_id() {
        let mut business = Business::blank(TenantId::new());
        BusinessUpdate {
            name: Some("  Ada Foods ".into()),
            business_type: Some("Limited company".into()),
            industry: Some("Retail".into()),
            tax_id: Some("TIN-123".into()),
        }
        .apply(&mut business)
        .unwrap();
        assert_eq!(business.name, "Ada Foods");
        assert!(business.is_profile_complete());
        assert!(business.has_tax_id());

        BusinessUpdate {
            tax_id: Some("  ".into()),
            ..Default::default()
        }
        .apply(&mut business)
        .unwrap();
        assert_eq!(business.tax_id, None);
        assert_eq!(business.name, "Ada Foods");
    }

    #[test]
    fn test_update_rejects_oversized_field() {
        let mut business = Business::blank(TenantId::new());
        let result = BusinessUpdate {
            industry: Some("x".repeat(MAX_PROFILE_FIELD_LEN + 1)),
            ..Default::default()
        }
        .apply(&mut business);
        assert!(result.is_err());
    }
}
