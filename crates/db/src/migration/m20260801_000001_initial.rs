//! Initial database migration.
//!
//! Creates enums, tenant tables, the append-only tax rule history, the plan
//! catalog, usage counters, promo signups and the billing event ledger, then
//! seeds a default rule set and catalog.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TENANTS & AGENTS
        // ============================================================
        db.execute_unprepared(BUSINESSES_SQL).await?;
        db.execute_unprepared(AGENTS_SQL).await?;

        // ============================================================
        // PART 3: TAX CONFIGURATION & TRANSACTIONS
        // ============================================================
        db.execute_unprepared(TAX_RULE_SETS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 4: SUBSCRIPTIONS & USAGE
        // ============================================================
        db.execute_unprepared(SUBSCRIPTION_PLANS_SQL).await?;
        db.execute_unprepared(SUBSCRIPTIONS_SQL).await?;
        db.execute_unprepared(USAGE_COUNTERS_SQL).await?;
        db.execute_unprepared(PROMO_SIGNUPS_SQL).await?;
        db.execute_unprepared(BILLING_EVENTS_SQL).await?;
        db.execute_unprepared(BANK_ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        // ============================================================
        // PART 6: SEED DATA
        // ============================================================
        db.execute_unprepared(SEED_TAX_RULES_SQL).await?;
        db.execute_unprepared(SEED_PLANS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE transaction_kind AS ENUM ('income', 'expense');

CREATE TYPE subscription_tier AS ENUM ('free', 'starter', 'business', 'enterprise');

CREATE TYPE billing_cycle AS ENUM ('monthly', 'yearly');

CREATE TYPE subscription_status AS ENUM ('active', 'cancelling', 'cancelled');

CREATE TYPE bank_sync_frequency AS ENUM ('manual', 'daily', 'twice_daily', 'hourly');
";

const BUSINESSES_SQL: &str = r"
-- One business profile per tenant, created lazily on first use
CREATE TABLE businesses (
    tenant_id UUID PRIMARY KEY,
    name VARCHAR(200) NOT NULL DEFAULT '',
    business_type VARCHAR(200) NOT NULL DEFAULT '',
    industry VARCHAR(200) NOT NULL DEFAULT '',
    tax_id VARCHAR(200),
    -- Normalized email or phone of a tenant onboarded by an agent
    contact_identifier VARCHAR(255) UNIQUE,
    agent_tag VARCHAR(5),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_businesses_agent_tag ON businesses(agent_tag) WHERE agent_tag IS NOT NULL;
";

const AGENTS_SQL: &str = r"
CREATE TABLE agents (
    user_id UUID PRIMARY KEY,
    agent_tag VARCHAR(5) NOT NULL UNIQUE,
    promoted_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_agent_tag_format CHECK (agent_tag ~ '^[A-Z0-9]{2,5}$')
);
";

const TAX_RULE_SETS_SQL: &str = r"
-- Append-only: a new version is inserted for every edit
CREATE TABLE tax_rule_sets (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    effective_from TIMESTAMPTZ NOT NULL DEFAULT now(),
    vat_rate NUMERIC(7, 6) NOT NULL,
    tax_free_threshold NUMERIC(19, 2) NOT NULL,
    income_tax_brackets JSONB NOT NULL,
    exempt_categories JSONB NOT NULL DEFAULT '[]',
    exempt_keywords JSONB NOT NULL DEFAULT '[]',
    published_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_vat_rate CHECK (vat_rate >= 0 AND vat_rate <= 1),
    CONSTRAINT chk_threshold CHECK (tax_free_threshold >= 0),
    CONSTRAINT chk_brackets_array CHECK (jsonb_typeof(income_tax_brackets) = 'array')
);

CREATE INDEX idx_tax_rule_sets_effective ON tax_rule_sets(effective_from DESC);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES businesses(tenant_id) ON DELETE CASCADE,
    kind transaction_kind NOT NULL,
    category VARCHAR(100) NOT NULL,
    amount NUMERIC(19, 2) NOT NULL,
    transaction_date DATE NOT NULL,
    is_taxable BOOLEAN NOT NULL DEFAULT false,
    description TEXT NOT NULL DEFAULT '',
    -- VAT computed with the rule set in force when the row was recorded
    vat_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    rule_set_id UUID REFERENCES tax_rule_sets(id),
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_vat_non_negative CHECK (vat_amount >= 0),
    CONSTRAINT chk_category_present CHECK (length(trim(category)) > 0)
);

CREATE INDEX idx_transactions_tenant_date ON transactions(tenant_id, transaction_date DESC);
";

const SUBSCRIPTION_PLANS_SQL: &str = r"
-- Catalog entries; NULL limits mean unlimited
CREATE TABLE subscription_plans (
    tier subscription_tier PRIMARY KEY,
    name VARCHAR(50) NOT NULL,
    price_monthly NUMERIC(19, 2) NOT NULL,
    price_yearly NUMERIC(19, 2) NOT NULL,
    promo_price_monthly NUMERIC(19, 2),
    highlight BOOLEAN NOT NULL DEFAULT false,
    max_transactions_per_month INTEGER,
    has_ai_insights BOOLEAN NOT NULL DEFAULT false,
    has_receipt_ocr BOOLEAN NOT NULL DEFAULT false,
    has_pdf_reports BOOLEAN NOT NULL DEFAULT false,
    has_csv_export BOOLEAN NOT NULL DEFAULT false,
    has_custom_categories BOOLEAN NOT NULL DEFAULT false,
    has_multi_user BOOLEAN NOT NULL DEFAULT false,
    has_priority_support BOOLEAN NOT NULL DEFAULT false,
    max_bank_accounts INTEGER,
    bank_sync_frequency bank_sync_frequency NOT NULL DEFAULT 'manual',
    max_manual_syncs_per_day INTEGER,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_prices CHECK (price_monthly >= 0 AND price_yearly >= 0),
    CONSTRAINT chk_limits CHECK (
        COALESCE(max_transactions_per_month, 0) >= 0
        AND COALESCE(max_bank_accounts, 0) >= 0
        AND COALESCE(max_manual_syncs_per_day, 0) >= 0
    )
);
";

const SUBSCRIPTIONS_SQL: &str = r"
CREATE TABLE subscriptions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES businesses(tenant_id) ON DELETE CASCADE,
    tier subscription_tier NOT NULL DEFAULT 'free',
    billing_cycle billing_cycle NOT NULL DEFAULT 'monthly',
    status subscription_status NOT NULL DEFAULT 'active',
    current_period_start TIMESTAMPTZ NOT NULL DEFAULT now(),
    current_period_end TIMESTAMPTZ,
    had_paid_subscription BOOLEAN NOT NULL DEFAULT false,
    promo_price NUMERIC(19, 2),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_free_has_no_period_end CHECK ((tier = 'free') = (current_period_end IS NULL)),
    CONSTRAINT chk_period_order CHECK (current_period_end IS NULL OR current_period_end > current_period_start)
);

-- At most one live subscription per tenant
CREATE UNIQUE INDEX uq_subscriptions_live_tenant ON subscriptions(tenant_id) WHERE status <> 'cancelled';

CREATE INDEX idx_subscriptions_tenant ON subscriptions(tenant_id, created_at DESC);
";

const USAGE_COUNTERS_SQL: &str = r"
CREATE TABLE usage_counters (
    tenant_id UUID NOT NULL REFERENCES businesses(tenant_id) ON DELETE CASCADE,
    period_start TIMESTAMPTZ NOT NULL,
    transactions_used INTEGER NOT NULL DEFAULT 0,
    manual_syncs_used_today INTEGER NOT NULL DEFAULT 0,
    sync_day DATE,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (tenant_id, period_start),
    CONSTRAINT chk_usage_non_negative CHECK (transactions_used >= 0 AND manual_syncs_used_today >= 0)
);
";

const PROMO_SIGNUPS_SQL: &str = r"
CREATE TABLE promo_signups (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    -- Exactly one promotion per normalized email or phone, ever
    identifier VARCHAR(255) NOT NULL,
    tenant_id UUID NOT NULL REFERENCES businesses(tenant_id) ON DELETE CASCADE,
    agent_user_id UUID NOT NULL,
    agent_tag VARCHAR(5) NOT NULL,
    tier subscription_tier NOT NULL,
    promo_price NUMERIC(19, 2) NOT NULL,
    savings NUMERIC(19, 2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_promo_not_free CHECK (tier <> 'free'),
    CONSTRAINT chk_savings_non_negative CHECK (savings >= 0)
);

CREATE UNIQUE INDEX uq_promo_signups_identifier ON promo_signups(identifier);

CREATE INDEX idx_promo_signups_agent ON promo_signups(agent_user_id, created_at DESC);
";

const BILLING_EVENTS_SQL: &str = r"
-- Idempotency ledger for payment provider events
CREATE TABLE billing_events (
    event_id VARCHAR(255) PRIMARY KEY,
    tenant_id UUID NOT NULL,
    event_type VARCHAR(50) NOT NULL,
    payload JSONB NOT NULL,
    outcome VARCHAR(20) NOT NULL DEFAULT 'applied',
    occurred_at TIMESTAMPTZ NOT NULL,
    received_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_outcome CHECK (outcome IN ('applied', 'stale'))
);

CREATE INDEX idx_billing_events_tenant ON billing_events(tenant_id, occurred_at DESC);
";

const BANK_ACCOUNTS_SQL: &str = r"
CREATE TABLE bank_accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    tenant_id UUID NOT NULL REFERENCES businesses(tenant_id) ON DELETE CASCADE,
    bank_name VARCHAR(100) NOT NULL,
    account_name VARCHAR(200) NOT NULL,
    account_mask VARCHAR(4) NOT NULL,
    last_synced_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_bank_accounts_tenant ON bank_accounts(tenant_id);
";

const TRIGGERS_SQL: &str = r"
CREATE OR REPLACE FUNCTION touch_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at := now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_businesses_updated_at
BEFORE UPDATE ON businesses
FOR EACH ROW EXECUTE FUNCTION touch_updated_at();

CREATE TRIGGER trg_subscriptions_updated_at
BEFORE UPDATE ON subscriptions
FOR EACH ROW EXECUTE FUNCTION touch_updated_at();

CREATE TRIGGER trg_subscription_plans_updated_at
BEFORE UPDATE ON subscription_plans
FOR EACH ROW EXECUTE FUNCTION touch_updated_at();

CREATE TRIGGER trg_usage_counters_updated_at
BEFORE UPDATE ON usage_counters
FOR EACH ROW EXECUTE FUNCTION touch_updated_at();

-- ============================================================
-- FUNCTION: prevent_had_paid_reset
-- had_paid_subscription is sticky once true
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_had_paid_reset()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.had_paid_subscription AND NOT NEW.had_paid_subscription THEN
        RAISE EXCEPTION 'had_paid_subscription cannot be reset';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_subscriptions_had_paid
BEFORE UPDATE ON subscriptions
FOR EACH ROW EXECUTE FUNCTION prevent_had_paid_reset();

-- ============================================================
-- FUNCTION: prevent_usage_decrease
-- transactions_used never goes down within a period
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_usage_decrease()
RETURNS TRIGGER AS $$
BEGIN
    IF NEW.transactions_used < OLD.transactions_used THEN
        RAISE EXCEPTION 'transactions_used cannot decrease';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_usage_counters_monotonic
BEFORE UPDATE ON usage_counters
FOR EACH ROW EXECUTE FUNCTION prevent_usage_decrease();

-- Tax rule versions are never edited in place
CREATE OR REPLACE FUNCTION prevent_rule_set_update()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'tax rule sets are append-only';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_tax_rule_sets_append_only
BEFORE UPDATE ON tax_rule_sets
FOR EACH ROW EXECUTE FUNCTION prevent_rule_set_update();
";

const SEED_TAX_RULES_SQL: &str = r#"
-- ============================================================
-- SEED: Default tax rules (configuration, not statute)
-- ============================================================
INSERT INTO tax_rule_sets (
    effective_from, vat_rate, tax_free_threshold,
    income_tax_brackets, exempt_categories, exempt_keywords
) VALUES (
    '2000-01-01T00:00:00Z',
    0.075,
    800000,
    '[{"upper_bound": "300000", "rate": "0.07"},
      {"upper_bound": "600000", "rate": "0.11"},
      {"upper_bound": null, "rate": "0.15"}]',
    '["medical", "education", "basic food", "healthcare", "exports"]',
    '["hospital", "clinic", "pharmacy", "school fees", "tuition"]'
);
"#;

const SEED_PLANS_SQL: &str = r"
-- ============================================================
-- SEED: Subscription catalog
-- Prices and quotas are editable by operators afterwards
-- ============================================================
INSERT INTO subscription_plans (
    tier, name, price_monthly, price_yearly, promo_price_monthly, highlight,
    max_transactions_per_month,
    has_ai_insights, has_receipt_ocr, has_pdf_reports, has_csv_export,
    has_custom_categories, has_multi_user, has_priority_support,
    max_bank_accounts, bank_sync_frequency, max_manual_syncs_per_day
) VALUES
(
    'free', 'Free', 0, 0, NULL, false,
    50,
    false, false, false, false, false, false, false,
    0, 'manual', 0
),
(
    'starter', 'Starter', 3000, 30000, 1500, false,
    200,
    false, true, true, true, false, false, false,
    1, 'daily', 3
),
(
    'business', 'Business', 7500, 75000, 5000, true,
    1000,
    true, true, true, true, true, false, false,
    3, 'twice_daily', 10
),
(
    'enterprise', 'Enterprise', 20000, 200000, 15000, false,
    NULL,
    true, true, true, true, true, true, true,
    NULL, 'hourly', NULL
);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS bank_accounts CASCADE;
DROP TABLE IF EXISTS billing_events CASCADE;
DROP TABLE IF EXISTS promo_signups CASCADE;
DROP TABLE IF EXISTS usage_counters CASCADE;
DROP TABLE IF EXISTS subscriptions CASCADE;
DROP TABLE IF EXISTS subscription_plans CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS tax_rule_sets CASCADE;
DROP TABLE IF EXISTS agents CASCADE;
DROP TABLE IF EXISTS businesses CASCADE;

DROP FUNCTION IF EXISTS prevent_rule_set_update CASCADE;
DROP FUNCTION IF EXISTS prevent_usage_decrease CASCADE;
DROP FUNCTION IF EXISTS prevent_had_paid_reset CASCADE;
DROP FUNCTION IF EXISTS touch_updated_at CASCADE;

DROP TYPE IF EXISTS bank_sync_frequency CASCADE;
DROP TYPE IF EXISTS subscription_status CASCADE;
DROP TYPE IF EXISTS billing_cycle CASCADE;
DROP TYPE IF EXISTS subscription_tier CASCADE;
DROP TYPE IF EXISTS transaction_kind CASCADE;
";
