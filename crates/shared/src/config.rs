//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Billing webhook configuration.
    pub billing: BillingConfig,
    /// Readiness score weights and thresholds.
    #[serde(default)]
    pub readiness: ReadinessWeights,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT validation settings for tokens minted by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Shared secret used to verify token signatures.
    pub secret: String,
    /// Access token lifetime in seconds (used when minting test tokens).
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Billing webhook configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Shared secret the payment provider sends in `X-Webhook-Secret`.
    pub webhook_secret: String,
}

/// Weights and thresholds for the compliance readiness score.
///
/// Weights are relative; the score is normalised to 0-100.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReadinessWeights {
    /// Points for a completed business profile.
    pub profile_complete: u32,
    /// Points for a recorded tax ID.
    pub tax_id_present: u32,
    /// Points for reaching `min_transactions` in the period.
    pub minimum_transactions: u32,
    /// Points for a categorized share at or above `categorized_threshold`.
    pub categorized_ratio: u32,
    /// Points for at least one VAT-applicable transaction.
    pub vat_tagged: u32,
    /// Minimum transaction count for the period.
    pub min_transactions: u32,
    /// Minimum categorized share, as a fraction.
    pub categorized_threshold: Decimal,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            profile_complete: 20,
            tax_id_present: 20,
            minimum_transactions: 20,
            categorized_ratio: 20,
            vat_tagged: 20,
            min_transactions: 5,
            categorized_threshold: Decimal::new(8, 1),
        }
    }
}

impl ReadinessWeights {
    /// Sum of all signal weights.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.profile_complete
            + self.tax_id_present
            + self.minimum_transactions
            + self.categorized_ratio
            + self.vat_tagged
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("MONETRAX").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("MONETRAX__DATABASE__URL", Some("postgres://localhost/monetrax")),
                ("MONETRAX__JWT__SECRET", Some("secret")),
                ("MONETRAX__BILLING__WEBHOOK_SECRET", Some("whsec")),
                ("MONETRAX__SERVER__PORT", Some("9090")),
                ("MONETRAX__SERVER__HOST", Some("127.0.0.1")),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(config.database.url, "postgres://localhost/monetrax");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.jwt.access_token_expiry_secs, 900);
                assert_eq!(config.billing.webhook_secret, "whsec");
                assert_eq!(config.readiness, ReadinessWeights::default());
            },
        );
    }

    #[test]
    fn test_default_readiness_weights_sum_to_hundred() {
        let weights = ReadinessWeights::default();
        assert_eq!(weights.total(), 100);
        assert_eq!(weights.categorized_threshold, dec!(0.8));
    }
}
