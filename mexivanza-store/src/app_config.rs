use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub payments: PaymentsConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub idempotency_ttl_seconds: u64,
    pub max_travelers: u32,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_multiplier_cap")]
    pub max_price_multiplier: f64,
}

fn default_rate_limit() -> i64 { 100 }
fn default_currency() -> String { "MXN".to_string() }
fn default_multiplier_cap() -> f64 { 3.0 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
    /// Shared secret the payment provider presents on webhooks
    pub webhook_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    /// `mock` or `remote`
    pub provider: String,
    /// Base URL of the serverless functions host
    pub functions_url: Option<String>,
    #[serde(default = "default_function_name")]
    pub function_name: String,
    pub functions_api_key: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

fn default_function_name() -> String { "create-travel-payment".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local, untracked overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. MEXIVANZA__SERVER__PORT=8080
            .add_source(config::Environment::with_prefix("MEXIVANZA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_rules_defaults() {
        let rules: BusinessRules = serde_json::from_value(serde_json::json!({
            "idempotency_ttl_seconds": 3600,
            "max_travelers": 12
        }))
        .unwrap();
        assert_eq!(rules.rate_limit_per_minute, 100);
        assert_eq!(rules.default_currency, "MXN");
        assert_eq!(rules.max_price_multiplier, 3.0);
    }

    #[test]
    fn test_payments_default_function_name() {
        let payments: PaymentsConfig = serde_json::from_value(serde_json::json!({
            "provider": "remote",
            "functions_url": "https://functions.example.com",
            "functions_api_key": null,
            "success_url": "https://mexivanza.com/payments?status=success",
            "cancel_url": "https://mexivanza.com/payments?status=cancelled"
        }))
        .unwrap();
        assert_eq!(payments.function_name, "create-travel-payment");
    }
}
