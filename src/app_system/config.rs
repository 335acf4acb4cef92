use std::str::FromStr;
use std::time::Duration;

use crate::domain::PricingPolicy;
use crate::notifications::DispatcherConfig;

/// Storefront configuration.
///
/// # Environment
///
/// | Variable | Default |
/// |----------|---------|
/// | STOREFRONT_CURRENCY | usd |
/// | STOREFRONT_TAX_RATE | 0.08 |
/// | STOREFRONT_SHIPPING_FLAT | 5.99 |
/// | STOREFRONT_FREE_SHIPPING_THRESHOLD | 50 |
/// | STOREFRONT_ACTOR_BUFFER | 32 |
/// | STOREFRONT_NOTIFY_TIMEOUT_MS | 30000 |
/// | STOREFRONT_NOTIFY_CONCURRENCY | 4 |
/// | STOREFRONT_NOTIFY_QUEUE | 64 |
///
/// Unset or unparsable values fall back to the default.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// ISO 4217 code, lower case.
    pub currency: String,
    pub pricing: PricingPolicy,
    /// Mailbox size of each store actor.
    pub actor_buffer: usize,
    pub notifications: DispatcherConfig,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            pricing: PricingPolicy::default(),
            actor_buffer: 32,
            notifications: DispatcherConfig::default(),
        }
    }
}

impl StorefrontConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            currency: lookup("STOREFRONT_CURRENCY")
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.currency),
            pricing: PricingPolicy {
                tax_rate: parse_or(&lookup, "STOREFRONT_TAX_RATE", defaults.pricing.tax_rate),
                shipping_flat: parse_or(&lookup, "STOREFRONT_SHIPPING_FLAT", defaults.pricing.shipping_flat),
                free_shipping_threshold: parse_or(
                    &lookup,
                    "STOREFRONT_FREE_SHIPPING_THRESHOLD",
                    defaults.pricing.free_shipping_threshold,
                ),
            },
            actor_buffer: parse_or(&lookup, "STOREFRONT_ACTOR_BUFFER", defaults.actor_buffer).max(1),
            notifications: DispatcherConfig {
                queue_size: parse_or(&lookup, "STOREFRONT_NOTIFY_QUEUE", defaults.notifications.queue_size),
                concurrency: parse_or(
                    &lookup,
                    "STOREFRONT_NOTIFY_CONCURRENCY",
                    defaults.notifications.concurrency,
                ),
                timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "STOREFRONT_NOTIFY_TIMEOUT_MS",
                    defaults.notifications.timeout.as_millis() as u64,
                )),
            },
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
