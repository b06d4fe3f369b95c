//! Configuration loading and typed config structures for the SmartShop
//! generator.
//!
//! The configuration lives in a YAML file (default `config/localhost.yaml`).
//! [`AppConfig`] mirrors the file as written; [`SmartShopConfig::validate`]
//! turns the raw `smartshop` section into [`SimulationParams`], the checked
//! and normalized values the tick loop runs on. Anything that fails
//! validation is fatal at startup.

use std::num::{NonZeroU64, NonZeroUsize};
use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use smartshop_types::Topic;

use crate::identity::IdSpace;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration file.
///
/// The `smartshop` section and every key in it are required; `nats` and
/// `seed` are optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Simulation parameters.
    pub smartshop: SmartShopConfig,

    /// Message bus settings.
    #[serde(default)]
    pub nats: NatsConfig,

    /// Seed for the simulation RNG. Unset means seeded from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl AppConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `NATS_URL` overrides `nats.url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or any
    /// error of [`AppConfig::parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.nats.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty document, or
    /// [`ConfigError::Yaml`] if the string is not valid YAML or a required
    /// key is missing.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Err(invalid("configuration is empty"));
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Raw `smartshop` section, as written in the file.
///
/// Every key is required. A missing key fails deserialization, so a
/// partial file never runs on silently substituted values. [`Default`]
/// gives the values shipped in `config/localhost.yaml`, for building
/// configs in code.
///
/// Integers are signed so that negative values surface as a validation
/// error naming the key rather than as a YAML type error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SmartShopConfig {
    /// Size of the SKU id space.
    pub max_skus: i64,

    /// Size of the shop id space.
    pub max_shops: i64,

    /// Size of the shopper id space.
    pub max_clients: i64,

    /// Maximum number of concurrently open sessions.
    pub max_simultaneous_sessions: i64,

    /// Target ticks per second.
    #[serde(alias = "max_transacions_per_second")]
    pub max_transactions_per_second: f64,

    /// Lower bound of units added/removed per basket mutation.
    pub add_sku_range_min: i64,

    /// Upper bound of units added/removed per basket mutation.
    pub add_sku_range_max: i64,

    /// Lower bound, in seconds, between two basket mutations of a session.
    pub update_basket_range_min: i64,

    /// Upper bound, in seconds, between two basket mutations of a session.
    pub update_basket_range_max: i64,

    /// Probability that a basket mutation removes units instead of adding.
    pub update_basket_remove_sku_probability: f64,

    /// Maximum quantity of a single SKU in one basket.
    pub max_basket_size: i64,

    /// Lower bound, in seconds, of a session's lifetime.
    pub checkout_range_min: i64,

    /// Upper bound, in seconds, of a session's lifetime.
    pub checkout_range_max: i64,
}

impl Default for SmartShopConfig {
    fn default() -> Self {
        Self {
            max_skus: 1000,
            max_shops: 10,
            max_clients: 1000,
            max_simultaneous_sessions: 50,
            max_transactions_per_second: 5.0,
            add_sku_range_min: 1,
            add_sku_range_max: 3,
            update_basket_range_min: 5,
            update_basket_range_max: 30,
            update_basket_remove_sku_probability: 0.25,
            max_basket_size: 10,
            checkout_range_min: 60,
            checkout_range_max: 300,
        }
    }
}

impl SmartShopConfig {
    /// Check every value and build the normalized [`SimulationParams`].
    ///
    /// Ranges are sorted so `min <= max`, whichever order they were
    /// written in.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for non-positive caps, negative
    /// range bounds, a non-positive or non-finite tick rate, or a removal
    /// probability outside `[0, 1]`.
    pub fn validate(&self) -> Result<SimulationParams, ConfigError> {
        let tps = self.max_transactions_per_second;
        if !tps.is_finite() || tps <= 0.0 {
            return Err(invalid(format!(
                "max_transactions_per_second must be a positive number, got {tps}"
            )));
        }

        let probability = self.update_basket_remove_sku_probability;
        if !(0.0..=1.0).contains(&probability) {
            return Err(invalid(format!(
                "update_basket_remove_sku_probability must be within [0, 1], got {probability}"
            )));
        }

        let sessions = positive("max_simultaneous_sessions", self.max_simultaneous_sessions)?;
        let max_simultaneous_sessions = usize::try_from(sessions.get())
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| invalid("max_simultaneous_sessions exceeds usize range"))?;

        Ok(SimulationParams {
            ids: IdSpace {
                max_skus: positive("max_skus", self.max_skus)?,
                max_shops: positive("max_shops", self.max_shops)?,
                max_clients: positive("max_clients", self.max_clients)?,
            },
            max_simultaneous_sessions,
            max_transactions_per_second: tps,
            add_sku_range: InclusiveRange::from_bounds(
                "add_sku_range",
                self.add_sku_range_min,
                self.add_sku_range_max,
            )?,
            update_basket_range: InclusiveRange::from_bounds(
                "update_basket_range",
                self.update_basket_range_min,
                self.update_basket_range_max,
            )?,
            checkout_range: InclusiveRange::from_bounds(
                "checkout_range",
                self.checkout_range_min,
                self.checkout_range_max,
            )?,
            remove_sku_probability: probability,
            max_basket_size: positive("max_basket_size", self.max_basket_size)?,
        })
    }
}

/// Message bus settings for the NATS sink.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL.
    #[serde(default = "default_nats_url")]
    pub url: String,

    /// Subject prefix for basket events.
    #[serde(default = "default_basket_subject")]
    pub basket_subject: String,

    /// Subject prefix for check-in events.
    #[serde(default = "default_checkin_subject")]
    pub checkin_subject: String,

    /// Subject prefix for check-out events.
    #[serde(default = "default_checkout_subject")]
    pub checkout_subject: String,

    /// Seconds between two background flushes of the client buffer.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

impl NatsConfig {
    /// Override the server URL with `NATS_URL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NATS_URL") {
            self.url = val;
        }
    }

    /// Subject prefix configured for `topic`.
    pub fn subject(&self, topic: Topic) -> &str {
        match topic {
            Topic::Basket => &self.basket_subject,
            Topic::Checkin => &self.checkin_subject,
            Topic::Checkout => &self.checkout_subject,
        }
    }

    /// Interval between background flushes.
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_nats_url(),
            basket_subject: default_basket_subject(),
            checkin_subject: default_checkin_subject(),
            checkout_subject: default_checkout_subject(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

/// Inclusive integer range with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InclusiveRange {
    min: u64,
    max: u64,
}

impl InclusiveRange {
    /// Build a range from two bounds given in any order.
    pub const fn new(a: u64, b: u64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    fn from_bounds(name: &str, a: i64, b: i64) -> Result<Self, ConfigError> {
        let lo = u64::try_from(a)
            .map_err(|_err| invalid(format!("{name}_min must not be negative, got {a}")))?;
        let hi = u64::try_from(b)
            .map_err(|_err| invalid(format!("{name}_max must not be negative, got {b}")))?;
        Ok(Self::new(lo, hi))
    }

    /// Lower bound.
    pub const fn min(&self) -> u64 {
        self.min
    }

    /// Upper bound.
    pub const fn max(&self) -> u64 {
        self.max
    }

    /// Uniformly draw a value in `[min, max]`.
    pub fn sample(&self, rng: &mut impl Rng) -> u64 {
        rng.random_range(self.min..=self.max)
    }
}

/// Validated parameters the simulation runs on.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    /// Id spaces for SKUs, shops and shoppers.
    pub ids: IdSpace,
    /// Concurrency cap on open sessions.
    pub max_simultaneous_sessions: NonZeroUsize,
    /// Target tick rate.
    pub max_transactions_per_second: f64,
    /// Units per basket mutation.
    pub add_sku_range: InclusiveRange,
    /// Seconds between basket mutations.
    pub update_basket_range: InclusiveRange,
    /// Session lifetime in seconds.
    pub checkout_range: InclusiveRange,
    /// Probability a mutation is a removal.
    pub remove_sku_probability: f64,
    /// Per-SKU quantity cap.
    pub max_basket_size: NonZeroU64,
}

impl SimulationParams {
    /// Target duration of one tick (`1 / max_transactions_per_second`).
    pub fn tick_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_transactions_per_second.recip())
            .unwrap_or(Duration::MAX)
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

fn positive(name: &str, value: i64) -> Result<NonZeroU64, ConfigError> {
    u64::try_from(value)
        .ok()
        .and_then(NonZeroU64::new)
        .ok_or_else(|| invalid(format!("{name} must be a positive integer, got {value}")))
}

// ---------------------------------------------------------------------------
// Default value functions for the optional `nats` section
// ---------------------------------------------------------------------------

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_basket_subject() -> String {
    "smartshop.basket".to_owned()
}

fn default_checkin_subject() -> String {
    "smartshop.checkin".to_owned()
}

fn default_checkout_subject() -> String {
    "smartshop.checkout".to_owned()
}

const fn default_flush_interval_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let params = SmartShopConfig::default().validate();
        assert!(params.is_ok(), "default config rejected: {params:?}");
        assert_eq!(NatsConfig::default().subject(Topic::Basket), "smartshop.basket");
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
seed: 11

smartshop:
  max_skus: 500
  max_shops: 4
  max_clients: 20
  max_simultaneous_sessions: 3
  max_transacions_per_second: 2.5
  add_sku_range_min: 4
  add_sku_range_max: 1
  update_basket_range_min: 2
  update_basket_range_max: 9
  update_basket_remove_sku_probability: 0.4
  max_basket_size: 6
  checkout_range_min: 30
  checkout_range_max: 30

nats:
  url: "nats://testhost:4222"
  basket_subject: "shop.basket"
  checkin_subject: "shop.in"
  checkout_subject: "shop.out"
  flush_interval_secs: 3
"#;

        let config = AppConfig::parse(yaml);
        assert!(config.is_ok(), "parse failed: {config:?}");
        let Ok(config) = config else { return };
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.nats.subject(Topic::Checkout), "shop.out");
        assert_eq!(config.nats.flush_interval(), Duration::from_secs(3));

        let params = config.smartshop.validate();
        assert!(params.is_ok());
        let Ok(params) = params else { return };
        assert_eq!(params.ids.max_skus.get(), 500);
        assert_eq!(params.max_simultaneous_sessions.get(), 3);
        // Legacy key spelling is accepted.
        assert!((params.max_transactions_per_second - 2.5).abs() < f64::EPSILON);
        // Reversed bounds are normalized.
        assert_eq!(params.add_sku_range, InclusiveRange::new(1, 4));
        assert_eq!(params.add_sku_range.min(), 1);
        assert_eq!(params.checkout_range.max(), 30);
    }

    const SMARTSHOP_SECTION: &str = "smartshop:
  max_skus: 7
  max_shops: 3
  max_clients: 9
  max_simultaneous_sessions: 2
  max_transactions_per_second: 1
  add_sku_range_min: 1
  add_sku_range_max: 2
  update_basket_range_min: 1
  update_basket_range_max: 5
  update_basket_remove_sku_probability: 0.5
  max_basket_size: 4
  checkout_range_min: 10
  checkout_range_max: 20
";

    #[test]
    fn nats_section_and_seed_are_optional() {
        let config = AppConfig::parse(SMARTSHOP_SECTION);
        assert!(config.is_ok(), "parse failed: {config:?}");
        let Ok(config) = config else { return };
        assert_eq!(config.smartshop.max_skus, 7);
        assert_eq!(config.nats, NatsConfig::default());
        assert_eq!(config.seed, None);
        assert!(config.smartshop.validate().is_ok());
    }

    #[test]
    fn missing_smartshop_key_is_rejected() {
        for key in [
            "max_skus",
            "max_simultaneous_sessions",
            "add_sku_range_min",
            "update_basket_range_max",
            "checkout_range_min",
            "max_basket_size",
        ] {
            let yaml: String = SMARTSHOP_SECTION
                .lines()
                .filter(|line| !line.trim_start().starts_with(&format!("{key}:")))
                .map(|line| format!("{line}\n"))
                .collect();
            let result = AppConfig::parse(&yaml);
            assert!(
                matches!(&result, Err(ConfigError::Yaml { source }) if source.to_string().contains(key)),
                "{key}: {result:?}"
            );
        }
    }

    #[test]
    fn partial_smartshop_section_is_rejected() {
        assert!(AppConfig::parse("smartshop:\n  max_skus: 7\n").is_err());
        assert!(AppConfig::parse("nats:\n  url: nats://x:4222\n").is_err());
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(matches!(
            AppConfig::parse("  \n"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn non_positive_caps_are_rejected() {
        for field in ["max_skus", "max_shops", "max_clients", "max_basket_size"] {
            let mut cfg = SmartShopConfig::default();
            match field {
                "max_skus" => cfg.max_skus = 0,
                "max_shops" => cfg.max_shops = -1,
                "max_clients" => cfg.max_clients = 0,
                _ => cfg.max_basket_size = 0,
            }
            let result = cfg.validate();
            assert!(
                matches!(&result, Err(ConfigError::Invalid { reason }) if reason.contains(field)),
                "{field}: {result:?}"
            );
        }
    }

    #[test]
    fn zero_sessions_rejected() {
        let cfg = SmartShopConfig {
            max_simultaneous_sessions: 0,
            ..SmartShopConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_rate_and_probability_rejected() {
        let cfg = SmartShopConfig {
            max_transactions_per_second: 0.0,
            ..SmartShopConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SmartShopConfig {
            max_transactions_per_second: f64::NAN,
            ..SmartShopConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SmartShopConfig {
            update_basket_remove_sku_probability: 1.5,
            ..SmartShopConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_range_bound_rejected() {
        let cfg = SmartShopConfig {
            checkout_range_min: -5,
            ..SmartShopConfig::default()
        };
        let result = cfg.validate();
        assert!(
            matches!(&result, Err(ConfigError::Invalid { reason }) if reason.contains("checkout_range_min"))
        );
    }

    #[test]
    fn tick_interval_is_reciprocal_of_rate() {
        let cfg = SmartShopConfig {
            max_transactions_per_second: 4.0,
            ..SmartShopConfig::default()
        };
        let params = cfg.validate().ok();
        assert_eq!(
            params.map(|p| p.tick_interval()),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn range_sample_stays_in_bounds() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::SmallRng::seed_from_u64(5);
        let range = InclusiveRange::new(9, 3);
        for _ in 0..100 {
            let v = range.sample(&mut rng);
            assert!((3..=9).contains(&v));
        }
        let fixed = InclusiveRange::new(0, 0);
        assert_eq!(fixed.sample(&mut rng), 0);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("localhost.yaml");
        if path.exists() {
            let config = AppConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
            let params = config.ok().map(|c| c.smartshop.validate());
            assert!(matches!(params, Some(Ok(_))));
        }
    }
}
