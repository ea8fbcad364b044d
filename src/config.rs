//! Strategy configuration
//!
//! Loaded once at startup from, in increasing priority:
//! 1. built-in defaults
//! 2. a TOML file (`TRADER_CONFIG`, `./trader.toml`, or `<config_dir>/sentiment-trader/trader.toml`)
//! 3. `TRADER_*` environment variables, `__` separating nested keys
//!    (e.g. `TRADER_BRACKETS__BUY_TAKE_PROFIT=1.25`)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::TraderError;

const ENV_PREFIX: &str = "TRADER";
const CONFIG_FILE_NAME: &str = "trader.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TraderConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub brackets: BracketMultipliers,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
}

impl TraderConfig {
    /// Load from the default file locations and the environment
    pub fn load() -> Result<Self, TraderError> {
        Self::load_from(default_config_path().as_deref())
    }

    /// Load from an explicit file (missing files are skipped) and the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self, TraderError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: TraderConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the decision core treats as preconditions
    pub fn validate(&self) -> Result<(), TraderError> {
        self.strategy.validate()?;
        self.brackets.validate()?;
        Ok(())
    }
}

/// Decision parameters for a single instrument
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StrategyConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Seconds between cycles (daily by default)
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
    /// Share of available cash committed to one entry, in (0, 1]
    #[serde(default = "default_risk_fraction")]
    pub risk_fraction: Decimal,
    /// Sentiment must be strictly above this to act. At 0.999 a reading of
    /// exactly 0.999 is still treated as not confident.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub trading_mode: TradingMode,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            symbol: default_symbol(),
            cycle_interval_secs: default_cycle_interval_secs(),
            risk_fraction: default_risk_fraction(),
            confidence_threshold: default_confidence_threshold(),
            trading_mode: TradingMode::default(),
        }
    }
}

impl StrategyConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    fn validate(&self) -> Result<(), TraderError> {
        if self.symbol.trim().is_empty() {
            return Err(TraderError::Config("symbol must not be empty".to_string()));
        }
        if self.cycle_interval_secs == 0 {
            return Err(TraderError::Config(
                "cycle_interval_secs must be positive".to_string(),
            ));
        }
        if self.risk_fraction <= Decimal::ZERO || self.risk_fraction > Decimal::ONE {
            return Err(TraderError::Config(format!(
                "risk_fraction must be in (0, 1], got {}",
                self.risk_fraction
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(TraderError::Config(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }
}

/// Take-profit and stop-loss multipliers applied to the last price
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct BracketMultipliers {
    #[serde(default = "default_buy_take_profit")]
    pub buy_take_profit: Decimal,
    #[serde(default = "default_buy_stop_loss")]
    pub buy_stop_loss: Decimal,
    #[serde(default = "default_sell_take_profit")]
    pub sell_take_profit: Decimal,
    #[serde(default = "default_sell_stop_loss")]
    pub sell_stop_loss: Decimal,
}

impl Default for BracketMultipliers {
    fn default() -> Self {
        Self {
            buy_take_profit: default_buy_take_profit(),
            buy_stop_loss: default_buy_stop_loss(),
            sell_take_profit: default_sell_take_profit(),
            sell_stop_loss: default_sell_stop_loss(),
        }
    }
}

impl BracketMultipliers {
    /// Exits must sit on the profitable and adverse sides of the entry
    pub fn validate(&self) -> Result<(), TraderError> {
        let one = Decimal::ONE;
        if self.buy_take_profit <= one {
            return Err(TraderError::Config(format!(
                "buy_take_profit must be above 1, got {}",
                self.buy_take_profit
            )));
        }
        if !(self.buy_stop_loss > Decimal::ZERO && self.buy_stop_loss < one) {
            return Err(TraderError::Config(format!(
                "buy_stop_loss must be in (0, 1), got {}",
                self.buy_stop_loss
            )));
        }
        if !(self.sell_take_profit > Decimal::ZERO && self.sell_take_profit < one) {
            return Err(TraderError::Config(format!(
                "sell_take_profit must be in (0, 1), got {}",
                self.sell_take_profit
            )));
        }
        if self.sell_stop_loss <= one {
            return Err(TraderError::Config(format!(
                "sell_stop_loss must be above 1, got {}",
                self.sell_stop_loss
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    #[default]
    Paper,
    Live,
}

/// Broker and market data endpoints
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BrokerConfig {
    /// Overrides the trading URL implied by the trading mode
    #[serde(default)]
    pub trading_url: Option<String>,
    #[serde(default = "default_data_url")]
    pub data_url: String,
    #[serde(default)]
    pub api_key_id: String,
    #[serde(default)]
    pub api_secret_key: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            trading_url: None,
            data_url: default_data_url(),
            api_key_id: String::new(),
            api_secret_key: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BrokerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn trading_url(&self, mode: TradingMode) -> String {
        match (&self.trading_url, mode) {
            (Some(url), _) => url.clone(),
            (None, TradingMode::Paper) => "https://paper-api.alpaca.markets".to_string(),
            (None, TradingMode::Live) => "https://api.alpaca.markets".to_string(),
        }
    }
}

/// Sentiment classifier selection
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct SentimentConfig {
    /// Remote classifier endpoint; the offline lexicon classifier is used when unset
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// First existing candidate among `TRADER_CONFIG`, `./trader.toml` and the user config dir
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("TRADER_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("sentiment-trader").join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

fn default_name() -> String { "mlstrat".to_string() }
fn default_symbol() -> String { "SPY".to_string() }
fn default_cycle_interval_secs() -> u64 { 24 * 60 * 60 }
fn default_risk_fraction() -> Decimal { Decimal::new(5, 1) }
fn default_confidence_threshold() -> f64 { 0.999 }
fn default_buy_take_profit() -> Decimal { Decimal::new(120, 2) }
fn default_buy_stop_loss() -> Decimal { Decimal::new(95, 2) }
fn default_sell_take_profit() -> Decimal { Decimal::new(80, 2) }
fn default_sell_stop_loss() -> Decimal { Decimal::new(105, 2) }
fn default_data_url() -> String { "https://data.alpaca.markets".to_string() }
fn default_request_timeout_secs() -> u64 { 30 }
