//! Sentiment Trader - runs the news sentiment strategy against Alpaca
//!
//! 1. Loads configuration (defaults, trader.toml, TRADER_* env)
//! 2. Connects to the Alpaca trading and news APIs (paper or live)
//! 3. Picks the HTTP classifier if configured, else the lexicon classifier
//! 4. Runs one trading cycle per configured interval until Ctrl-C

use sentiment_trader::{
    AlpacaClient, HttpSentimentOracle, LexiconSentimentOracle, SentimentOracle, TraderConfig,
    TradingCycleController, TradingMode,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Sentiment Trader...");

    let config = TraderConfig::load()?;
    info!(
        "Strategy '{}' on {} | risk fraction {} | threshold {}",
        config.strategy.name,
        config.strategy.symbol,
        config.strategy.risk_fraction,
        config.strategy.confidence_threshold
    );

    match config.strategy.trading_mode {
        TradingMode::Paper => info!("📝 Running in PAPER TRADING mode"),
        TradingMode::Live => warn!("💰 Running in LIVE TRADING mode - REAL MONEY AT RISK"),
    }

    if config.broker.api_key_id.is_empty() || config.broker.api_secret_key.is_empty() {
        warn!("Broker credentials not set (TRADER_BROKER__API_KEY_ID / TRADER_BROKER__API_SECRET_KEY)");
    }

    let broker = AlpacaClient::new(&config.broker, config.strategy.trading_mode)?;
    let news = AlpacaClient::new(&config.broker, config.strategy.trading_mode)?;

    let oracle: Box<dyn SentimentOracle> = match &config.sentiment.endpoint {
        Some(endpoint) => Box::new(HttpSentimentOracle::new(
            endpoint,
            config.broker.request_timeout(),
        )?),
        None => {
            warn!("No sentiment endpoint configured, using lexicon classifier");
            Box::new(LexiconSentimentOracle::new())
        }
    };

    let controller = TradingCycleController::new(&config, broker, news, oracle)?;
    controller.run(config.strategy.cycle_interval()).await
}
