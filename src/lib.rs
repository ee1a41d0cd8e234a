pub mod analytics;
pub mod backtest;
pub mod config;
pub mod data;
pub mod metrics;
pub mod pricing;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use analytics::{SelectionError, StrikeCandidate, StrikeSelector, StrikeSelectorConfig};
pub use backtest::{
    BacktestEngine, BacktestResult, EngineConfig, EngineError, Position, PositionLedger,
    PositionStatus, StrategyKind,
};
pub use config::BacktestConfig;
pub use data::{BarLoader, OptionQuote, OptionType, PriceBar};
pub use metrics::{MetricsCalculator, PerformanceMetrics};
pub use pricing::{BlackScholes, PricingError, RealizedVolatility, VolatilityError};
pub use risk::{PositionSizer, PositionSizerConfig};
pub use strategy::{
    CoveredCallStrategy, IronCondorStrategy, PutSellingStrategy, Strategy,
};
