//! Theoretical option pricing.
//!
//! Black-Scholes closed-form pricing plus the realized-volatility
//! estimator that feeds it. These two are the only source of option
//! prices in the backtester; keeping the estimator behind its own type
//! means a real implied-volatility surface can replace it later without
//! touching strike selection or sizing.

pub mod black_scholes;
pub mod volatility;

pub use black_scholes::{BlackScholes, PricingError};
pub use volatility::{
    average_true_range, RealizedVolatility, VolatilityError, TRADING_DAYS_PER_YEAR,
};
