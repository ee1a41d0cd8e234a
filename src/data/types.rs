//! Core data types for the options-selling backtester.
//!
//! The backtester consumes plain daily OHLCV bars for the underlying and
//! prices every option theoretically, so the quote type carries the model
//! inputs that produced it rather than market bid/ask fields.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }
}

/// Greeks for an option contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    /// Daily theta (annual theta / 365).
    pub theta: f64,
    /// Vega per 1% change in volatility.
    pub vega: f64,
    /// Rho per 1% change in rates.
    pub rho: f64,
}

/// A single daily bar for the underlying.
///
/// Supplied externally in chronological order; never mutated by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl PriceBar {
    /// Close as f64 for model math.
    pub fn close_f64(&self) -> f64 {
        self.close.try_into().unwrap_or(0.0)
    }

    pub fn high_f64(&self) -> f64 {
        self.high.try_into().unwrap_or(0.0)
    }

    pub fn low_f64(&self) -> f64 {
        self.low.try_into().unwrap_or(0.0)
    }
}

/// A theoretical option quote at a point in time.
///
/// Ephemeral: recomputed on demand from the pricing model, never persisted.
/// Carries the inputs that produced it so callers can re-derive or audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    pub underlying_price: Decimal,
    /// Annualized volatility fed to the model.
    pub volatility: f64,
    /// Annualized risk-free rate fed to the model.
    pub risk_free_rate: f64,
    /// Model premium per share.
    pub theoretical_price: Decimal,
    pub greeks: Greeks,
}

impl OptionQuote {
    /// Intrinsic value per share at the quoted underlying price.
    pub fn intrinsic(&self) -> Decimal {
        match self.option_type {
            OptionType::Call => (self.underlying_price - self.strike).max(Decimal::ZERO),
            OptionType::Put => (self.strike - self.underlying_price).max(Decimal::ZERO),
        }
    }
}
