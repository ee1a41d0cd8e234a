//! Option position lifecycle: legs, mark-to-model, settlement.
//!
//! A position is one strategy instance of 1-4 legs sharing an expiry.
//! Open positions are re-valued each bar through the pricing model
//! (mark-to-model) since no market quotes exist; at expiry each leg
//! settles at intrinsic value. A position transitions to a closed status
//! exactly once.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::OptionType;
use crate::pricing::{BlackScholes, PricingError};

/// Which strategy opened a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    PutSelling,
    IronCondor,
    CoveredCall,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PutSelling => "put-selling",
            Self::IronCondor => "iron-condor",
            Self::CoveredCall => "covered-call",
        }
    }
}

/// Status of a position. Closed states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    /// Closed early at the profit target.
    ClosedProfit,
    /// Settled at expiration.
    ClosedExpired,
    /// Closed early at a loss stop.
    ClosedLoss,
}

impl PositionStatus {
    pub fn is_closed(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// One option leg. Quantity sign is fixed at creation: negative = short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionLeg {
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    /// Signed contract count (negative = short).
    pub contracts: i32,
    /// Entry premium per share.
    pub entry_price: Decimal,
    /// Latest model premium per share.
    pub current_price: Decimal,
    pub entry_delta: f64,
    pub current_delta: f64,
}

impl OptionLeg {
    pub fn is_short(&self) -> bool {
        self.contracts < 0
    }

    /// Intrinsic value per share at a given spot.
    pub fn intrinsic(&self, spot: Decimal) -> Decimal {
        match self.option_type {
            OptionType::Call => (spot - self.strike).max(Decimal::ZERO),
            OptionType::Put => (self.strike - spot).max(Decimal::ZERO),
        }
    }

    /// Unrealized P&L per share: shorts profit as price falls.
    pub fn unrealized_pnl(&self) -> Decimal {
        if self.is_short() {
            self.entry_price - self.current_price
        } else {
            self.current_price - self.entry_price
        }
    }
}

/// An owned share lot a covered call is written against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShareLot {
    pub shares: u32,
    /// Cost per share.
    pub cost_basis: Decimal,
}

impl ShareLot {
    pub fn value_at(&self, spot: Decimal) -> Decimal {
        spot * Decimal::from(self.shares)
    }

    pub fn cost(&self) -> Decimal {
        self.cost_basis * Decimal::from(self.shares)
    }
}

/// A strategy instance composed of 1-4 legs sharing one expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: u64,
    pub ticker: String,
    pub kind: StrategyKind,
    pub entry_date: NaiveDate,
    pub expiration: NaiveDate,
    /// Underlying close at entry.
    pub entry_spot: Decimal,
    pub legs: Vec<OptionLeg>,
    /// Net premium received at entry, in currency units (credit > 0).
    pub net_credit: Decimal,
    /// Maximum theoretical profit (the net credit for short premium).
    pub max_profit: Decimal,
    /// Maximum theoretical loss, in currency units.
    pub max_loss: Decimal,
    /// Current cost to close all legs, in currency units.
    pub current_value: Decimal,
    pub status: PositionStatus,
    pub exit_date: Option<NaiveDate>,
    pub realized_pnl: Option<Decimal>,
    /// Share lot a covered call is written against.
    pub share_lot: Option<ShareLot>,
}

impl Position {
    fn new_id() -> u64 {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        COUNTER.fetch_add(1, Ordering::Relaxed)
    }

    /// Open a new position. Net credit and max profit are derived from
    /// the legs; max loss is strategy-specific and supplied by the caller.
    pub fn open(
        ticker: &str,
        kind: StrategyKind,
        entry_date: NaiveDate,
        expiration: NaiveDate,
        entry_spot: Decimal,
        legs: Vec<OptionLeg>,
        max_loss: Decimal,
        share_lot: Option<ShareLot>,
    ) -> Self {
        debug_assert!(!legs.is_empty() && legs.len() <= 4);
        debug_assert!(legs.iter().all(|l| l.expiration == expiration));

        let net_credit = -legs
            .iter()
            .map(|l| l.entry_price * Decimal::from(l.contracts))
            .sum::<Decimal>()
            * Decimal::from(100);

        Self {
            id: Self::new_id(),
            ticker: ticker.to_string(),
            kind,
            entry_date,
            expiration,
            entry_spot,
            // Cost to close at entry prices equals the credit received.
            current_value: net_credit,
            net_credit,
            max_profit: net_credit,
            max_loss,
            legs,
            status: PositionStatus::Open,
            exit_date: None,
            realized_pnl: None,
            share_lot,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    pub fn is_expired(&self, date: NaiveDate) -> bool {
        date >= self.expiration
    }

    pub fn days_to_expiry(&self, date: NaiveDate) -> i64 {
        (self.expiration - date).num_days()
    }

    /// Total contracts across legs, unsigned.
    pub fn total_contracts(&self) -> i32 {
        self.legs.iter().map(|l| l.contracts.abs()).sum()
    }

    /// Net delta of the position in share-equivalents (sum of the legs).
    pub fn net_delta(&self) -> f64 {
        self.legs
            .iter()
            .map(|l| l.current_delta * l.contracts as f64 * 100.0)
            .sum()
    }

    /// Unrealized P&L: credit received minus current cost to close.
    pub fn unrealized_pnl(&self) -> Decimal {
        self.net_credit - self.current_value
    }

    /// Captured profit as a fraction of max theoretical profit.
    pub fn profit_fraction(&self) -> f64 {
        if self.max_profit <= Decimal::ZERO {
            return 0.0;
        }
        let pnl: f64 = self.unrealized_pnl().try_into().unwrap_or(0.0);
        let max: f64 = self.max_profit.try_into().unwrap_or(1.0);
        pnl / max
    }

    /// Re-value every leg through the model at the current spot and vol.
    pub fn mark_to_model(
        &mut self,
        model: &BlackScholes,
        spot: f64,
        vol: f64,
        date: NaiveDate,
    ) -> Result<(), PricingError> {
        for leg in &mut self.legs {
            let time = (leg.expiration - date).num_days() as f64 / 365.0;
            let strike: f64 = leg.strike.try_into().unwrap_or(0.0);
            let price = model.price(spot, strike, time, vol, leg.option_type)?;
            let delta = model.delta(spot, strike, time, vol, leg.option_type)?;
            leg.current_price = Decimal::try_from(price).unwrap_or_default();
            leg.current_delta = delta;
        }
        self.recompute_value();
        Ok(())
    }

    /// Settle every leg at intrinsic value and close as expired.
    pub fn settle_at_expiry(&mut self, spot: Decimal, date: NaiveDate) {
        for leg in &mut self.legs {
            leg.current_price = leg.intrinsic(spot);
            leg.current_delta = 0.0;
        }
        self.recompute_value();
        self.close(date, PositionStatus::ClosedExpired);
    }

    /// Settle an in-the-money covered call by delivering the share lot
    /// at the strike. The written call expires against the shares, so
    /// the position books the full call credit plus the share gain over
    /// cost basis instead of an option-leg loss.
    pub fn settle_called_away(&mut self, spot: Decimal, date: NaiveDate) {
        debug_assert!(self.is_open(), "position {} closed twice", self.id);
        for leg in &mut self.legs {
            leg.current_price = leg.intrinsic(spot);
            leg.current_delta = 0.0;
        }
        self.recompute_value();

        let share_gain = self
            .share_lot
            .zip(self.legs.first().map(|l| l.strike))
            .map(|(lot, strike)| (strike - lot.cost_basis) * Decimal::from(lot.shares))
            .unwrap_or_default();
        self.status = PositionStatus::ClosedExpired;
        self.exit_date = Some(date);
        self.realized_pnl = Some(self.net_credit + share_gain);
    }

    /// Close at the current marks. Transitions exactly once.
    pub fn close(&mut self, date: NaiveDate, status: PositionStatus) {
        debug_assert!(self.is_open(), "position {} closed twice", self.id);
        debug_assert!(status.is_closed());
        self.status = status;
        self.exit_date = Some(date);
        self.realized_pnl = Some(self.net_credit - self.current_value);
    }

    /// Cost to close all legs at their current prices.
    fn recompute_value(&mut self) {
        self.current_value = -self
            .legs
            .iter()
            .map(|l| l.current_price * Decimal::from(l.contracts))
            .sum::<Decimal>()
            * Decimal::from(100);
    }

    pub fn days_held(&self) -> Option<i64> {
        self.exit_date.map(|exit| (exit - self.entry_date).num_days())
    }
}
