//! Cash-secured put selling.
//!
//! Sells a single out-of-the-money put at a target delta when the
//! underlying trades above its moving average, collects the premium, and
//! buys back at a fraction of max profit or lets the put run to expiry.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::{SelectionError, StrikeSelector};
use crate::backtest::{OptionLeg, Position, PositionStatus, StrategyKind};
use crate::data::{OptionType, PriceBar};
use crate::pricing::{BlackScholes, RealizedVolatility, VolatilityError};
use crate::risk::PositionSizer;
use crate::strategy::{simple_moving_average, BarContext, Strategy};

/// Put-selling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PutSellingConfig {
    /// Trend filter lookback: only sell puts with spot above this SMA.
    pub ma_period: usize,
    /// Target short put delta magnitude.
    pub put_delta: f64,
    /// Calendar days to expiration for new positions.
    pub days_to_expiry: u32,
    /// Fraction of equity risked per trade.
    pub risk_fraction: f64,
    /// Close early once this fraction of max profit is captured.
    pub profit_target: f64,
    /// Realized volatility lookback in bars.
    pub vol_lookback: usize,
}

impl Default for PutSellingConfig {
    fn default() -> Self {
        Self {
            ma_period: 20,
            put_delta: 0.30,
            days_to_expiry: 30,
            risk_fraction: 0.02,
            profit_target: 0.50,
            vol_lookback: 20,
        }
    }
}

pub struct PutSellingStrategy {
    config: PutSellingConfig,
    model: BlackScholes,
    selector: StrikeSelector,
    sizer: PositionSizer,
    volatility: RealizedVolatility,
}

impl PutSellingStrategy {
    pub fn new(
        config: PutSellingConfig,
        model: BlackScholes,
        selector: StrikeSelector,
        sizer: PositionSizer,
    ) -> Self {
        let volatility = RealizedVolatility::new(config.vol_lookback);
        Self {
            config,
            model,
            selector,
            sizer,
            volatility,
        }
    }
}

impl Strategy for PutSellingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PutSelling
    }

    fn estimate_volatility(&self, history: &[PriceBar]) -> Result<f64, VolatilityError> {
        self.volatility.estimate(history)
    }

    fn entry_signal(&self, ctx: &BarContext) -> bool {
        match simple_moving_average(ctx.history, self.config.ma_period) {
            Some(sma) => ctx.spot > sma,
            None => false,
        }
    }

    fn open_position(&self, ctx: &BarContext) -> Result<Option<Position>, SelectionError> {
        let time = f64::from(self.config.days_to_expiry) / 365.0;
        let candidate = self.selector.select(
            &self.model,
            ctx.spot,
            -self.config.put_delta,
            time,
            ctx.volatility,
            OptionType::Put,
        )?;

        // Worst case: assigned at the strike with the stock at zero,
        // offset by the premium collected.
        let max_loss_per_contract = (candidate.strike - candidate.premium) * 100.0;
        let contracts = self.sizer.contracts(
            ctx.equity,
            self.config.risk_fraction,
            max_loss_per_contract,
        );
        if contracts == 0 {
            return Ok(None);
        }

        let expiration = ctx.date + Duration::days(i64::from(self.config.days_to_expiry));
        let premium = Decimal::try_from(candidate.premium).unwrap_or_default();
        let strike = Decimal::try_from(candidate.strike).unwrap_or_default();
        let leg = OptionLeg {
            option_type: OptionType::Put,
            strike,
            expiration,
            contracts: -(contracts as i32),
            entry_price: premium,
            current_price: premium,
            entry_delta: candidate.delta,
            current_delta: candidate.delta,
        };

        let max_loss = Decimal::try_from(max_loss_per_contract * f64::from(contracts))
            .unwrap_or_default();
        Ok(Some(Position::open(
            ctx.ticker,
            self.kind(),
            ctx.date,
            expiration,
            ctx.bar.close,
            vec![leg],
            max_loss,
            None,
        )))
    }

    fn close_decision(&self, position: &Position) -> Option<PositionStatus> {
        if position.profit_fraction() >= self.config.profit_target {
            return Some(PositionStatus::ClosedProfit);
        }
        None
    }
}
