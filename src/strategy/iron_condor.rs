//! Iron condor: a four-leg, defined-risk short premium structure.
//!
//! Sells an OTM put and an OTM call at target deltas and buys wings a
//! configured percentage further out, collecting a net credit. Risk is
//! bounded by the wider wing spread. Closes at a profit target, at a
//! loss stop expressed as a multiple of the credit, or at expiry.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::{SelectionError, StrikeSelector};
use crate::backtest::{OptionLeg, Position, PositionStatus, StrategyKind};
use crate::data::{OptionType, PriceBar};
use crate::pricing::{BlackScholes, RealizedVolatility, VolatilityError};
use crate::risk::PositionSizer;
use crate::strategy::{BarContext, Strategy};

/// Iron condor parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IronCondorConfig {
    /// Target short put delta magnitude.
    pub put_delta: f64,
    /// Target short call delta magnitude.
    pub call_delta: f64,
    /// Put wing distance as a fraction of the short put strike.
    pub put_width: f64,
    /// Call wing distance as a fraction of the short call strike.
    pub call_width: f64,
    /// Calendar days to expiration for new positions.
    pub days_to_expiry: u32,
    /// Fraction of equity risked per trade.
    pub risk_fraction: f64,
    /// Close early once this fraction of max profit is captured.
    pub profit_target: f64,
    /// Close early once the loss reaches this multiple of the credit.
    pub loss_stop: f64,
    /// Realized volatility lookback in bars.
    pub vol_lookback: usize,
    /// ATR period for the blended volatility estimate.
    pub atr_period: usize,
}

impl Default for IronCondorConfig {
    fn default() -> Self {
        Self {
            put_delta: 0.30,
            call_delta: 0.30,
            put_width: 0.10,
            call_width: 0.10,
            days_to_expiry: 30,
            risk_fraction: 0.02,
            profit_target: 0.50,
            loss_stop: 2.0,
            vol_lookback: 20,
            atr_period: 14,
        }
    }
}

pub struct IronCondorStrategy {
    config: IronCondorConfig,
    model: BlackScholes,
    selector: StrikeSelector,
    sizer: PositionSizer,
    volatility: RealizedVolatility,
}

impl IronCondorStrategy {
    pub fn new(
        config: IronCondorConfig,
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

    fn leg(
        option_type: OptionType,
        strike: f64,
        expiration: chrono::NaiveDate,
        contracts: i32,
        price: f64,
        delta: f64,
    ) -> OptionLeg {
        let price = Decimal::try_from(price).unwrap_or_default();
        OptionLeg {
            option_type,
            strike: Decimal::try_from(strike).unwrap_or_default(),
            expiration,
            contracts,
            entry_price: price,
            current_price: price,
            entry_delta: delta,
            current_delta: delta,
        }
    }
}

impl Strategy for IronCondorStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::IronCondor
    }

    /// Condors are sensitive to the gap between realized and priced
    /// volatility, so the estimate blends log-return vol with an
    /// ATR-derived figure.
    fn estimate_volatility(&self, history: &[PriceBar]) -> Result<f64, VolatilityError> {
        self.volatility
            .estimate_blended(history, self.config.atr_period)
    }

    /// The structure is direction-neutral: no trend filter, any bar with
    /// a volatility estimate is a candidate.
    fn entry_signal(&self, _ctx: &BarContext) -> bool {
        true
    }

    fn open_position(&self, ctx: &BarContext) -> Result<Option<Position>, SelectionError> {
        let time = f64::from(self.config.days_to_expiry) / 365.0;

        let short_put = self.selector.select(
            &self.model,
            ctx.spot,
            -self.config.put_delta,
            time,
            ctx.volatility,
            OptionType::Put,
        )?;
        let short_call = self.selector.select(
            &self.model,
            ctx.spot,
            self.config.call_delta,
            time,
            ctx.volatility,
            OptionType::Call,
        )?;

        let put_wing = self
            .selector
            .round_to_increment(short_put.strike * (1.0 - self.config.put_width));
        let call_wing = self
            .selector
            .round_to_increment(short_call.strike * (1.0 + self.config.call_width));
        // Degenerate geometry (wing rounded onto the short strike, or the
        // short strikes crossing) means no condor exists at this spot.
        if put_wing >= short_put.strike
            || call_wing <= short_call.strike
            || short_put.strike >= short_call.strike
        {
            return Ok(None);
        }

        let put_wing_price =
            self.model
                .price(ctx.spot, put_wing, time, ctx.volatility, OptionType::Put)?;
        let put_wing_delta =
            self.model
                .delta(ctx.spot, put_wing, time, ctx.volatility, OptionType::Put)?;
        let call_wing_price =
            self.model
                .price(ctx.spot, call_wing, time, ctx.volatility, OptionType::Call)?;
        let call_wing_delta =
            self.model
                .delta(ctx.spot, call_wing, time, ctx.volatility, OptionType::Call)?;

        let net_credit_per_share =
            short_put.premium + short_call.premium - put_wing_price - call_wing_price;
        if net_credit_per_share <= 0.0 {
            return Ok(None);
        }

        let put_width = short_put.strike - put_wing;
        let call_width = call_wing - short_call.strike;
        let max_width = put_width.max(call_width);
        let max_loss_per_contract = (max_width - net_credit_per_share) * 100.0;
        if max_loss_per_contract <= 0.0 {
            return Ok(None);
        }

        let contracts = self.sizer.contracts(
            ctx.equity,
            self.config.risk_fraction,
            max_loss_per_contract,
        );
        if contracts == 0 {
            return Ok(None);
        }

        let expiration = ctx.date + Duration::days(i64::from(self.config.days_to_expiry));
        let short = -(contracts as i32);
        let long = contracts as i32;
        let legs = vec![
            Self::leg(
                OptionType::Put,
                put_wing,
                expiration,
                long,
                put_wing_price,
                put_wing_delta,
            ),
            Self::leg(
                OptionType::Put,
                short_put.strike,
                expiration,
                short,
                short_put.premium,
                short_put.delta,
            ),
            Self::leg(
                OptionType::Call,
                short_call.strike,
                expiration,
                short,
                short_call.premium,
                short_call.delta,
            ),
            Self::leg(
                OptionType::Call,
                call_wing,
                expiration,
                long,
                call_wing_price,
                call_wing_delta,
            ),
        ];

        let max_loss = Decimal::try_from(max_loss_per_contract * f64::from(contracts))
            .unwrap_or_default();
        Ok(Some(Position::open(
            ctx.ticker,
            self.kind(),
            ctx.date,
            expiration,
            ctx.bar.close,
            legs,
            max_loss,
            None,
        )))
    }

    fn close_decision(&self, position: &Position) -> Option<PositionStatus> {
        if position.profit_fraction() >= self.config.profit_target {
            return Some(PositionStatus::ClosedProfit);
        }

        let loss_limit = position.max_profit
            * Decimal::try_from(self.config.loss_stop).unwrap_or_default();
        if position.unrealized_pnl() <= -loss_limit {
            return Some(PositionStatus::ClosedLoss);
        }
        None
    }
}
