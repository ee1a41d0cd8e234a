//! Covered calls written against an owned share lot.
//!
//! One short call per 100 shares held. The engine owns the share lot and
//! handles assignment at expiry; this strategy only decides when to write
//! and when to buy the call back.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::{SelectionError, StrikeSelector};
use crate::backtest::{OptionLeg, Position, PositionStatus, StrategyKind};
use crate::data::{OptionType, PriceBar};
use crate::pricing::{BlackScholes, RealizedVolatility, VolatilityError};
use crate::strategy::{BarContext, Strategy};

/// Covered-call parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoveredCallConfig {
    /// Target short call delta magnitude.
    pub call_delta: f64,
    /// Calendar days to expiration for new positions.
    pub days_to_expiry: u32,
    /// Close early once this fraction of max profit is captured.
    pub profit_target: f64,
    /// Realized volatility lookback in bars.
    pub vol_lookback: usize,
}

impl Default for CoveredCallConfig {
    fn default() -> Self {
        Self {
            call_delta: 0.30,
            days_to_expiry: 30,
            profit_target: 0.50,
            vol_lookback: 20,
        }
    }
}

pub struct CoveredCallStrategy {
    config: CoveredCallConfig,
    model: BlackScholes,
    selector: StrikeSelector,
    volatility: RealizedVolatility,
}

impl CoveredCallStrategy {
    pub fn new(
        config: CoveredCallConfig,
        model: BlackScholes,
        selector: StrikeSelector,
    ) -> Self {
        let volatility = RealizedVolatility::new(config.vol_lookback);
        Self {
            config,
            model,
            selector,
            volatility,
        }
    }
}

impl Strategy for CoveredCallStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CoveredCall
    }

    fn estimate_volatility(&self, history: &[PriceBar]) -> Result<f64, VolatilityError> {
        self.volatility.estimate(history)
    }

    /// Write whenever shares are held and no call is outstanding (the
    /// engine only asks while the lane is idle).
    fn entry_signal(&self, ctx: &BarContext) -> bool {
        ctx.share_lot.is_some_and(|lot| lot.shares >= 100)
    }

    fn open_position(&self, ctx: &BarContext) -> Result<Option<Position>, SelectionError> {
        let Some(lot) = ctx.share_lot else {
            return Ok(None);
        };
        // Size is fixed by the holding, never by the risk budget.
        let contracts = lot.shares / 100;
        if contracts == 0 {
            return Ok(None);
        }

        let time = f64::from(self.config.days_to_expiry) / 365.0;
        let candidate = self.selector.select(
            &self.model,
            ctx.spot,
            self.config.call_delta,
            time,
            ctx.volatility,
            OptionType::Call,
        )?;

        let expiration = ctx.date + Duration::days(i64::from(self.config.days_to_expiry));
        let premium = Decimal::try_from(candidate.premium).unwrap_or_default();
        let leg = OptionLeg {
            option_type: OptionType::Call,
            strike: Decimal::try_from(candidate.strike).unwrap_or_default(),
            expiration,
            contracts: -(contracts as i32),
            entry_price: premium,
            current_price: premium,
            entry_delta: candidate.delta,
            current_delta: candidate.delta,
        };

        // The written calls are covered: worst case is the stock going to
        // zero against the lot's cost basis, cushioned by the premium.
        let cost_basis: f64 = lot.cost_basis.try_into().unwrap_or(0.0);
        let max_loss = Decimal::try_from(
            (cost_basis - candidate.premium) * 100.0 * f64::from(contracts),
        )
        .unwrap_or_default();

        Ok(Some(Position::open(
            ctx.ticker,
            self.kind(),
            ctx.date,
            expiration,
            ctx.bar.close,
            vec![leg],
            max_loss,
            Some(*lot),
        )))
    }

    fn close_decision(&self, position: &Position) -> Option<PositionStatus> {
        if position.profit_fraction() >= self.config.profit_target {
            return Some(PositionStatus::ClosedProfit);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::StrikeSelectorConfig;
    use crate::backtest::ShareLot;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn strategy() -> CoveredCallStrategy {
        CoveredCallStrategy::new(
            CoveredCallConfig::default(),
            BlackScholes::new(0.02),
            StrikeSelector::new(StrikeSelectorConfig::default()),
        )
    }

    fn bars(count: usize) -> Vec<PriceBar> {
        (0..count)
            .map(|i| {
                let close = if i % 2 == 0 { dec!(100) } else { dec!(101) };
                PriceBar {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                        + Duration::days(i as i64),
                    open: close,
                    high: close + dec!(1),
                    low: close - dec!(1),
                    close,
                    volume: 1_000,
                }
            })
            .collect()
    }

    fn context<'a>(bars: &'a [PriceBar], lot: Option<&'a ShareLot>) -> BarContext<'a> {
        let bar = bars.last().unwrap();
        BarContext {
            ticker: "SPY",
            date: bar.date,
            bar,
            history: bars,
            spot: bar.close_f64(),
            volatility: 0.25,
            equity: 100_000.0,
            share_lot: lot,
        }
    }

    #[test]
    fn test_entry_needs_round_lot() {
        let strategy = strategy();
        let bars = bars(25);
        assert!(!strategy.entry_signal(&context(&bars, None)));

        let odd_lot = ShareLot {
            shares: 50,
            cost_basis: dec!(100),
        };
        assert!(!strategy.entry_signal(&context(&bars, Some(&odd_lot))));

        let lot = ShareLot {
            shares: 200,
            cost_basis: dec!(100),
        };
        assert!(strategy.entry_signal(&context(&bars, Some(&lot))));
    }

    #[test]
    fn test_writes_one_call_per_hundred_shares() {
        let strategy = strategy();
        let bars = bars(25);
        let lot = ShareLot {
            shares: 300,
            cost_basis: dec!(98),
        };
        let ctx = context(&bars, Some(&lot));
        let position = strategy.open_position(&ctx).unwrap().unwrap();

        assert_eq!(position.kind, StrategyKind::CoveredCall);
        assert_eq!(position.legs.len(), 1);
        let leg = &position.legs[0];
        assert_eq!(leg.option_type, OptionType::Call);
        assert_eq!(leg.contracts, -3);
        assert!(leg.strike > ctx.bar.close);
        assert!((leg.entry_delta - 0.30).abs() <= 0.05);
        assert_eq!(position.share_lot.unwrap().shares, 300);
    }

    #[test]
    fn test_profit_target_close() {
        let strategy = strategy();
        let bars = bars(25);
        let lot = ShareLot {
            shares: 100,
            cost_basis: dec!(100),
        };
        let mut position = strategy
            .open_position(&context(&bars, Some(&lot)))
            .unwrap()
            .unwrap();

        assert!(strategy.close_decision(&position).is_none());
        position.current_value = position.net_credit / dec!(4);
        assert_eq!(
            strategy.close_decision(&position),
            Some(PositionStatus::ClosedProfit)
        );
    }
}
