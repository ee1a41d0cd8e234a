//! The bar-by-bar backtest loop.
//!
//! One lane: at most one strategy position open at a time. Each bar is
//! processed in a fixed order so runs are deterministic:
//!
//! 1. estimate volatility from trailing history
//! 2. settle positions at or past expiration
//! 3. mark remaining open positions to model
//! 4. apply the strategy's early-close decision
//! 5. consider a new entry if the lane is idle
//! 6. record the equity point
//!
//! Cash is untouched at entry (the credit lives inside the position's
//! mark); realized P&L hits cash when a position closes. Equity is cash
//! plus open-position unrealized P&L plus any share lot at the bar close.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::analytics::SelectionError;
use crate::data::PriceBar;
use crate::pricing::{BlackScholes, PricingError};
use crate::strategy::{BarContext, Strategy};

use super::commission::{CommissionConfig, CommissionModel};
use super::ledger::PositionLedger;
use super::position::{PositionStatus, ShareLot, StrategyKind};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No price bars supplied")]
    EmptyData,

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Engine-level settings, independent of any single strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_equity: Decimal,
    pub risk_free_rate: f64,
    /// Share lot bought up front when running a covered-call strategy.
    pub covered_call_shares: u32,
    pub commission: CommissionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_equity: Decimal::from(100_000),
            risk_free_rate: 0.02,
            covered_call_shares: 100,
            commission: CommissionConfig::default(),
        }
    }
}

/// Where the single lane stands within a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaneState {
    Idle,
    /// Entry signal fired this bar; construction and sizing pending.
    PendingEntry,
    Open { position_id: u64 },
}

/// All mutable run state, threaded explicitly through each bar.
struct PortfolioState {
    cash: Decimal,
    lane: LaneState,
    share_lot: Option<ShareLot>,
    /// Most recent successful volatility estimate, used to mark open
    /// positions on bars where the estimator fails.
    last_vol: Option<f64>,
    ledger: PositionLedger,
}

/// One point of the equity curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: Decimal,
    pub cash: Decimal,
    /// Open-position unrealized P&L plus share-lot value.
    pub positions_value: Decimal,
    pub open_positions: usize,
    pub daily_pnl: Decimal,
}

/// Everything a finished run produced.
#[derive(Debug, Serialize, Deserialize)]
pub struct BacktestResult {
    pub ticker: String,
    pub strategy: StrategyKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_equity: Decimal,
    pub final_equity: Decimal,
    pub equity_curve: Vec<EquityPoint>,
    pub ledger: PositionLedger,
    pub bars_processed: usize,
    /// Bars with no usable volatility estimate: too little history or
    /// a flat trailing window.
    pub skipped_no_volatility: usize,
    /// Entry attempts abandoned because no strike met the delta target.
    pub skipped_no_strike: usize,
    /// Completed idle -> pending-entry -> open transitions.
    pub entry_transitions: usize,
}

pub struct BacktestEngine {
    config: EngineConfig,
    model: BlackScholes,
    commission: CommissionModel,
    strategy: Box<dyn Strategy>,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig, strategy: Box<dyn Strategy>) -> Self {
        let model = BlackScholes::new(config.risk_free_rate);
        let commission = CommissionModel::new(config.commission);
        Self {
            config,
            model,
            commission,
            strategy,
        }
    }

    /// Run the strategy over the full bar series. The run itself never
    /// fails on per-bar conditions (missing history, no viable strike);
    /// those skip the bar and are counted on the result.
    pub fn run(&self, ticker: &str, bars: &[PriceBar]) -> Result<BacktestResult, EngineError> {
        if bars.is_empty() {
            return Err(EngineError::EmptyData);
        }

        info!(
            ticker,
            strategy = self.strategy.name(),
            bars = bars.len(),
            "starting backtest"
        );

        let mut state = PortfolioState {
            cash: self.config.initial_equity,
            lane: LaneState::Idle,
            share_lot: None,
            last_vol: None,
            ledger: PositionLedger::new(),
        };

        // Covered calls write against stock, so the lot is bought at the
        // first bar's close and held for the whole run.
        if self.strategy.kind() == StrategyKind::CoveredCall {
            let lot = ShareLot {
                shares: self.config.covered_call_shares,
                cost_basis: bars[0].close,
            };
            state.cash -= lot.cost();
            state.share_lot = Some(lot);
        }

        let mut result = BacktestResult {
            ticker: ticker.to_string(),
            strategy: self.strategy.kind(),
            start_date: bars[0].date,
            end_date: bars[bars.len() - 1].date,
            initial_equity: self.config.initial_equity,
            final_equity: self.config.initial_equity,
            equity_curve: Vec::with_capacity(bars.len()),
            ledger: PositionLedger::new(),
            bars_processed: 0,
            skipped_no_volatility: 0,
            skipped_no_strike: 0,
            entry_transitions: 0,
        };

        let mut prev_equity = self.config.initial_equity;
        for (index, bar) in bars.iter().enumerate() {
            let history = &bars[..=index];
            self.process_bar(&mut state, &mut result, bar, history)?;

            let equity = Self::equity(&state, bar);
            result.equity_curve.push(EquityPoint {
                date: bar.date,
                equity,
                cash: state.cash,
                positions_value: equity - state.cash,
                open_positions: state.ledger.open_positions().len(),
                daily_pnl: equity - prev_equity,
            });
            prev_equity = equity;
            result.bars_processed += 1;
        }

        result.final_equity = prev_equity;
        result.ledger = state.ledger;

        info!(
            final_equity = %result.final_equity,
            trades = result.ledger.total_opened(),
            still_open = result.ledger.open_positions().len(),
            "backtest complete"
        );
        Ok(result)
    }

    fn process_bar(
        &self,
        state: &mut PortfolioState,
        result: &mut BacktestResult,
        bar: &PriceBar,
        history: &[PriceBar],
    ) -> Result<(), EngineError> {
        let date = bar.date;
        let spot = bar.close_f64();

        let fresh_vol = match self.strategy.estimate_volatility(history) {
            Ok(vol) => {
                state.last_vol = Some(vol);
                Some(vol)
            }
            Err(err) => {
                debug!(%date, %err, "volatility estimate unavailable");
                result.skipped_no_volatility += 1;
                None
            }
        };

        // 2. Settle anything at or past expiration. An in-the-money
        // covered call delivers the share lot at the strike; everything
        // else settles at intrinsic value.
        let mut settled = Vec::new();
        for position in state.ledger.open_positions_mut() {
            if !position.is_expired(date) {
                continue;
            }
            let called_away = position.kind == StrategyKind::CoveredCall
                && state.share_lot.is_some()
                && position
                    .legs
                    .iter()
                    .any(|leg| leg.is_short() && bar.close > leg.strike);
            if called_away {
                position.settle_called_away(bar.close, date);
                if let Some(lot) = state.share_lot.take() {
                    // The lot's cost returns to cash at delivery; the
                    // gain over basis rides in the position's realized
                    // P&L.
                    state.cash += lot.cost();
                }
            } else {
                position.settle_at_expiry(bar.close, date);
            }
            settled.push(position.id);
        }
        for id in settled {
            self.finalize_close(state, id);
        }

        // 3. Mark surviving positions to model.
        if let Some(vol) = state.last_vol {
            for position in state.ledger.open_positions_mut() {
                position.mark_to_model(&self.model, spot, vol, date)?;
            }
        }

        // 4. Strategy-driven early closes.
        let mut to_close = Vec::new();
        for position in state.ledger.open_positions() {
            if let Some(status) = self.strategy.close_decision(position) {
                to_close.push((position.id, status));
            }
        }
        for (id, status) in to_close {
            if let Some(position) = state
                .ledger
                .open_positions_mut()
                .iter_mut()
                .find(|p| p.id == id)
            {
                position.close(date, status);
            }
            self.finalize_close(state, id);
        }

        // 5. Entry. Requires an idle lane and a fresh volatility estimate.
        if state.lane == LaneState::Idle {
            if let Some(vol) = fresh_vol {
                self.consider_entry(state, result, bar, history, vol)?;
            }
        }

        Ok(())
    }

    fn consider_entry(
        &self,
        state: &mut PortfolioState,
        result: &mut BacktestResult,
        bar: &PriceBar,
        history: &[PriceBar],
        vol: f64,
    ) -> Result<(), EngineError> {
        let equity: f64 = Self::equity(state, bar).try_into().unwrap_or(0.0);
        let ctx = BarContext {
            ticker: &result.ticker,
            date: bar.date,
            bar,
            history,
            spot: bar.close_f64(),
            volatility: vol,
            equity,
            share_lot: state.share_lot.as_ref(),
        };

        if !self.strategy.entry_signal(&ctx) {
            return Ok(());
        }
        state.lane = LaneState::PendingEntry;

        match self.strategy.open_position(&ctx) {
            Ok(Some(position)) => {
                state.cash -= self.commission.cost(position.total_contracts());
                info!(
                    date = %bar.date,
                    id = position.id,
                    legs = position.legs.len(),
                    credit = %position.net_credit,
                    max_loss = %position.max_loss,
                    "opened position"
                );
                state.lane = LaneState::Open {
                    position_id: position.id,
                };
                state.ledger.record_open(position);
                result.entry_transitions += 1;
            }
            Ok(None) => {
                debug!(date = %bar.date, "entry sized to zero contracts");
                state.lane = LaneState::Idle;
            }
            Err(
                err @ (SelectionError::NoStrikeFound { .. } | SelectionError::EmptyLadder { .. }),
            ) => {
                debug!(date = %bar.date, %err, "no viable strike, standing aside");
                result.skipped_no_strike += 1;
                state.lane = LaneState::Idle;
            }
            Err(SelectionError::Pricing(err)) => return Err(err.into()),
        }
        Ok(())
    }

    /// Move a just-closed position to the archive and book its cash flow.
    fn finalize_close(&self, state: &mut PortfolioState, position_id: u64) {
        let Some(position) = state.ledger.record_close(position_id) else {
            return;
        };
        let realized = position.realized_pnl.unwrap_or_default();
        let contracts = position.total_contracts();
        let status = position.status;
        let exit_date = position.exit_date;

        state.cash += realized;
        state.cash -= self.commission.cost(contracts);
        if state.lane == (LaneState::Open { position_id }) {
            state.lane = LaneState::Idle;
        }

        info!(
            date = ?exit_date,
            id = position_id,
            ?status,
            pnl = %realized,
            "closed position"
        );
    }

    /// Cash plus open unrealized P&L plus the share lot at this close.
    fn equity(state: &PortfolioState, bar: &PriceBar) -> Decimal {
        let unrealized: Decimal = state
            .ledger
            .open_positions()
            .iter()
            .map(|p| p.unrealized_pnl())
            .sum();
        let lot_value = state
            .share_lot
            .map(|lot| lot.value_at(bar.close))
            .unwrap_or_default();
        state.cash + unrealized + lot_value
    }
}
