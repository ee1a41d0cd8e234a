//! Trade and equity-curve statistics computed after a run.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::backtest::BacktestResult;
use crate::pricing::TRADING_DAYS_PER_YEAR;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    pub total_pnl: Decimal,
    pub avg_winner: Decimal,
    pub avg_loser: Decimal,
    /// Gross profit over gross loss. Infinite with no losers.
    pub profit_factor: f64,
    pub avg_days_held: f64,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    /// Annualized from daily equity returns, zero risk-free.
    pub sharpe_ratio: f64,
}

impl PerformanceMetrics {
    pub fn summary(&self) -> String {
        format!(
            "Trades: {} ({} W / {} L, {:.1}% win rate)\n\
             Total P&L: {:.2}  (avg winner {:.2}, avg loser {:.2}, PF {:.2})\n\
             Avg days held: {:.1}\n\
             Return: {:.2}%  Max drawdown: {:.2}%  Sharpe: {:.2}",
            self.total_trades,
            self.winners,
            self.losers,
            self.win_rate * 100.0,
            self.total_pnl,
            self.avg_winner,
            self.avg_loser,
            self.profit_factor,
            self.avg_days_held,
            self.total_return_pct,
            self.max_drawdown_pct,
            self.sharpe_ratio,
        )
    }
}

pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Statistics over the closed trades and the equity curve. Positions
    /// still open at the end of the series are excluded from trade stats
    /// but already reflected in the equity-derived figures.
    pub fn compute(result: &BacktestResult) -> PerformanceMetrics {
        let closed = result.ledger.closed_positions();

        let mut winners = 0usize;
        let mut losers = 0usize;
        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut days_held_total = 0i64;

        for position in closed {
            let pnl = position.realized_pnl.unwrap_or_default();
            if pnl >= Decimal::ZERO {
                winners += 1;
                gross_profit += pnl;
            } else {
                losers += 1;
                gross_loss += -pnl;
            }
            days_held_total += position.days_held().unwrap_or(0);
        }

        let total_trades = closed.len();
        let total_pnl = gross_profit - gross_loss;
        let win_rate = if total_trades > 0 {
            winners as f64 / total_trades as f64
        } else {
            0.0
        };
        let avg_winner = if winners > 0 {
            gross_profit / Decimal::from(winners as u64)
        } else {
            Decimal::ZERO
        };
        let avg_loser = if losers > 0 {
            -gross_loss / Decimal::from(losers as u64)
        } else {
            Decimal::ZERO
        };
        let profit_factor = {
            let profit: f64 = gross_profit.try_into().unwrap_or(0.0);
            let loss: f64 = gross_loss.try_into().unwrap_or(0.0);
            if loss > 0.0 {
                profit / loss
            } else if profit > 0.0 {
                f64::INFINITY
            } else {
                0.0
            }
        };
        let avg_days_held = if total_trades > 0 {
            days_held_total as f64 / total_trades as f64
        } else {
            0.0
        };

        let initial: f64 = result.initial_equity.try_into().unwrap_or(0.0);
        let finishing: f64 = result.final_equity.try_into().unwrap_or(0.0);
        let total_return_pct = if initial > 0.0 {
            (finishing / initial - 1.0) * 100.0
        } else {
            0.0
        };

        PerformanceMetrics {
            total_trades,
            winners,
            losers,
            win_rate,
            total_pnl,
            avg_winner,
            avg_loser,
            profit_factor,
            avg_days_held,
            total_return_pct,
            max_drawdown_pct: Self::max_drawdown_pct(result),
            sharpe_ratio: Self::sharpe_ratio(result),
        }
    }

    fn max_drawdown_pct(result: &BacktestResult) -> f64 {
        let mut peak = f64::MIN;
        let mut max_drawdown = 0.0f64;
        for point in &result.equity_curve {
            let equity: f64 = point.equity.try_into().unwrap_or(0.0);
            peak = peak.max(equity);
            if peak > 0.0 {
                max_drawdown = max_drawdown.max((peak - equity) / peak);
            }
        }
        max_drawdown * 100.0
    }

    fn sharpe_ratio(result: &BacktestResult) -> f64 {
        let equities: Vec<f64> = result
            .equity_curve
            .iter()
            .map(|p| p.equity.try_into().unwrap_or(0.0))
            .collect();
        if equities.len() < 3 {
            return 0.0;
        }

        let returns: Vec<f64> = equities
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| w[1] / w[0] - 1.0)
            .collect();
        if returns.len() < 2 {
            return 0.0;
        }

        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance = returns
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / (returns.len() - 1) as f64;
        let std_dev = variance.sqrt();
        if std_dev == 0.0 {
            return 0.0;
        }

        mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{
        EquityPoint, OptionLeg, Position, PositionLedger, PositionStatus, StrategyKind,
    };
    use crate::data::OptionType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn closed_position(entry_day: u32, exit_day: u32, pnl: Decimal) -> Position {
        let expiration = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut position = Position::open(
            "SPY",
            StrategyKind::PutSelling,
            NaiveDate::from_ymd_opt(2024, 1, entry_day).unwrap(),
            expiration,
            dec!(100),
            vec![OptionLeg {
                option_type: OptionType::Put,
                strike: dec!(95),
                expiration,
                contracts: -1,
                entry_price: dec!(1.50),
                current_price: dec!(1.50),
                entry_delta: -0.30,
                current_delta: -0.30,
            }],
            dec!(9350),
            None,
        );
        position.current_value = position.net_credit - pnl;
        position.close(
            NaiveDate::from_ymd_opt(2024, 1, exit_day).unwrap(),
            if pnl >= Decimal::ZERO {
                PositionStatus::ClosedProfit
            } else {
                PositionStatus::ClosedLoss
            },
        );
        position
    }

    fn result_with(positions: Vec<Position>, equities: &[i64]) -> BacktestResult {
        let mut ledger = PositionLedger::new();
        for position in positions {
            let id = position.id;
            let mut opened = position.clone();
            opened.status = PositionStatus::Open;
            ledger.record_open(opened);
            let last = ledger.open_positions().len() - 1;
            ledger.open_positions_mut()[last] = position;
            ledger.record_close(id);
        }

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let equity_curve: Vec<EquityPoint> = equities
            .iter()
            .enumerate()
            .map(|(i, &e)| EquityPoint {
                date: start + chrono::Duration::days(i as i64),
                equity: Decimal::from(e),
                cash: Decimal::from(e),
                positions_value: Decimal::ZERO,
                open_positions: 0,
                daily_pnl: Decimal::ZERO,
            })
            .collect();

        BacktestResult {
            ticker: "SPY".into(),
            strategy: StrategyKind::PutSelling,
            start_date: start,
            end_date: equity_curve.last().map(|p| p.date).unwrap_or(start),
            initial_equity: Decimal::from(equities[0]),
            final_equity: Decimal::from(*equities.last().unwrap()),
            equity_curve,
            ledger,
            bars_processed: equities.len(),
            skipped_no_volatility: 0,
            skipped_no_strike: 0,
            entry_transitions: 0,
        }
    }

    #[test]
    fn test_trade_statistics() {
        let result = result_with(
            vec![
                closed_position(2, 10, dec!(150)),
                closed_position(3, 12, dec!(90)),
                closed_position(4, 20, dec!(-120)),
            ],
            &[100_000, 100_050, 100_120],
        );
        let metrics = MetricsCalculator::compute(&result);

        assert_eq!(metrics.total_trades, 3);
        assert_eq!(metrics.winners, 2);
        assert_eq!(metrics.losers, 1);
        assert!((metrics.win_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics.total_pnl, dec!(120));
        assert_eq!(metrics.avg_winner, dec!(120));
        assert_eq!(metrics.avg_loser, dec!(-120));
        assert!((metrics.profit_factor - 2.0).abs() < 1e-12);
        // Held 8, 9, and 16 days.
        assert!((metrics.avg_days_held - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_run_is_all_zeroes() {
        let result = result_with(vec![], &[100_000, 100_000, 100_000]);
        let metrics = MetricsCalculator::compute(&result);

        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.total_pnl, Decimal::ZERO);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown_pct, 0.0);
        assert_eq!(metrics.total_return_pct, 0.0);
    }

    #[test]
    fn test_max_drawdown_from_peak() {
        let result = result_with(vec![], &[100_000, 110_000, 99_000, 104_500]);
        let metrics = MetricsCalculator::compute(&result);

        // Peak 110K to trough 99K.
        assert!((metrics.max_drawdown_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_return() {
        let result = result_with(vec![], &[100_000, 101_000, 103_000]);
        let metrics = MetricsCalculator::compute(&result);
        assert!((metrics.total_return_pct - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_renders() {
        let result = result_with(
            vec![closed_position(2, 10, dec!(150))],
            &[100_000, 100_150],
        );
        let summary = MetricsCalculator::compute(&result).summary();
        assert!(summary.contains("Trades: 1"));
        assert!(summary.contains("win rate"));
    }
}
