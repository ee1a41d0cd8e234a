//! Strategy implementations and the trait the engine drives them through.
//!
//! A strategy answers four questions each bar: what volatility input to
//! use, whether conditions favor a new entry, how to construct the
//! position (strikes, legs, size), and whether an open position should be
//! closed early. Everything else (settlement, marking, cash accounting)
//! belongs to the engine.

pub mod covered_call;
pub mod iron_condor;
pub mod put_selling;

use chrono::NaiveDate;

use crate::analytics::SelectionError;
use crate::backtest::{Position, PositionStatus, ShareLot};
use crate::data::PriceBar;
use crate::pricing::VolatilityError;

pub use covered_call::{CoveredCallConfig, CoveredCallStrategy};
pub use iron_condor::{IronCondorConfig, IronCondorStrategy};
pub use put_selling::{PutSellingConfig, PutSellingStrategy};
pub use crate::backtest::StrategyKind;

/// Per-bar view the engine hands to a strategy.
pub struct BarContext<'a> {
    pub ticker: &'a str,
    pub date: NaiveDate,
    pub bar: &'a PriceBar,
    /// Bars up to and including the current one.
    pub history: &'a [PriceBar],
    /// Current underlying close.
    pub spot: f64,
    /// This bar's volatility estimate.
    pub volatility: f64,
    /// Current portfolio equity.
    pub equity: f64,
    /// Shares currently held, for strategies that write against stock.
    pub share_lot: Option<&'a ShareLot>,
}

/// A rules-based options strategy the engine can drive bar by bar.
pub trait Strategy {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Volatility input for this bar's pricing and selection.
    fn estimate_volatility(&self, history: &[PriceBar]) -> Result<f64, VolatilityError>;

    /// Whether conditions favor opening a position this bar.
    fn entry_signal(&self, ctx: &BarContext) -> bool;

    /// Construct the position to open. `Ok(None)` means the trade sized
    /// to zero contracts or produced no viable structure; the engine
    /// treats it as "stand aside", not as a failure.
    fn open_position(&self, ctx: &BarContext) -> Result<Option<Position>, SelectionError>;

    /// Early-exit decision for an open position. `None` keeps it open.
    fn close_decision(&self, position: &Position) -> Option<PositionStatus>;
}

/// Simple moving average of closes over the trailing `period` bars.
/// `None` until enough history exists.
pub fn simple_moving_average(bars: &[PriceBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let sum: f64 = bars[bars.len() - period..]
        .iter()
        .map(|b| b.close_f64())
        .sum();
    Some(sum / period as f64)
}
