//! Backtest engine, position lifecycle, and the run's audit trail.

pub mod commission;
pub mod engine;
pub mod ledger;
pub mod position;

pub use commission::{CommissionConfig, CommissionModel};
pub use engine::{BacktestEngine, BacktestResult, EngineConfig, EngineError, EquityPoint};
pub use ledger::{LedgerEvent, PositionLedger};
pub use position::{OptionLeg, Position, PositionStatus, ShareLot, StrategyKind};
