//! Risk management: position sizing under a per-trade risk budget.

pub mod position_sizer;

pub use position_sizer::{PositionSizer, PositionSizerConfig};
