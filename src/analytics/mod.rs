//! Strike selection analytics.

pub mod strike_selector;

pub use strike_selector::{
    SelectionError, StrikeCandidate, StrikeSelector, StrikeSelectorConfig,
};
