//! Append-only record of every position a run opens and closes.
//!
//! The ledger is the audit trail of a backtest: open events and close
//! events are appended in occurrence order and never rewritten. Closed
//! positions keep their terminal status and realized P&L.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::position::{Position, PositionStatus};

/// One lifecycle event, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Opened {
        date: NaiveDate,
        position_id: u64,
    },
    Closed {
        date: NaiveDate,
        position_id: u64,
        status: PositionStatus,
    },
}

/// Append-only position ledger.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PositionLedger {
    events: Vec<LedgerEvent>,
    open: Vec<Position>,
    closed: Vec<Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly opened position.
    pub fn record_open(&mut self, position: Position) {
        debug_assert!(position.is_open());
        self.events.push(LedgerEvent::Opened {
            date: position.entry_date,
            position_id: position.id,
        });
        self.open.push(position);
    }

    /// Move a position the engine has closed from the open set to the
    /// closed archive. Returns the archived position.
    pub fn record_close(&mut self, position_id: u64) -> Option<&Position> {
        let index = self.open.iter().position(|p| p.id == position_id)?;
        let position = self.open.remove(index);
        debug_assert!(!position.is_open());
        self.events.push(LedgerEvent::Closed {
            date: position.exit_date.unwrap_or(position.entry_date),
            position_id: position.id,
            status: position.status,
        });
        self.closed.push(position);
        self.closed.last()
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.open
    }

    /// Closed positions in close order.
    pub fn closed_positions(&self) -> &[Position] {
        &self.closed
    }

    pub(crate) fn open_positions_mut(&mut self) -> &mut [Position] {
        &mut self.open
    }

    pub fn total_opened(&self) -> usize {
        self.open.len() + self.closed.len()
    }
}
