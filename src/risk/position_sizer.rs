//! Position sizing.
//!
//! Converts a risk budget (fraction of equity) and a trade's maximum loss
//! per contract into a whole contract count by floor division. A zero
//! result means "no trade this bar" and is normal control flow, never an
//! error.

use serde::{Deserialize, Serialize};

/// Position sizing configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionSizerConfig {
    /// Hard cap on contracts per trade.
    pub max_contracts: u32,
}

impl Default for PositionSizerConfig {
    fn default() -> Self {
        Self {
            max_contracts: 1_000,
        }
    }
}

/// Risk-budget position sizer.
pub struct PositionSizer {
    config: PositionSizerConfig,
}

impl PositionSizer {
    pub fn new(config: PositionSizerConfig) -> Self {
        Self { config }
    }

    /// Number of contracts affordable under the risk budget:
    /// floor(equity * risk_fraction / max_loss_per_contract), capped.
    ///
    /// Returns 0 when the loss figure is non-positive, the budget buys no
    /// whole contract, or equity/risk inputs are degenerate.
    pub fn contracts(
        &self,
        portfolio_equity: f64,
        risk_fraction: f64,
        max_loss_per_contract: f64,
    ) -> u32 {
        if max_loss_per_contract <= 0.0
            || portfolio_equity <= 0.0
            || risk_fraction <= 0.0
            || !max_loss_per_contract.is_finite()
        {
            return 0;
        }

        let budget = portfolio_equity * risk_fraction;
        let count = (budget / max_loss_per_contract).floor();
        if count <= 0.0 {
            return 0;
        }

        (count as u32).min(self.config.max_contracts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> PositionSizer {
        PositionSizer::new(PositionSizerConfig::default())
    }

    #[test]
    fn test_basic_sizing() {
        // $100K equity, 2% risk = $2000 budget, $500 loss per contract.
        assert_eq!(sizer().contracts(100_000.0, 0.02, 500.0), 4);
    }

    #[test]
    fn test_floor_division() {
        // $2000 budget / $600 = 3.33 -> 3 contracts.
        assert_eq!(sizer().contracts(100_000.0, 0.02, 600.0), 3);
    }

    #[test]
    fn test_zero_when_budget_too_small() {
        assert_eq!(sizer().contracts(10_000.0, 0.02, 500.0), 0);
    }

    #[test]
    fn test_zero_on_degenerate_inputs() {
        let sizer = sizer();
        assert_eq!(sizer.contracts(100_000.0, 0.02, 0.0), 0);
        assert_eq!(sizer.contracts(100_000.0, 0.02, -50.0), 0);
        assert_eq!(sizer.contracts(100_000.0, 0.0, 500.0), 0);
        assert_eq!(sizer.contracts(0.0, 0.02, 500.0), 0);
    }

    #[test]
    fn test_monotone_in_equity_and_loss() {
        let sizer = sizer();
        let mut prev = 0;
        for equity in (10_000..200_000).step_by(10_000) {
            let count = sizer.contracts(equity as f64, 0.02, 500.0);
            assert!(count >= prev);
            prev = count;
        }

        let mut prev = u32::MAX;
        for loss in [100.0, 250.0, 500.0, 1_000.0, 5_000.0] {
            let count = sizer.contracts(100_000.0, 0.02, loss);
            assert!(count <= prev);
            prev = count;
        }
    }

    #[test]
    fn test_max_contracts_cap() {
        let sizer = PositionSizer::new(PositionSizerConfig { max_contracts: 5 });
        assert_eq!(sizer.contracts(10_000_000.0, 0.02, 100.0), 5);
    }
}
