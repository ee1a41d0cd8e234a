//! Per-contract commission model. Defaults to zero so frictionless runs
//! stay the baseline; set a rate to study cost drag.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionConfig {
    /// Charge per contract per side, in currency units.
    pub per_contract: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommissionModel {
    config: CommissionConfig,
}

impl CommissionModel {
    pub fn new(config: CommissionConfig) -> Self {
        Self { config }
    }

    /// Cost of trading `contracts` contracts on one side.
    pub fn cost(&self, contracts: i32) -> Decimal {
        self.config.per_contract * Decimal::from(contracts.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_is_free() {
        let model = CommissionModel::default();
        assert_eq!(model.cost(10), Decimal::ZERO);
    }

    #[test]
    fn test_per_contract_rate() {
        let model = CommissionModel::new(CommissionConfig {
            per_contract: dec!(0.65),
        });
        assert_eq!(model.cost(4), dec!(2.60));
        assert_eq!(model.cost(-4), dec!(2.60));
    }
}
