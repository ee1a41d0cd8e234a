//! Delta-targeted strike selection.
//!
//! With no option chain to screen, candidate strikes are a synthetic
//! ladder generated around spot at fixed increments, each priced through
//! the model. The selected strike is the one whose delta lands closest to
//! the target; ties break toward the strike nearer the money.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::OptionType;
use crate::pricing::{BlackScholes, PricingError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error(
        "No strike found within {tolerance} delta of target {target_delta} \
         (best candidate delta {best_delta})"
    )]
    NoStrikeFound {
        target_delta: f64,
        best_delta: f64,
        tolerance: f64,
    },

    #[error("Empty strike ladder for spot {spot}")]
    EmptyLadder { spot: f64 },

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Configuration for strike selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeSelectorConfig {
    /// Spacing of the candidate ladder, in price units.
    pub strike_increment: f64,
    /// Half-width of the ladder as a fraction of spot.
    pub search_radius_pct: f64,
    /// Maximum acceptable |selected delta - target delta|.
    pub delta_tolerance: f64,
}

impl Default for StrikeSelectorConfig {
    fn default() -> Self {
        Self {
            strike_increment: 1.0,
            search_radius_pct: 0.35,
            delta_tolerance: 0.05,
        }
    }
}

/// A candidate strike with its model delta and premium.
#[derive(Debug, Clone, Copy)]
pub struct StrikeCandidate {
    pub strike: f64,
    pub delta: f64,
    /// Model premium per share at selection time.
    pub premium: f64,
}

/// Finds the ladder strike whose model delta is closest to a target.
pub struct StrikeSelector {
    config: StrikeSelectorConfig,
}

impl StrikeSelector {
    pub fn new(config: StrikeSelectorConfig) -> Self {
        Self { config }
    }

    /// Select the strike closest to `target_delta` (signed: negative for
    /// puts). Fails with `NoStrikeFound` when even the best ladder strike
    /// misses the target by more than the configured tolerance; callers
    /// treat that as "skip this entry", not as a fatal condition.
    pub fn select(
        &self,
        model: &BlackScholes,
        spot: f64,
        target_delta: f64,
        time: f64,
        vol: f64,
        option_type: OptionType,
    ) -> Result<StrikeCandidate, SelectionError> {
        let ladder = self.ladder(spot);
        if ladder.is_empty() {
            return Err(SelectionError::EmptyLadder { spot });
        }

        let mut best: Option<StrikeCandidate> = None;
        for strike in ladder {
            let delta = model.delta(spot, strike, time, vol, option_type)?;
            let candidate = StrikeCandidate {
                strike,
                delta,
                premium: 0.0,
            };

            best = match best {
                None => Some(candidate),
                Some(current) => {
                    let current_err = (current.delta - target_delta).abs();
                    let candidate_err = (delta - target_delta).abs();
                    // Ties break toward the strike closer to the money.
                    let candidate_wins = candidate_err < current_err
                        || (candidate_err == current_err
                            && (strike - spot).abs() < (current.strike - spot).abs());
                    Some(if candidate_wins { candidate } else { current })
                }
            };
        }

        let mut best = best.ok_or(SelectionError::EmptyLadder { spot })?;

        if (best.delta - target_delta).abs() > self.config.delta_tolerance {
            return Err(SelectionError::NoStrikeFound {
                target_delta,
                best_delta: best.delta,
                tolerance: self.config.delta_tolerance,
            });
        }

        best.premium = model.price(spot, best.strike, time, vol, option_type)?;
        Ok(best)
    }

    /// Round a raw strike level to the nearest ladder increment (used for
    /// spread wings placed at a width from the short strike).
    pub fn round_to_increment(&self, strike: f64) -> f64 {
        let increment = self.config.strike_increment;
        (strike / increment).round() * increment
    }

    /// Monotonically increasing candidate ladder around spot.
    fn ladder(&self, spot: f64) -> Vec<f64> {
        let increment = self.config.strike_increment;
        if increment <= 0.0 || spot <= 0.0 {
            return Vec::new();
        }

        let low = spot * (1.0 - self.config.search_radius_pct);
        let high = spot * (1.0 + self.config.search_radius_pct);
        let mut strike = (low / increment).ceil() * increment;

        let mut ladder = Vec::new();
        while strike <= high {
            if strike > 0.0 {
                ladder.push(strike);
            }
            strike += increment;
        }
        ladder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn selector() -> StrikeSelector {
        StrikeSelector::new(StrikeSelectorConfig::default())
    }

    #[test]
    fn test_default_config() {
        let config = StrikeSelectorConfig::default();
        assert_eq!(config.strike_increment, 1.0);
        assert_eq!(config.search_radius_pct, 0.35);
        assert_eq!(config.delta_tolerance, 0.05);
    }

    #[test]
    fn test_ladder_is_monotonic_and_bounded() {
        let selector = selector();
        let ladder = selector.ladder(100.0);
        assert!(!ladder.is_empty());
        assert!(ladder.windows(2).all(|w| w[1] > w[0]));
        assert!(*ladder.first().unwrap() >= 65.0);
        assert!(*ladder.last().unwrap() <= 135.0);
    }

    #[test]
    fn test_selects_put_near_target_delta() {
        let selector = selector();
        let model = BlackScholes::new(0.02);
        let candidate = selector
            .select(&model, 100.0, -0.30, 30.0 / 365.0, 0.20, OptionType::Put)
            .unwrap();

        // Exhaustive check over the integer ladder puts the best strike at 97.
        assert_relative_eq!(candidate.strike, 97.0, epsilon = 1e-9);
        assert!((candidate.delta - (-0.30)).abs() <= 0.05);
        assert!(candidate.premium > 0.0);
    }

    #[test]
    fn test_selected_delta_always_within_tolerance() {
        let selector = selector();
        let model = BlackScholes::new(0.02);
        for &target in &[-0.10, -0.20, -0.30, -0.40] {
            let candidate = selector
                .select(&model, 480.0, target, 45.0 / 365.0, 0.18, OptionType::Put)
                .unwrap();
            assert!(
                (candidate.delta - target).abs() <= 0.05,
                "target {target} got {}",
                candidate.delta
            );
        }
        for &target in &[0.10, 0.25, 0.35] {
            let candidate = selector
                .select(&model, 480.0, target, 45.0 / 365.0, 0.18, OptionType::Call)
                .unwrap();
            assert!((candidate.delta - target).abs() <= 0.05);
        }
    }

    #[test]
    fn test_no_strike_found_with_tiny_tolerance() {
        // A coarse ladder cannot hit the target within 0.0001 delta.
        let selector = StrikeSelector::new(StrikeSelectorConfig {
            strike_increment: 25.0,
            search_radius_pct: 0.35,
            delta_tolerance: 0.0001,
        });
        let model = BlackScholes::new(0.02);
        let err = selector
            .select(&model, 100.0, -0.30, 30.0 / 365.0, 0.20, OptionType::Put)
            .unwrap_err();
        assert!(matches!(err, SelectionError::NoStrikeFound { .. }));
    }

    #[test]
    fn test_pricing_errors_propagate() {
        let selector = selector();
        let model = BlackScholes::new(0.02);
        let err = selector
            .select(&model, 100.0, -0.30, 30.0 / 365.0, 0.0, OptionType::Put)
            .unwrap_err();
        assert!(matches!(err, SelectionError::Pricing(_)));
    }

    #[test]
    fn test_round_to_increment() {
        let selector = StrikeSelector::new(StrikeSelectorConfig {
            strike_increment: 5.0,
            ..StrikeSelectorConfig::default()
        });
        assert_eq!(selector.round_to_increment(92.4), 90.0);
        assert_eq!(selector.round_to_increment(92.6), 95.0);
    }
}
