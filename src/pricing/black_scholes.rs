//! Black-Scholes pricing and Greeks.
//!
//! The sole source of option prices in this backtester: no historical
//! option chains exist, so every premium and delta comes from this model.
//! Values match the exact erf-based reference to better than 4 decimals.
//!
//! Input validation is strict: non-positive spot, strike, or volatility is
//! rejected with `InvalidParameter`, never clamped. Expired options
//! (`t_years <= 0`) price at intrinsic value with saturated delta.

use std::f64::consts::PI;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::data::{Greeks, OptionQuote, OptionType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Invalid pricing parameter: {0}")]
    InvalidParameter(String),
}

/// Black-Scholes calculator for options pricing and Greeks.
#[derive(Debug, Clone, Copy)]
pub struct BlackScholes {
    /// Annualized risk-free interest rate.
    pub rate: f64,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self { rate: 0.02 }
    }
}

impl BlackScholes {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// Validate spot, strike, and volatility. Time is allowed to be
    /// non-positive (expiry reached) and is handled by the callers.
    fn validate(spot: f64, strike: f64, vol: f64) -> Result<(), PricingError> {
        if !spot.is_finite() || spot <= 0.0 {
            return Err(PricingError::InvalidParameter(format!(
                "spot must be positive, got {spot}"
            )));
        }
        if !strike.is_finite() || strike <= 0.0 {
            return Err(PricingError::InvalidParameter(format!(
                "strike must be positive, got {strike}"
            )));
        }
        if !vol.is_finite() || vol <= 0.0 {
            return Err(PricingError::InvalidParameter(format!(
                "volatility must be positive, got {vol}"
            )));
        }
        Ok(())
    }

    /// Intrinsic value per share.
    pub fn intrinsic(spot: f64, strike: f64, option_type: OptionType) -> f64 {
        match option_type {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }

    fn d1(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        ((spot / strike).ln() + (self.rate + 0.5 * vol * vol) * time) / (vol * time.sqrt())
    }

    fn d2(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        self.d1(spot, strike, time, vol) - vol * time.sqrt()
    }

    /// Standard normal CDF.
    fn norm_cdf(x: f64) -> f64 {
        let normal = Normal::new(0.0, 1.0).unwrap();
        normal.cdf(x)
    }

    /// Standard normal PDF.
    fn norm_pdf(x: f64) -> f64 {
        (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
    }

    /// Theoretical premium per share.
    pub fn price(
        &self,
        spot: f64,
        strike: f64,
        time: f64,
        vol: f64,
        option_type: OptionType,
    ) -> Result<f64, PricingError> {
        Self::validate(spot, strike, vol)?;

        if time <= 0.0 {
            return Ok(Self::intrinsic(spot, strike, option_type));
        }

        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);
        let discount = (-self.rate * time).exp();

        let price = match option_type {
            OptionType::Call => spot * Self::norm_cdf(d1) - strike * discount * Self::norm_cdf(d2),
            OptionType::Put => strike * discount * Self::norm_cdf(-d2) - spot * Self::norm_cdf(-d1),
        };

        Ok(price.max(0.0))
    }

    /// Delta in [-1, 1]. Saturates at expiry per moneyness (0 at-the-money).
    pub fn delta(
        &self,
        spot: f64,
        strike: f64,
        time: f64,
        vol: f64,
        option_type: OptionType,
    ) -> Result<f64, PricingError> {
        Self::validate(spot, strike, vol)?;

        if time <= 0.0 {
            return Ok(match option_type {
                OptionType::Call => {
                    if spot > strike {
                        1.0
                    } else {
                        0.0
                    }
                }
                OptionType::Put => {
                    if spot < strike {
                        -1.0
                    } else {
                        0.0
                    }
                }
            });
        }

        let d1 = self.d1(spot, strike, time, vol);
        Ok(match option_type {
            OptionType::Call => Self::norm_cdf(d1),
            OptionType::Put => Self::norm_cdf(d1) - 1.0,
        })
    }

    /// All Greeks at once. Zero at expiry except the saturated delta.
    pub fn greeks(
        &self,
        spot: f64,
        strike: f64,
        time: f64,
        vol: f64,
        option_type: OptionType,
    ) -> Result<Greeks, PricingError> {
        let delta = self.delta(spot, strike, time, vol, option_type)?;

        if time <= 0.0 {
            return Ok(Greeks {
                delta,
                ..Greeks::default()
            });
        }

        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);
        let sqrt_t = time.sqrt();
        let discount = (-self.rate * time).exp();
        let pdf_d1 = Self::norm_pdf(d1);

        let gamma = pdf_d1 / (spot * vol * sqrt_t);
        // Vega per 1% move in vol.
        let vega = spot * pdf_d1 * sqrt_t / 100.0;

        let decay = -spot * pdf_d1 * vol / (2.0 * sqrt_t);
        let (theta_annual, rho) = match option_type {
            OptionType::Call => (
                decay - self.rate * strike * discount * Self::norm_cdf(d2),
                strike * time * discount * Self::norm_cdf(d2) / 100.0,
            ),
            OptionType::Put => (
                decay + self.rate * strike * discount * Self::norm_cdf(-d2),
                -strike * time * discount * Self::norm_cdf(-d2) / 100.0,
            ),
        };

        Ok(Greeks {
            delta,
            gamma,
            theta: theta_annual / 365.0,
            vega,
            rho,
        })
    }

    /// Build a full theoretical quote for a contract.
    pub fn quote(
        &self,
        spot: f64,
        strike: f64,
        expiration: NaiveDate,
        time: f64,
        vol: f64,
        option_type: OptionType,
    ) -> Result<OptionQuote, PricingError> {
        let price = self.price(spot, strike, time, vol, option_type)?;
        let greeks = self.greeks(spot, strike, time, vol, option_type)?;

        Ok(OptionQuote {
            option_type,
            strike: Decimal::try_from(strike).unwrap_or_default(),
            expiration,
            underlying_price: Decimal::try_from(spot).unwrap_or_default(),
            volatility: vol,
            risk_free_rate: self.rate,
            theoretical_price: Decimal::try_from(price).unwrap_or_default(),
            greeks,
        })
    }

    /// Implied volatility by bisection on [0.001, 5.0].
    ///
    /// Returns `Ok(None)` when the price is below intrinsic (no volatility
    /// reproduces it); errors on malformed inputs.
    pub fn implied_vol(
        &self,
        market_price: f64,
        spot: f64,
        strike: f64,
        time: f64,
        option_type: OptionType,
    ) -> Result<Option<f64>, PricingError> {
        if !spot.is_finite() || spot <= 0.0 || !strike.is_finite() || strike <= 0.0 {
            return Err(PricingError::InvalidParameter(format!(
                "spot/strike must be positive, got {spot}/{strike}"
            )));
        }
        if time <= 0.0 || !market_price.is_finite() || market_price <= 0.0 {
            return Err(PricingError::InvalidParameter(format!(
                "need positive time and price, got t={time} price={market_price}"
            )));
        }

        if market_price < Self::intrinsic(spot, strike, option_type) {
            return Ok(None);
        }

        let mut vol_low = 0.001_f64;
        let mut vol_high = 5.0_f64;
        let tolerance = 1e-5;
        let max_iterations = 100;

        for _ in 0..max_iterations {
            let vol_mid = 0.5 * (vol_low + vol_high);
            let price = self.price(spot, strike, time, vol_mid, option_type)?;

            if (price - market_price).abs() < tolerance {
                return Ok(Some(vol_mid));
            }

            if price < market_price {
                vol_low = vol_mid;
            } else {
                vol_high = vol_mid;
            }
        }

        Ok(Some(0.5 * (vol_low + vol_high)))
    }
}
