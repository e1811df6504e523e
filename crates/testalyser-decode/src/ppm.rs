//! Clock deviation from interval sample counts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ClockFrequency, SampleRate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RateError {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("clock frequency must be non-zero")]
    ZeroClockFrequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub min_ppm: f64,
    pub max_ppm: f64,
}

/// Deviation of the shortest and longest observed clock intervals from the
/// nominal `1 / clock_frequency`, in parts per million.
pub fn compute(
    min_samples: u64,
    max_samples: u64,
    sample_rate: u64,
    clock_frequency: u64,
) -> Result<DriftReport, RateError> {
    let calc = DriftCalculator::new(SampleRate(sample_rate), ClockFrequency(clock_frequency))?;
    Ok(calc.compute(min_samples, max_samples))
}

/// Rates validated once up front so per-frame computation cannot fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftCalculator {
    sample_rate: f64,
    nominal_interval: f64,
}

impl DriftCalculator {
    pub fn new(sample_rate: SampleRate, clock_frequency: ClockFrequency) -> Result<Self, RateError> {
        if sample_rate.0 == 0 {
            return Err(RateError::ZeroSampleRate);
        }
        if clock_frequency.0 == 0 {
            return Err(RateError::ZeroClockFrequency);
        }
        Ok(Self {
            sample_rate: sample_rate.0 as f64,
            nominal_interval: 1.0 / clock_frequency.0 as f64,
        })
    }

    pub fn compute(&self, min_samples: u64, max_samples: u64) -> DriftReport {
        DriftReport {
            min_ppm: self.ppm(min_samples),
            max_ppm: self.ppm(max_samples),
        }
    }

    fn ppm(&self, samples: u64) -> f64 {
        let interval = samples as f64 / self.sample_rate;
        (interval - self.nominal_interval) / self.nominal_interval * 1_000_000.0
    }
}

impl Default for DriftCalculator {
    fn default() -> Self {
        let sample_rate = SampleRate::default();
        let clock = ClockFrequency::default();
        Self {
            sample_rate: sample_rate.0 as f64,
            nominal_interval: 1.0 / clock.0 as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_interval_is_zero_ppm() {
        // 2 samples at 6.144 MHz is exactly one 3.072 MHz clock period.
        let report = compute(2, 2, 6_144_000, 3_072_000).unwrap();
        assert_eq!(report.min_ppm, 0.0);
        assert_eq!(report.max_ppm, 0.0);
    }

    #[test]
    fn default_rates() {
        // 163 samples at 500 MHz vs a 3.072 MHz period (~162.76 samples).
        let report = DriftCalculator::default().compute(162, 164);
        let nominal = 500_000_000.0 / 3_072_000.0;
        let expect = |s: f64| (s - nominal) / nominal * 1e6;
        assert!((report.min_ppm - expect(162.0)).abs() < 1e-6);
        assert!((report.max_ppm - expect(164.0)).abs() < 1e-6);
        assert!(report.min_ppm < 0.0 && report.max_ppm > 0.0);
    }

    #[test]
    fn default_matches_explicit_rates() {
        let explicit = DriftCalculator::new(SampleRate(500_000_000), ClockFrequency(3_072_000)).unwrap();
        assert_eq!(explicit, DriftCalculator::default());
    }

    #[test]
    fn zero_rates_are_rejected() {
        assert_eq!(compute(1, 1, 0, 3_072_000), Err(RateError::ZeroSampleRate));
        assert_eq!(compute(1, 1, 500_000_000, 0), Err(RateError::ZeroClockFrequency));
    }

    proptest! {
        #[test]
        fn max_ppm_is_monotonic(min in 0u64..1_000_000, a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let calc = DriftCalculator::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(calc.compute(min, lo).max_ppm <= calc.compute(min, hi).max_ppm);
        }
    }
}
