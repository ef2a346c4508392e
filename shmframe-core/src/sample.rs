// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Sample clock record referenced by a header's sample handle.
//!
//! Tracks the sample count, the current sample time and the sample period of
//! a stream. The record is placed in the same segment as the payload so
//! consumers read the producer's timing without a copy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::error::SampleError;
use crate::shm::SharedPlacement;

/// Default tolerance used when comparing sample periods, in seconds.
pub const DEFAULT_PERIOD_EPSILON: f64 = 1e-6;

/// Sample count and timing of a frame stream.
///
/// Each cell is independently atomic; updates touching several cells
/// (`increment_count`, `set_rate_hz`) are made under the same external lock
/// that guards the frame header. Only the stream's producer should advance
/// the count or change the rate.
#[repr(C)]
#[derive(Debug, Default)]
pub struct Sample {
    count: AtomicU64,
    time_micros: AtomicU64,
    /// `f64` bit pattern of the period in seconds.
    period_secs: AtomicU64,
    period_micros: AtomicU64,
}

// SAFETY: repr(C), atomics only, valid when zeroed and for any bit pattern.
unsafe impl SharedPlacement for Sample {}

impl Sample {
    /// A sample clock with no period and count 0.
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            time_micros: AtomicU64::new(0),
            period_secs: AtomicU64::new(0),
            period_micros: AtomicU64::new(0),
        }
    }

    /// A sample clock ticking every `period`.
    pub fn with_period(period: Duration) -> Result<Self, SampleError> {
        if period.is_zero() {
            return Err(SampleError::NonPositivePeriod);
        }
        let sample = Self::new();
        sample.store_period(period.as_secs_f64());
        Ok(sample)
    }

    pub fn with_rate_hz(rate_hz: f64) -> Result<Self, SampleError> {
        let sample = Self::new();
        sample.set_rate_hz(rate_hz)?;
        Ok(sample)
    }

    /// Set the sample rate. Rejects zero, negative and non-finite rates.
    pub fn set_rate_hz(&self, rate_hz: f64) -> Result<(), SampleError> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(SampleError::InvalidRate { rate_hz });
        }
        self.store_period(1.0 / rate_hz);
        Ok(())
    }

    fn store_period(&self, period_secs: f64) {
        self.period_secs.store(period_secs.to_bits(), Ordering::Release);
        // Truncating, like a duration cast.
        self.period_micros.store((period_secs * 1e6) as u64, Ordering::Release);
    }

    /// Advance one period and return the new count.
    pub fn increment_count(&self) -> u64 {
        let step = self.period_micros.load(Ordering::Acquire);
        self.time_micros.fetch_add(step, Ordering::AcqRel);
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Advance the count with the sample time taken from an external clock.
    pub fn increment_count_at(&self, time: Duration) -> u64 {
        let micros = u64::try_from(time.as_micros()).unwrap_or(u64::MAX);
        self.time_micros.store(micros, Ordering::Release);
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Current sample time.
    pub fn time(&self) -> Duration {
        Duration::from_micros(self.time_micros.load(Ordering::Acquire))
    }

    pub fn period_secs(&self) -> f64 {
        f64::from_bits(self.period_secs.load(Ordering::Acquire))
    }

    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f64(self.period_secs()).unwrap_or(Duration::ZERO)
    }

    pub fn period_micros(&self) -> u64 {
        self.period_micros.load(Ordering::Acquire)
    }

    /// Rate in Hz, or 0 if no period has been set.
    pub fn rate_hz(&self) -> f64 {
        rate_from_period(self.period_secs())
    }

    /// Copy every cell of `other` into this record.
    pub fn copy_from(&self, other: &Sample) {
        self.store(&other.values());
    }

    pub fn store(&self, values: &SampleValues) {
        self.count.store(values.count, Ordering::Release);
        self.time_micros.store(values.time_micros, Ordering::Release);
        self.period_secs.store(values.period_secs.to_bits(), Ordering::Release);
        self.period_micros.store(values.period_micros, Ordering::Release);
    }

    /// Plain copy of the current cells.
    pub fn values(&self) -> SampleValues {
        SampleValues {
            count: self.count(),
            time_micros: self.time_micros.load(Ordering::Acquire),
            period_secs: self.period_secs(),
            period_micros: self.period_micros(),
        }
    }
}

/// Owned copy of a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SampleValues {
    pub count: u64,
    pub time_micros: u64,
    pub period_secs: f64,
    pub period_micros: u64,
}

impl SampleValues {
    pub fn rate_hz(&self) -> f64 {
        rate_from_period(self.period_secs)
    }
}

fn rate_from_period(period_secs: f64) -> f64 {
    if period_secs > 0.0 {
        1.0 / period_secs
    } else {
        0.0
    }
}

/// Outcome of comparing the sample periods of several streams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodCheck {
    /// All periods are within epsilon of the largest one.
    pub consistent: bool,
    /// Rate of the slowest stream.
    pub min_rate_hz: f64,
}

/// Check that a set of sample periods (seconds) agree within `epsilon`.
///
/// A component merging several streams runs at the slowest rate; an
/// inconsistent set is logged since merged samples will then not line up.
pub fn check_sample_periods(
    periods_secs: &[f64],
    epsilon: f64,
) -> Result<PeriodCheck, SampleError> {
    let max_period = periods_secs
        .iter()
        .copied()
        .fold(None, |max: Option<f64>, p| Some(max.map_or(p, |m| m.max(p))))
        .ok_or(SampleError::NoPeriods)?;

    let min_rate_hz = 1.0 / max_period;
    let consistent = periods_secs
        .iter()
        .all(|p| (p - max_period).abs() <= epsilon);

    if !consistent {
        tracing::warn!(
            min_rate_hz,
            streams = periods_secs.len(),
            "Sample rates are inconsistent; running at the minimum rate"
        );
    }

    Ok(PeriodCheck {
        consistent,
        min_rate_hz,
    })
}
