//! Lazy price indicators.
//!
//! Both indicators are iterator adapters so they can be chained directly on
//! any price stream without materialising intermediate vectors:
//!
//! ```ignore
//! use theta_signals::indicators::IndicatorExt;
//!
//! let rsi: Vec<Option<f64>> = closes.iter().copied().rsi(14)?.collect();
//! let ema9: Vec<f64> = closes.iter().copied().ema(9)?.collect();
//! ```

use std::collections::VecDeque;

use rust_decimal::prelude::ToPrimitive;
use theta_core::PriceBar;

use crate::SignalError;

/// Relative Strength Index over a rolling simple mean of gains and losses.
///
/// Emits one item per input price. The first price contributes a zero
/// change, so the first value appears at index `period - 1`; earlier items
/// are `None`. A window with neither gains nor losses is undefined and also
/// yields `None`.
#[derive(Debug, Clone)]
pub struct Rsi<I> {
    inner: I,
    period: usize,
    prev: Option<f64>,
    gains: VecDeque<f64>,
    losses: VecDeque<f64>,
}

impl<I> Rsi<I>
where
    I: Iterator<Item = f64>,
{
    /// # Errors
    /// Returns `SignalError::InvalidPeriod` when `period` is zero.
    pub fn new(inner: I, period: usize) -> Result<Self, SignalError> {
        if period == 0 {
            return Err(SignalError::InvalidPeriod {
                indicator: "RSI",
                period,
            });
        }
        Ok(Self {
            inner,
            period,
            prev: None,
            gains: VecDeque::with_capacity(period + 1),
            losses: VecDeque::with_capacity(period + 1),
        })
    }
}

impl<I> Iterator for Rsi<I>
where
    I: Iterator<Item = f64>,
{
    type Item = Option<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        let price = self.inner.next()?;
        let change = self.prev.map_or(0.0, |prev| price - prev);
        self.prev = Some(price);

        self.gains.push_back(change.max(0.0));
        self.losses.push_back((-change).max(0.0));
        if self.gains.len() > self.period {
            self.gains.pop_front();
            self.losses.pop_front();
        }
        if self.gains.len() < self.period {
            return Some(None);
        }

        let n = self.period as f64;
        let avg_gain = self.gains.iter().sum::<f64>() / n;
        let avg_loss = self.losses.iter().sum::<f64>() / n;

        Some(rsi_from_averages(avg_gain, avg_loss))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return None;
        }
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Exponential moving average seeded with the first price
/// (`alpha = 2 / (span + 1)`, no bias adjustment).
#[derive(Debug, Clone)]
pub struct Ema<I> {
    inner: I,
    alpha: f64,
    current: Option<f64>,
}

impl<I> Ema<I>
where
    I: Iterator<Item = f64>,
{
    /// # Errors
    /// Returns `SignalError::InvalidPeriod` when `span` is zero.
    pub fn new(inner: I, span: usize) -> Result<Self, SignalError> {
        if span == 0 {
            return Err(SignalError::InvalidPeriod {
                indicator: "EMA",
                period: span,
            });
        }
        Ok(Self {
            inner,
            alpha: 2.0 / (span as f64 + 1.0),
            current: None,
        })
    }
}

impl<I> Iterator for Ema<I>
where
    I: Iterator<Item = f64>,
{
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let price = self.inner.next()?;
        let value = match self.current {
            Some(prev) => self.alpha * price + (1.0 - self.alpha) * prev,
            None => price,
        };
        self.current = Some(value);
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Adds `.rsi(period)` and `.ema(span)` to any price iterator.
pub trait IndicatorExt: Iterator<Item = f64> + Sized {
    /// # Errors
    /// Returns `SignalError::InvalidPeriod` when `period` is zero.
    fn rsi(self, period: usize) -> Result<Rsi<Self>, SignalError> {
        Rsi::new(self, period)
    }

    /// # Errors
    /// Returns `SignalError::InvalidPeriod` when `span` is zero.
    fn ema(self, span: usize) -> Result<Ema<Self>, SignalError> {
        Ema::new(self, span)
    }
}

impl<I: Iterator<Item = f64>> IndicatorExt for I {}

/// Close prices of `bars` as `f64`, for indicator input.
pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .map(|b| b.close.to_f64().unwrap_or(f64::NAN))
        .collect()
}

/// True when the last close is below the one before it.
pub fn is_red_day(closes: &[f64]) -> bool {
    match closes {
        [.., prev, last] => last < prev,
        _ => false,
    }
}
