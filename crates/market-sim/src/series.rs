use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::controls::{Controls, IntervalGranularity};
use crate::rng::{round_half_up, SeededRng};

/// Daily window of elevated RT price risk, in fractional hours `[start, end)`.
///
/// The end is exclusive, so the 21:30 interval takes no scarcity draw. A
/// closed window would draw once more there and shift every later noise draw
/// of the day.
pub const SCARCITY_WINDOW: (f64, f64) = (17.5, 21.5);

pub const DA_PRICE_RANGE: (f64, f64) = (-20.0, 300.0);
pub const RT_PRICE_RANGE: (f64, f64) = (-20.0, 500.0);

const BASE_LOAD: f64 = 28.0;
const DIURNAL_AMPLITUDE: f64 = 10.0;
const MIDDAY_DIP_DEPTH: f64 = 9.0;
const EVENING_PEAK_AMPLITUDE: f64 = 28.0;
const SPREAD_SHAPE_AMPLITUDE: f64 = 14.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PricePoint {
    pub index: usize,
    pub time: String,
    pub hour: f64,
    pub da: f64,
    pub rt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesInputs {
    pub spread_expectation: f64,
    pub volatility_expectation: f64,
    pub scarcity_likelihood: f64,
    pub granularity: IntervalGranularity,
}

impl SeriesInputs {
    pub fn from_controls(controls: &Controls) -> Self {
        Self {
            spread_expectation: controls.spread_expectation,
            volatility_expectation: controls.volatility_expectation,
            scarcity_likelihood: controls.scarcity_likelihood,
            granularity: controls.granularity,
        }
    }

    pub fn seed(&self) -> i64 {
        round_half_up(self.spread_expectation * 13.0)
            + round_half_up(self.volatility_expectation * 7.0)
            + round_half_up(self.scarcity_likelihood * 17.0)
            + self.granularity.steps_per_day() as i64
    }
}

pub fn in_scarcity_window(hour: f64) -> bool {
    hour >= SCARCITY_WINDOW.0 && hour < SCARCITY_WINDOW.1
}

/// Synthetic day-ahead curve before clamping: diurnal swing, a solar midday
/// dip, the evening ramp peak and a spread-shaped overlay.
pub fn day_ahead_shape(hour: f64, spread_expectation: f64) -> f64 {
    let diurnal = DIURNAL_AMPLITUDE * ((hour - 6.0) / 24.0 * TAU).sin();
    let midday_dip = -MIDDAY_DIP_DEPTH * gaussian(hour, 13.0, 3.5);
    let evening_peak = EVENING_PEAK_AMPLITUDE * gaussian(hour, 19.0, 2.5);
    let spread_shape =
        spread_expectation / 100.0 * SPREAD_SHAPE_AMPLITUDE * ((hour - 2.0) / 24.0 * TAU).sin();

    BASE_LOAD + diurnal + midday_dip + evening_peak + spread_shape
}

fn gaussian(hour: f64, center: f64, width: f64) -> f64 {
    (-((hour - center) / width).powi(2)).exp()
}

pub fn generate_price_series(inputs: &SeriesInputs) -> Vec<PricePoint> {
    let steps = inputs.granularity.steps_per_day();
    let mut rng = SeededRng::from_signed_seed(inputs.seed());

    let volatility = inputs.volatility_expectation / 100.0;
    let scarcity = inputs.scarcity_likelihood / 100.0;

    (0..steps)
        .map(|index| {
            let hour = index as f64 / steps as f64 * 24.0;
            let da = day_ahead_shape(hour, inputs.spread_expectation);

            // Draw order matters for reproducibility: scarcity first, then noise.
            let scarcity_boost = if in_scarcity_window(hour) {
                scarcity * (8.0 + rng.next_unit() * 40.0)
            } else {
                0.0
            };
            let noise = rng.next_symmetric(6.0 + volatility * 18.0);
            let rt = da + noise + scarcity_boost;

            PricePoint {
                index,
                time: format_time(hour),
                hour,
                da: da.clamp(DA_PRICE_RANGE.0, DA_PRICE_RANGE.1),
                rt: rt.clamp(RT_PRICE_RANGE.0, RT_PRICE_RANGE.1),
            }
        })
        .collect()
}

/// `HH:MM` of a fractional hour, rounded to the nearest minute.
pub fn format_time(hour: f64) -> String {
    let total_minutes = round_half_up(hour * 60.0).max(0);
    let h = (total_minutes / 60) % 24;
    let m = total_minutes % 60;
    format!("{h:02}:{m:02}")
}

pub fn average_rt(prices: &[PricePoint]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    prices.iter().map(|point| point.rt).sum::<f64>() / prices.len() as f64
}
