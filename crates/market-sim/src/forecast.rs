use serde::{Deserialize, Serialize};

use crate::rng::{round_half_up, SeededRng};
use crate::series::PricePoint;

pub const RT_FORECAST_RANGE: (f64, f64) = (-30.0, 500.0);
pub const LOWER_BOUND_RANGE: (f64, f64) = (-60.0, 450.0);
pub const UPPER_BOUND_RANGE: (f64, f64) = (-30.0, 550.0);
pub const BAND_RANGE: (f64, f64) = (0.0, 600.0);

const FRAGILITY_PENALTY: f64 = 0.18;
const MAX_BIAS: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(flatten)]
    pub price: PricePoint,
    pub rt_forecast: f64,
    pub lower: f64,
    pub upper: f64,
    pub band: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastInputs {
    /// Effective forecast confidence in `[0, 1]`.
    pub confidence_score: f64,
    pub band_width: f64,
    pub fragile: bool,
}

impl ForecastInputs {
    pub fn seed(&self) -> i64 {
        round_half_up(self.confidence_score * 100.0)
            + round_half_up(self.band_width * 19.0)
            + if self.fragile { 77 } else { 13 }
    }

    fn fragility_penalty(&self) -> f64 {
        if self.fragile {
            FRAGILITY_PENALTY
        } else {
            0.0
        }
    }

    /// Half-width of the uncertainty band before clamping.
    pub fn half_band(&self) -> f64 {
        let band_base = 5.0 + self.band_width / 100.0 * 22.0;
        band_base * (0.8 + (1.0 - self.confidence_score) * 1.4 + self.fragility_penalty())
    }
}

/// Forecast RT converges toward the realised RT as confidence rises; the
/// remaining gap is filled with a seeded bias.
pub fn generate_forecast_series(
    prices: &[PricePoint],
    inputs: &ForecastInputs,
) -> Vec<ForecastPoint> {
    let mut rng = SeededRng::from_signed_seed(inputs.seed());
    let confidence = inputs.confidence_score;
    let convergence = 0.45 + confidence * 0.55;
    let bias_scale = (1.0 - confidence + inputs.fragility_penalty()) * MAX_BIAS;
    let half_band = inputs.half_band();

    prices
        .iter()
        .map(|point| {
            let bias = rng.next_symmetric(bias_scale);
            let rt_forecast = point.da + (point.rt - point.da) * convergence + bias;
            let lower = rt_forecast - half_band;
            let upper = rt_forecast + half_band;

            // Band comes from the unclamped bounds, so it can disagree with
            // `upper - lower` once either bound hits its clamp.
            ForecastPoint {
                price: point.clone(),
                rt_forecast: rt_forecast.clamp(RT_FORECAST_RANGE.0, RT_FORECAST_RANGE.1),
                lower: lower.clamp(LOWER_BOUND_RANGE.0, LOWER_BOUND_RANGE.1),
                upper: upper.clamp(UPPER_BOUND_RANGE.0, UPPER_BOUND_RANGE.1),
                band: (upper - lower).clamp(BAND_RANGE.0, BAND_RANGE.1),
            }
        })
        .collect()
}

pub fn average_band(forecast: &[ForecastPoint]) -> f64 {
    if forecast.is_empty() {
        return 0.0;
    }
    forecast.iter().map(|point| point.band).sum::<f64>() / forecast.len() as f64
}
