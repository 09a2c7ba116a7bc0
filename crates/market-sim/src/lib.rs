mod controls;
mod forecast;
mod presets;
mod rng;
mod series;
mod state;

pub use controls::{Controls, ControlsPatch, IntervalGranularity};
pub use forecast::{
    average_band, generate_forecast_series, ForecastInputs, ForecastPoint, BAND_RANGE,
    LOWER_BOUND_RANGE, RT_FORECAST_RANGE, UPPER_BOUND_RANGE,
};
pub use presets::{find_preset, scenario_presets, ScenarioPreset};
pub use rng::{round_half_up, SeededRng};
pub use series::{
    average_rt, day_ahead_shape, format_time, generate_price_series, in_scarcity_window,
    PricePoint, SeriesInputs, DA_PRICE_RANGE, RT_PRICE_RANGE, SCARCITY_WINDOW,
};
pub use state::PnlBuckets;

#[cfg(test)]
mod tests {
    use super::{
        generate_forecast_series, generate_price_series, Controls, ForecastInputs, SeriesInputs,
    };

    #[test]
    fn controls_drive_the_full_series_pipeline() {
        let controls = Controls::default();
        let prices = generate_price_series(&SeriesInputs::from_controls(&controls));
        let forecast = generate_forecast_series(
            &prices,
            &ForecastInputs {
                confidence_score: 0.7,
                band_width: controls.band_width,
                fragile: controls.forecast_fragile,
            },
        );

        assert_eq!(prices.len(), controls.granularity.steps_per_day());
        assert_eq!(forecast.len(), prices.len());
    }
}
