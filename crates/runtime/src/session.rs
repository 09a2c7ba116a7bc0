use dispatch::{confidence_score, evaluate_decision, DecisionInputs, DecisionResult, Diagnostics};
use market_sim::{
    average_rt, generate_forecast_series, generate_price_series, Controls, ControlsPatch,
    ForecastInputs, ForecastPoint, PnlBuckets, PricePoint, ScenarioPreset, SeriesInputs,
};
use serde::Serialize;

use crate::effects::{apply_action, TickEffect, ANNUAL_CYCLES_PER_DAILY_CYCLE};

/// What one tick decided and did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub step: usize,
    pub next_step: usize,
    pub time: String,
    pub price: PricePoint,
    pub rt_forecast: f64,
    pub decision: DecisionResult,
    pub effect: TickEffect,
    pub soc: f64,
    pub cycle_budget_daily: f64,
    pub cycle_budget_annual: f64,
    pub pnl: PnlBuckets,
    pub total_pnl: f64,
}

/// Single owner of the mutable simulation state: controls, P&L, step
/// position and the cached series derived from the controls.
#[derive(Debug, Clone)]
pub struct SimSession {
    controls: Controls,
    pnl: PnlBuckets,
    step: usize,
    series_inputs: SeriesInputs,
    forecast_inputs: ForecastInputs,
    prices: Vec<PricePoint>,
    forecast: Vec<ForecastPoint>,
    average_rt: f64,
}

fn forecast_inputs(controls: &Controls) -> ForecastInputs {
    ForecastInputs {
        confidence_score: confidence_score(controls.confidence_index, controls.forecast_fragile),
        band_width: controls.band_width,
        fragile: controls.forecast_fragile,
    }
}

impl Default for SimSession {
    fn default() -> Self {
        Self::new(Controls::default())
    }
}

impl SimSession {
    pub fn new(controls: Controls) -> Self {
        let controls = controls.normalized();
        let series_inputs = SeriesInputs::from_controls(&controls);
        let forecast_inputs = forecast_inputs(&controls);
        let prices = generate_price_series(&series_inputs);
        let forecast = generate_forecast_series(&prices, &forecast_inputs);
        let average_rt = average_rt(&prices);

        Self {
            controls,
            pnl: PnlBuckets::default(),
            step: 0,
            series_inputs,
            forecast_inputs,
            prices,
            forecast,
            average_rt,
        }
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn pnl(&self) -> &PnlBuckets {
        &self.pnl
    }

    pub fn current_step(&self) -> usize {
        self.step
    }

    pub fn prices(&self) -> &[PricePoint] {
        &self.prices
    }

    pub fn forecast(&self) -> &[ForecastPoint] {
        &self.forecast
    }

    pub fn average_rt(&self) -> f64 {
        self.average_rt
    }

    pub fn decision(&self) -> DecisionResult {
        evaluate_decision(&DecisionInputs {
            controls: &self.controls,
            forecast: &self.forecast,
            current_index: self.step,
            average_rt: self.average_rt,
            total_pnl: self.pnl.total(),
        })
    }

    pub fn diagnostics(&self, decision: &DecisionResult) -> Diagnostics {
        Diagnostics::derive(&self.controls, decision.confidence_score)
    }

    /// Applies a partial update. Series are only rebuilt when one of their
    /// generating inputs moved; a granularity change restarts the day.
    pub fn update_controls(&mut self, patch: &ControlsPatch) {
        let previous_granularity = self.controls.granularity;
        self.controls = self.controls.apply_patch(patch);
        self.refresh_series();

        if self.controls.granularity != previous_granularity {
            self.step = 0;
        }
    }

    pub fn apply_preset(&mut self, preset: &ScenarioPreset) {
        self.update_controls(&preset.settings);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.pnl = PnlBuckets::default();
        self.step = 0;
    }

    fn refresh_series(&mut self) {
        let series_inputs = SeriesInputs::from_controls(&self.controls);
        let forecast_inputs = forecast_inputs(&self.controls);
        let prices_stale = series_inputs != self.series_inputs;

        if prices_stale {
            self.prices = generate_price_series(&series_inputs);
            self.average_rt = average_rt(&self.prices);
            self.series_inputs = series_inputs;
        }
        if prices_stale || forecast_inputs != self.forecast_inputs {
            self.forecast = generate_forecast_series(&self.prices, &forecast_inputs);
            self.forecast_inputs = forecast_inputs;
        }
    }

    /// Runs one interval: decide, dispatch, book P&L, draw down budgets and
    /// advance the step, all against the same snapshot.
    pub fn step(&mut self) -> TickReport {
        let step = self.step.min(self.prices.len().saturating_sub(1));
        let price = self.prices.get(step).cloned().unwrap_or_default();
        let forecast_point = self.forecast.get(step).cloned().unwrap_or_default();

        let decision = self.decision();
        let effect = apply_action(&self.controls, &decision, &price, &forecast_point);

        self.pnl.accumulate(&effect.pnl_delta);
        self.controls.soc = effect.next_soc;
        self.controls.cycle_budget_daily =
            (self.controls.cycle_budget_daily - effect.cycle_use).max(0.0);
        self.controls.cycle_budget_annual = (self.controls.cycle_budget_annual
            - effect.cycle_use * ANNUAL_CYCLES_PER_DAILY_CYCLE)
            .max(0.0);

        let steps = self.prices.len().max(1);
        self.step = (step + 1) % steps;

        TickReport {
            step,
            next_step: self.step,
            time: price.time.clone(),
            rt_forecast: forecast_point.rt_forecast,
            price,
            decision,
            effect,
            soc: self.controls.soc,
            cycle_budget_daily: self.controls.cycle_budget_daily,
            cycle_budget_annual: self.controls.cycle_budget_annual,
            pnl: self.pnl,
            total_pnl: self.pnl.total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use market_sim::{find_preset, Controls, ControlsPatch, IntervalGranularity, PnlBuckets};

    use super::SimSession;

    #[test]
    fn new_session_builds_one_day_of_series() {
        let session = SimSession::default();

        assert_eq!(session.prices().len(), 96);
        assert_eq!(session.forecast().len(), 96);
        assert_eq!(session.current_step(), 0);
        assert_eq!(session.pnl().total(), 0.0);
    }

    #[test]
    fn soc_and_budgets_stay_in_bounds_over_two_days() {
        let mut session = SimSession::new(Controls {
            always_chase_spread: true,
            ignore_confidence: true,
            never_hold_scarcity: true,
            ..Controls::default()
        });

        for _ in 0..(96 * 2) {
            let report = session.step();
            let controls = session.controls();

            assert!(report.soc >= controls.effective_min_soc() - 1e-9);
            assert!(report.soc <= controls.max_soc + 1e-9);
            assert!(controls.cycle_budget_daily >= 0.0);
            assert!(controls.cycle_budget_annual >= 0.0);
            assert!(report.total_pnl.is_finite());
        }
    }

    #[test]
    fn step_wraps_at_end_of_day() {
        let mut session = SimSession::default();

        for _ in 0..95 {
            session.step();
        }
        assert_eq!(session.current_step(), 95);

        let report = session.step();
        assert_eq!(report.step, 95);
        assert_eq!(report.next_step, 0);
        assert_eq!(session.current_step(), 0);
    }

    #[test]
    fn granularity_change_resets_step_and_resizes_series() {
        let mut session = SimSession::default();
        session.step();
        session.step();

        session.update_controls(&ControlsPatch {
            granularity: Some(IntervalGranularity::FiveMinute),
            ..ControlsPatch::default()
        });

        assert_eq!(session.current_step(), 0);
        assert_eq!(session.prices().len(), 288);
        assert_eq!(session.forecast().len(), 288);
    }

    #[test]
    fn non_generating_change_keeps_series_and_step() {
        let mut session = SimSession::default();
        session.step();
        let prices_before = session.prices().to_vec();
        let forecast_before = session.forecast().to_vec();

        session.update_controls(&ControlsPatch {
            virtual_mw: Some(10.0),
            ..ControlsPatch::default()
        });

        assert_eq!(session.current_step(), 1);
        assert_eq!(session.prices(), prices_before.as_slice());
        assert_eq!(session.forecast(), forecast_before.as_slice());
    }

    #[test]
    fn band_change_rebuilds_forecast_only() {
        let mut session = SimSession::default();
        let prices_before = session.prices().to_vec();
        let forecast_before = session.forecast().to_vec();

        session.update_controls(&ControlsPatch {
            band_width: Some(90.0),
            ..ControlsPatch::default()
        });

        assert_eq!(session.prices(), prices_before.as_slice());
        assert_ne!(session.forecast(), forecast_before.as_slice());
    }

    #[test]
    fn preset_applies_settings_and_resets_run() {
        let mut session = SimSession::default();
        for _ in 0..10 {
            session.step();
        }
        let preset = find_preset("scarcity-watch").expect("preset exists");

        session.apply_preset(&preset);

        assert_eq!(session.current_step(), 0);
        assert_eq!(*session.pnl(), PnlBuckets::default());
        assert_eq!(session.controls().scarcity_likelihood, 90.0);
    }

    #[test]
    fn reset_clears_pnl_but_keeps_controls() {
        let mut session = SimSession::default();
        for _ in 0..5 {
            session.step();
        }
        let soc = session.controls().soc;

        session.reset();

        assert_eq!(session.current_step(), 0);
        assert_eq!(session.pnl().total(), 0.0);
        assert_eq!(session.controls().soc, soc);
    }

    #[test]
    fn tick_report_serializes_pnl_with_bucket_names() {
        let mut session = SimSession::default();
        let report = session.step();

        let json = serde_json::to_value(&report).unwrap();

        assert!(json["pnl"].get("virtual").is_some());
        assert!(json["decision"]["best_action"].is_string());
        assert_eq!(json["time"], "00:00");
    }

    #[test]
    fn ticks_are_deterministic_for_identical_sessions() {
        let mut left = SimSession::default();
        let mut right = SimSession::default();

        for _ in 0..20 {
            assert_eq!(left.step(), right.step());
        }
    }
}
