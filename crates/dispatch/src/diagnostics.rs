use market_sim::Controls;
use serde::Serialize;

pub const MAX_ANNUAL_CYCLES: f64 = 365.0;

/// Remaining-budget ratios in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GovernanceGauges {
    pub daily_cycle_ratio: f64,
    pub annual_cycle_ratio: f64,
    pub virtual_exposure_ratio: f64,
}

impl GovernanceGauges {
    pub fn from_controls(controls: &Controls) -> Self {
        Self {
            daily_cycle_ratio: unit_ratio(
                controls.cycle_budget_daily,
                controls.max_daily_cycles.max(0.1),
            ),
            annual_cycle_ratio: unit_ratio(controls.cycle_budget_annual, MAX_ANNUAL_CYCLES),
            virtual_exposure_ratio: unit_ratio(
                controls.virtual_mw,
                controls.max_virtual_mw.max(1.0),
            ),
        }
    }
}

fn unit_ratio(value: f64, denominator: f64) -> f64 {
    (value / denominator).clamp(0.0, 1.0)
}

/// Percentage knocked off a virtual position for forecast uncertainty.
pub fn virtual_haircut_pct(confidence_score: f64, forecast_fragile: bool) -> f64 {
    let fragility = if forecast_fragile { 10.0 } else { 0.0 };
    (1.0 - confidence_score) * 100.0 + fragility
}

/// Indexed impact (100 = baseline) of the failure-mode overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FailureModeImpact {
    pub cycle_depletion: f64,
    pub risk_adjusted_pnl: f64,
    pub drawdown_risk: f64,
    pub engaged: bool,
}

impl FailureModeImpact {
    pub fn from_controls(controls: &Controls) -> Self {
        let weight = |flag: bool, amount: f64| if flag { amount } else { 0.0 };

        Self {
            cycle_depletion: 100.0
                + weight(controls.always_chase_spread, 40.0)
                + weight(controls.never_hold_scarcity, 20.0),
            risk_adjusted_pnl: 100.0
                - weight(controls.ignore_confidence, 20.0)
                - weight(controls.always_chase_spread, 15.0)
                - weight(controls.never_hold_scarcity, 10.0),
            drawdown_risk: 100.0
                + weight(controls.ignore_confidence, 25.0)
                + weight(controls.never_hold_scarcity, 20.0),
            engaged: controls.any_failure_mode(),
        }
    }
}

/// Read-only indicators served next to the decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Diagnostics {
    pub gauges: GovernanceGauges,
    pub virtual_haircut_pct: f64,
    pub failure_modes: FailureModeImpact,
}

impl Diagnostics {
    pub fn derive(controls: &Controls, confidence_score: f64) -> Self {
        Self {
            gauges: GovernanceGauges::from_controls(controls),
            virtual_haircut_pct: virtual_haircut_pct(confidence_score, controls.forecast_fragile),
            failure_modes: FailureModeImpact::from_controls(controls),
        }
    }
}
