use serde::Serialize;

use crate::controls::ControlsPatch;

/// Named control override used to stage a teaching scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub expected_action: &'static str,
    pub why: &'static str,
    pub settings: ControlsPatch,
}

pub fn scenario_presets() -> Vec<ScenarioPreset> {
    vec![
        ScenarioPreset {
            id: "evening-spread",
            name: "Evening spread, high confidence",
            expected_action: "Discharge into the evening peak",
            why: "A wide DA shape with a trusted forecast makes cycling worth the wear.",
            settings: ControlsPatch {
                spread_expectation: Some(80.0),
                volatility_expectation: Some(60.0),
                ancillary_price_level: Some(30.0),
                scarcity_likelihood: Some(10.0),
                confidence_index: Some(2.0),
                forecast_fragile: Some(false),
                soc: Some(75.0),
                cycle_budget_daily: Some(2.0),
                ..ControlsPatch::default()
            },
        },
        ScenarioPreset {
            id: "ancillary-rich",
            name: "Ancillary-rich day",
            expected_action: "Provide Ancillary",
            why: "AS prices pay for speed and availability while SOC sits mid-range.",
            settings: ControlsPatch {
                spread_expectation: Some(25.0),
                volatility_expectation: Some(25.0),
                ancillary_price_level: Some(95.0),
                scarcity_likelihood: Some(15.0),
                soc: Some(50.0),
                ramp_speed: Some(90.0),
                co_optimized: Some(true),
                ..ControlsPatch::default()
            },
        },
        ScenarioPreset {
            id: "scarcity-watch",
            name: "Scarcity watch",
            expected_action: "Hold SOC",
            why: "A likely scarcity event is worth more than today's ordinary spread.",
            settings: ControlsPatch {
                spread_expectation: Some(30.0),
                ancillary_price_level: Some(25.0),
                scarcity_likelihood: Some(90.0),
                confidence_index: Some(0.0),
                protect_scarcity: Some(true),
                reserved_soc: Some(40.0),
                soc: Some(70.0),
                ..ControlsPatch::default()
            },
        },
        ScenarioPreset {
            id: "mispriced-da",
            name: "Mispriced day-ahead",
            expected_action: "DA Virtual",
            why: "RT is forecast well away from DA and the cycle budget is nearly spent.",
            settings: ControlsPatch {
                spread_expectation: Some(70.0),
                volatility_expectation: Some(85.0),
                ancillary_price_level: Some(20.0),
                scarcity_likelihood: Some(5.0),
                confidence_index: Some(2.0),
                cycle_budget_daily: Some(0.3),
                virtual_mw: Some(120.0),
                use_virtuals_to_preserve_battery_life: Some(true),
                ..ControlsPatch::default()
            },
        },
        ScenarioPreset {
            id: "regime-shift",
            name: "Regime shift",
            expected_action: "Provide Ancillary or Hold SOC",
            why: "A fragile forecast haircuts every position that depends on it.",
            settings: ControlsPatch {
                confidence_index: Some(0.0),
                forecast_fragile: Some(true),
                band_width: Some(85.0),
                ..ControlsPatch::default()
            },
        },
        ScenarioPreset {
            id: "spread-chaser",
            name: "Break it: chase every spread",
            expected_action: "Charge / Discharge every interval",
            why: "Ignoring governance burns the cycle budget and degrades the asset.",
            settings: ControlsPatch {
                always_chase_spread: Some(true),
                ignore_confidence: Some(true),
                never_hold_scarcity: Some(true),
                ..ControlsPatch::default()
            },
        },
    ]
}

pub fn find_preset(id: &str) -> Option<ScenarioPreset> {
    scenario_presets().into_iter().find(|preset| preset.id == id)
}
