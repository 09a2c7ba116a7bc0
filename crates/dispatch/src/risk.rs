use market_sim::Controls;
use serde::{Deserialize, Serialize};

const CONFIDENCE_TABLE: [f64; 3] = [0.45, 0.70, 0.90];
const FRAGILE_CONFIDENCE_FACTOR: f64 = 0.85;
const CONFIDENCE_FLOOR: f64 = 0.20;
const CONFIDENCE_CEILING: f64 = 0.98;

const LOSS_LIMIT_BASE: f64 = 250.0;
const LOSS_LIMIT_PER_MW: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    Low,
    Medium,
    High,
}

pub fn confidence_label(index: u8) -> ConfidenceLabel {
    match index {
        0 => ConfidenceLabel::Low,
        1 => ConfidenceLabel::Medium,
        _ => ConfidenceLabel::High,
    }
}

pub fn confidence_score(index: u8, forecast_fragile: bool) -> f64 {
    let base = CONFIDENCE_TABLE[usize::from(index.min(2))];
    let factor = if forecast_fragile {
        FRAGILE_CONFIDENCE_FACTOR
    } else {
        1.0
    };
    (base * factor).clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
}

pub fn loss_limit(power_mw: f64) -> f64 {
    LOSS_LIMIT_BASE + power_mw * LOSS_LIMIT_PER_MW
}

pub fn loss_limit_breached(controls: &Controls, total_pnl: f64) -> bool {
    controls.loss_limit_enabled && total_pnl < -loss_limit(controls.power_mw)
}

/// Constraint-derived quantities shared by every scorer and by the rationale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskContext {
    pub confidence_score: f64,
    pub effective_min_soc: f64,
    /// Room to discharge, as a share of the usable SOC range.
    pub soc_headroom_up: f64,
    /// Room to charge, as a share of the usable SOC range.
    pub soc_headroom_down: f64,
    pub as_headroom: f64,
    pub cycle_tightness: f64,
    pub loss_limit_breached: bool,
}

impl RiskContext {
    pub fn derive(controls: &Controls, total_pnl: f64) -> Self {
        let effective_min_soc = controls.effective_min_soc();
        let soc_range = (controls.max_soc - effective_min_soc).max(1.0);
        let soc_headroom_up = ((controls.soc - effective_min_soc) / soc_range).clamp(0.0, 1.0);
        let soc_headroom_down = ((controls.max_soc - controls.soc) / soc_range).clamp(0.0, 1.0);

        Self {
            confidence_score: confidence_score(
                controls.confidence_index,
                controls.forecast_fragile,
            ),
            effective_min_soc,
            soc_headroom_up,
            soc_headroom_down,
            as_headroom: soc_headroom_up.min(soc_headroom_down).clamp(0.0, 1.0),
            cycle_tightness: cycle_tightness(controls),
            loss_limit_breached: loss_limit_breached(controls, total_pnl),
        }
    }
}

pub fn cycle_tightness(controls: &Controls) -> f64 {
    (1.0 - controls.cycle_budget_daily / controls.max_daily_cycles.max(0.1)).clamp(0.0, 1.0)
}
