use market_sim::{format_time, Controls, SCARCITY_WINDOW};
use serde::Serialize;

use crate::risk::RiskContext;
use crate::scoring::{StrategyKind, StrategyScore};

const TIGHT_CYCLE_BUDGET: f64 = 0.65;
const BINDING_HEADROOM: f64 = 0.2;
const LOW_CONFIDENCE: f64 = 0.6;
const CYCLE_PRESSURE: f64 = 0.5;
const ANCILLARY_LIMITED_HEADROOM: f64 = 0.3;

/// Five-line explanation attached to every decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rationale {
    pub signal: String,
    pub constraint: String,
    pub risk: String,
    pub alternative: String,
    pub trace_note: String,
}

pub fn signal_note(winner: StrategyKind) -> &'static str {
    match winner {
        StrategyKind::Virtual => "DA-RT mispricing is forecastable with enough confidence.",
        StrategyKind::Ancillary => "Ancillary prices pay for speed and availability.",
        StrategyKind::Physical => "The spread and volatility justify cycling right now.",
        StrategyKind::Hold => "Scarcity optionality outweighs near-term spreads.",
    }
}

pub fn constraint_note(controls: &Controls, risk: &RiskContext) -> &'static str {
    if risk.cycle_tightness > TIGHT_CYCLE_BUDGET {
        "Cycle budget is tight; low-throughput options are favored."
    } else if risk.soc_headroom_up < BINDING_HEADROOM
        || risk.soc_headroom_down < BINDING_HEADROOM
    {
        "SOC headroom is binding; feasibility limits dispatch."
    } else if controls.co_optimized {
        "RTC+B requires SOC feasibility every interval."
    } else {
        "SOC bounds and exposure caps frame the decision."
    }
}

pub fn risk_note(controls: &Controls, risk: &RiskContext) -> &'static str {
    if controls.forecast_fragile {
        "Regime shift risk is elevated; avoid over-committing."
    } else if risk.confidence_score < LOW_CONFIDENCE {
        "Low confidence raises forecast error risk."
    } else if controls.always_chase_spread {
        "Spread chasing accelerates degradation."
    } else {
        "Risk-adjusted returns dominate raw spreads."
    }
}

/// Explains why the runner-up lost.
pub fn alternative_note(runner_up: Option<&StrategyScore>, risk: &RiskContext) -> String {
    let Some(runner_up) = runner_up else {
        return "No close alternative was competitive.".to_string();
    };

    let specific = match runner_up.kind {
        StrategyKind::Physical if risk.cycle_tightness > CYCLE_PRESSURE => {
            Some("Physical cycling was rejected due to cycle pressure.")
        }
        StrategyKind::Virtual if risk.confidence_score < LOW_CONFIDENCE => {
            Some("Virtuals were rejected due to confidence haircuts.")
        }
        StrategyKind::Ancillary if risk.as_headroom < ANCILLARY_LIMITED_HEADROOM => {
            Some("Ancillary was limited by SOC headroom.")
        }
        _ => None,
    };

    match specific {
        Some(note) => note.to_string(),
        None => format!("{} lost on risk-adjusted value.", runner_up.label),
    }
}

pub fn trace_note(winner: &StrategyScore, in_scarcity_window: bool) -> String {
    let mut note = format!("{} wins after confidence and cycle adjustments.", winner.label);
    if in_scarcity_window {
        note.push_str(&format!(
            " Interval sits inside the {}-{} scarcity window.",
            format_time(SCARCITY_WINDOW.0),
            format_time(SCARCITY_WINDOW.1)
        ));
    }
    note
}

pub fn build_rationale(
    controls: &Controls,
    risk: &RiskContext,
    winner: &StrategyScore,
    runner_up: Option<&StrategyScore>,
    in_scarcity_window: bool,
) -> Rationale {
    Rationale {
        signal: signal_note(winner.kind).to_string(),
        constraint: constraint_note(controls, risk).to_string(),
        risk: risk_note(controls, risk).to_string(),
        alternative: alternative_note(runner_up, risk),
        trace_note: trace_note(winner, in_scarcity_window),
    }
}
