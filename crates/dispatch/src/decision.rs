use market_sim::{in_scarcity_window, Controls, ForecastPoint};
use serde::Serialize;

use crate::divergence::{da_rt_spread, physical_direction, PhysicalDirection, VirtualDirection};
use crate::rationale::{build_rationale, Rationale};
use crate::risk::{confidence_label, ConfidenceLabel, RiskContext};
use crate::scoring::{score_all, ScoringContext, StrategyKind, StrategyScore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Charge,
    Discharge,
    #[serde(rename = "Provide Ancillary")]
    ProvideAncillary,
    #[serde(rename = "DA Virtual")]
    DaVirtual,
    #[serde(rename = "Hold SOC")]
    HoldSoc,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Charge => "Charge",
            Self::Discharge => "Discharge",
            Self::ProvideAncillary => "Provide Ancillary",
            Self::DaVirtual => "DA Virtual",
            Self::HoldSoc => "Hold SOC",
        }
    }

    pub fn for_strategy(kind: StrategyKind, direction: PhysicalDirection) -> Self {
        match kind {
            StrategyKind::Physical => match direction {
                PhysicalDirection::Charge => Self::Charge,
                PhysicalDirection::Discharge => Self::Discharge,
            },
            StrategyKind::Ancillary => Self::ProvideAncillary,
            StrategyKind::Virtual => Self::DaVirtual,
            StrategyKind::Hold => Self::HoldSoc,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub controls: &'a Controls,
    pub forecast: &'a [ForecastPoint],
    pub current_index: usize,
    pub average_rt: f64,
    pub total_pnl: f64,
}

impl DecisionInputs<'_> {
    /// Point under evaluation. Past-the-end indices resolve to the last
    /// point; an empty series resolves to a neutral zero point.
    pub fn point(&self) -> ForecastPoint {
        let index = self.current_index.min(self.forecast.len().saturating_sub(1));
        self.forecast.get(index).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResult {
    pub best_action: Action,
    pub best_strategy: StrategyKind,
    pub physical_direction: PhysicalDirection,
    pub virtual_direction: VirtualDirection,
    /// Declaration order, not ranked.
    pub strategy_scores: Vec<StrategyScore>,
    pub top_two: Vec<StrategyScore>,
    pub rationale: Rationale,
    pub confidence_label: ConfidenceLabel,
    pub confidence_score: f64,
    pub as_headroom: f64,
    pub cycle_tightness: f64,
    pub soc_headroom_up: f64,
    pub soc_headroom_down: f64,
    pub effective_min_soc: f64,
    pub loss_limit_breached: bool,
}

impl DecisionResult {
    pub fn score_of(&self, kind: StrategyKind) -> f64 {
        self.strategy_scores
            .iter()
            .find(|score| score.kind == kind)
            .map_or(0.0, |score| score.score)
    }
}

/// Stable descending sort; equal scores keep declaration order.
pub fn rank(scores: &[StrategyScore; 4]) -> [StrategyScore; 4] {
    let mut ranked = scores.clone();
    ranked.sort_by(|left, right| right.score.total_cmp(&left.score));
    ranked
}

pub fn evaluate_decision(inputs: &DecisionInputs<'_>) -> DecisionResult {
    let controls = inputs.controls;
    let point = inputs.point();
    let risk = RiskContext::derive(controls, inputs.total_pnl);
    let direction = physical_direction(point.rt_forecast, inputs.average_rt);
    let spread = da_rt_spread(&point);

    let ctx = ScoringContext {
        controls,
        risk: &risk,
        physical_direction: direction,
        da_rt_spread: spread,
    };
    let strategy_scores = score_all(&ctx);
    let [winner, runner_up, ..] = rank(&strategy_scores);

    let rationale = build_rationale(
        controls,
        &risk,
        &winner,
        Some(&runner_up),
        in_scarcity_window(point.price.hour),
    );

    DecisionResult {
        best_action: Action::for_strategy(winner.kind, direction),
        best_strategy: winner.kind,
        physical_direction: direction,
        virtual_direction: ctx.virtual_direction(),
        strategy_scores: strategy_scores.to_vec(),
        top_two: vec![winner, runner_up],
        rationale,
        confidence_label: confidence_label(controls.confidence_index),
        confidence_score: risk.confidence_score,
        as_headroom: risk.as_headroom,
        cycle_tightness: risk.cycle_tightness,
        soc_headroom_up: risk.soc_headroom_up,
        soc_headroom_down: risk.soc_headroom_down,
        effective_min_soc: risk.effective_min_soc,
        loss_limit_breached: risk.loss_limit_breached,
    }
}

#[cfg(test)]
mod tests {
    use market_sim::{ForecastPoint, PricePoint};

    use super::*;
    use crate::scoring::StrategyKind;

    fn scored(kind: StrategyKind, score: f64) -> StrategyScore {
        StrategyScore {
            kind,
            score,
            label: kind.label(),
            detail: "",
        }
    }

    fn point(hour: f64, da: f64, rt_forecast: f64) -> ForecastPoint {
        ForecastPoint {
            price: PricePoint {
                hour,
                da,
                rt: rt_forecast,
                ..PricePoint::default()
            },
            rt_forecast,
            ..ForecastPoint::default()
        }
    }

    #[test]
    fn ties_go_to_the_earlier_declared_strategy() {
        let scores = [
            scored(StrategyKind::Physical, 40.0),
            scored(StrategyKind::Ancillary, 55.0),
            scored(StrategyKind::Virtual, 55.0),
            scored(StrategyKind::Hold, 55.0),
        ];

        let ranked = rank(&scores);

        assert_eq!(ranked[0].kind, StrategyKind::Ancillary);
        assert_eq!(ranked[1].kind, StrategyKind::Virtual);
        assert_eq!(ranked[2].kind, StrategyKind::Hold);
        assert_eq!(ranked[3].kind, StrategyKind::Physical);
    }

    #[test]
    fn action_follows_physical_direction() {
        assert_eq!(
            Action::for_strategy(StrategyKind::Physical, PhysicalDirection::Charge),
            Action::Charge
        );
        assert_eq!(
            Action::for_strategy(StrategyKind::Hold, PhysicalDirection::Charge),
            Action::HoldSoc
        );
    }

    #[test]
    fn index_past_the_end_uses_last_point() {
        let forecast = vec![point(0.0, 30.0, 30.0), point(0.25, 40.0, 90.0)];
        let controls = Controls::default();
        let inputs = DecisionInputs {
            controls: &controls,
            forecast: &forecast,
            current_index: 50,
            average_rt: 40.0,
            total_pnl: 0.0,
        };

        assert_eq!(inputs.point(), forecast[1]);
    }

    #[test]
    fn empty_forecast_evaluates_against_neutral_point() {
        let controls = Controls::default();
        let result = evaluate_decision(&DecisionInputs {
            controls: &controls,
            forecast: &[],
            current_index: 0,
            average_rt: 0.0,
            total_pnl: 0.0,
        });

        assert_eq!(result.strategy_scores.len(), 4);
        assert_eq!(result.physical_direction, PhysicalDirection::Discharge);
        assert_eq!(result.virtual_direction, VirtualDirection::IncLike);
    }

    #[test]
    fn result_keeps_declaration_order_and_top_two_ranked() {
        let forecast = vec![point(12.0, 40.0, 45.0)];
        let controls = Controls::default();
        let result = evaluate_decision(&DecisionInputs {
            controls: &controls,
            forecast: &forecast,
            current_index: 0,
            average_rt: 40.0,
            total_pnl: 0.0,
        });

        let kinds: Vec<_> = result.strategy_scores.iter().map(|score| score.kind).collect();
        assert_eq!(kinds, StrategyKind::ALL.to_vec());
        assert_eq!(result.top_two.len(), 2);
        assert!(result.top_two[0].score >= result.top_two[1].score);
        assert_eq!(result.top_two[0].kind, result.best_strategy);
    }

    #[test]
    fn trace_note_flags_the_scarcity_window() {
        let forecast = vec![point(18.0, 80.0, 95.0)];
        let controls = Controls::default();
        let result = evaluate_decision(&DecisionInputs {
            controls: &controls,
            forecast: &forecast,
            current_index: 0,
            average_rt: 40.0,
            total_pnl: 0.0,
        });

        assert!(result.rationale.trace_note.contains("scarcity window"));
    }

    #[test]
    fn action_serializes_with_display_labels() {
        let json = serde_json::to_string(&Action::HoldSoc).unwrap();

        assert_eq!(json, "\"Hold SOC\"");
        assert_eq!(Action::DaVirtual.as_str(), "DA Virtual");
    }
}
