pub mod decision;
pub mod diagnostics;
pub mod divergence;
pub mod rationale;
pub mod risk;
pub mod scoring;

pub use decision::{evaluate_decision, rank, Action, DecisionInputs, DecisionResult};
pub use diagnostics::{
    virtual_haircut_pct, Diagnostics, FailureModeImpact, GovernanceGauges, MAX_ANNUAL_CYCLES,
};
pub use divergence::{
    da_rt_spread, physical_direction, virtual_direction, PhysicalDirection, VirtualDirection,
};
pub use rationale::Rationale;
pub use risk::{
    confidence_label, confidence_score, cycle_tightness, loss_limit, loss_limit_breached,
    ConfidenceLabel, RiskContext,
};
pub use scoring::{StrategyKind, StrategyScore, SCORE_RANGE};
