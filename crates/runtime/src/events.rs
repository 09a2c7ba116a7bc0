use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStage {
    TickStarted,
    DecisionEvaluated,
    DispatchApplied,
    PnlUpdated,
    BudgetsUpdated,
}

impl RuntimeStage {
    pub const ORDERED: [RuntimeStage; 5] = [
        RuntimeStage::TickStarted,
        RuntimeStage::DecisionEvaluated,
        RuntimeStage::DispatchApplied,
        RuntimeStage::PnlUpdated,
        RuntimeStage::BudgetsUpdated,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeEvent {
    pub tick: u64,
    pub stage: RuntimeStage,
}

impl RuntimeEvent {
    pub fn new(tick: u64, stage: RuntimeStage) -> Self {
        Self { tick, stage }
    }
}
