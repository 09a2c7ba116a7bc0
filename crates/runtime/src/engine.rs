use std::io::{self, Write};

use market_sim::{ControlsPatch, ScenarioPreset};

use crate::events::{RuntimeEvent, RuntimeStage};
use crate::logging::{RunLogEvent, RunLogEventKind, RunLogWriter, TracingRunLogWriter};
use crate::replay::ReplayCsvWriter;
use crate::session::{SimSession, TickReport};

pub type ReplaySink = ReplayCsvWriter<Box<dyn Write + Send>>;

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub tick: u64,
    pub report: TickReport,
    pub events: Vec<RuntimeEvent>,
}

/// Drives a [`SimSession`] tick by tick and reports each stage to the run log
/// and, when attached, the replay artifact.
pub struct SimEngine {
    session: SimSession,
    tick: u64,
    run_log: Box<dyn RunLogWriter + Send>,
    replay: Option<ReplaySink>,
}

impl SimEngine {
    pub fn new(session: SimSession) -> Self {
        Self::with_run_log(session, TracingRunLogWriter)
    }

    pub fn with_run_log(session: SimSession, run_log: impl RunLogWriter + Send + 'static) -> Self {
        Self {
            session,
            tick: 0,
            run_log: Box::new(run_log),
            replay: None,
        }
    }

    pub fn session(&self) -> &SimSession {
        &self.session
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Writes the replay header and keeps the sink for per-tick rows.
    pub fn attach_replay(&mut self, mut replay: ReplaySink) -> io::Result<()> {
        replay.write_header_and_log(self.tick, self.run_log.as_mut())?;
        self.replay = Some(replay);
        Ok(())
    }

    pub fn update_controls(&mut self, patch: &ControlsPatch) {
        self.session.update_controls(patch);
        let granularity = self.session.controls().granularity.as_str();
        self.log(
            RunLogEventKind::ControlsUpdated,
            Some(format!("granularity={granularity}")),
        );
    }

    pub fn apply_preset(&mut self, preset: &ScenarioPreset) {
        self.session.apply_preset(preset);
        self.log(RunLogEventKind::PresetApplied, Some(preset.id.to_string()));
    }

    pub fn reset(&mut self) {
        self.session.reset();
        self.log(RunLogEventKind::SessionReset, None);
    }

    pub async fn step_once(&mut self) -> StepOutcome {
        self.tick += 1;
        tokio::task::yield_now().await;

        let report = self.session.step();
        let events: Vec<RuntimeEvent> = RuntimeStage::ORDERED
            .iter()
            .map(|stage| RuntimeEvent::new(self.tick, *stage))
            .collect();

        for event in &events {
            let detail = stage_detail(event.stage, &report);
            self.log(event.stage.into(), detail);
        }
        self.append_replay_row(&report);

        StepOutcome {
            tick: self.tick,
            report,
            events,
        }
    }

    fn append_replay_row(&mut self, report: &TickReport) {
        let Some(replay) = self.replay.as_mut() else {
            return;
        };

        match replay.append_tick(self.tick, report) {
            Ok(()) => self.log(RunLogEventKind::ReplayRowWritten, None),
            Err(err) => {
                tracing::warn!(tick = self.tick, error = %err, "replay output disabled");
                self.replay = None;
            }
        }
    }

    fn log(&mut self, kind: RunLogEventKind, detail: Option<String>) {
        self.run_log.write(RunLogEvent::new(self.tick, kind, detail));
    }
}

fn stage_detail(stage: RuntimeStage, report: &TickReport) -> Option<String> {
    match stage {
        RuntimeStage::TickStarted => Some(format!("step={} time={}", report.step, report.time)),
        RuntimeStage::DecisionEvaluated => Some(format!(
            "action={} strategy={} virtual={}",
            report.decision.best_action.as_str(),
            report.decision.best_strategy.label(),
            report.decision.virtual_direction.as_str()
        )),
        RuntimeStage::DispatchApplied => Some(format!(
            "soc={:.2} cycle_use={:.3}",
            report.soc, report.effect.cycle_use
        )),
        RuntimeStage::PnlUpdated => Some(format!("total={:.2}", report.total_pnl)),
        RuntimeStage::BudgetsUpdated => Some(format!(
            "daily={:.3} annual={:.1}",
            report.cycle_budget_daily, report.cycle_budget_annual
        )),
    }
}
