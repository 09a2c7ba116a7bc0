use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use crate::events::RuntimeStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLogEventKind {
    TickStarted,
    DecisionEvaluated,
    DispatchApplied,
    PnlUpdated,
    BudgetsUpdated,
    ReplayArtifactWritten,
    ReplayRowWritten,
    ControlsUpdated,
    PresetApplied,
    SessionReset,
}

impl From<RuntimeStage> for RunLogEventKind {
    fn from(stage: RuntimeStage) -> Self {
        match stage {
            RuntimeStage::TickStarted => Self::TickStarted,
            RuntimeStage::DecisionEvaluated => Self::DecisionEvaluated,
            RuntimeStage::DispatchApplied => Self::DispatchApplied,
            RuntimeStage::PnlUpdated => Self::PnlUpdated,
            RuntimeStage::BudgetsUpdated => Self::BudgetsUpdated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogEvent {
    pub tick: u64,
    pub kind: RunLogEventKind,
    pub detail: Option<String>,
}

impl RunLogEvent {
    pub fn new(tick: u64, kind: RunLogEventKind, detail: Option<String>) -> Self {
        Self { tick, kind, detail }
    }
}

pub trait RunLogWriter {
    fn write(&mut self, event: RunLogEvent);
}

#[derive(Debug, Default)]
pub struct InMemoryRunLogWriter {
    events: Vec<RunLogEvent>,
}

impl InMemoryRunLogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RunLogEvent] {
        &self.events
    }
}

impl RunLogWriter for InMemoryRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        self.events.push(event);
    }
}

/// Collects into a shared buffer so a test can inspect events after the
/// writer has been moved into an engine.
#[derive(Debug, Clone, Default)]
pub struct SharedRunLog {
    events: Arc<Mutex<Vec<RunLogEvent>>>,
}

impl SharedRunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<RunLogEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RunLogWriter for SharedRunLog {
    fn write(&mut self, event: RunLogEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Forwards run-log events to `tracing`. Per-stage events go out at debug
/// level; session-level events at info.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunLogWriter;

impl RunLogWriter for TracingRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        let detail = event.detail.as_deref().unwrap_or("");
        match event.kind {
            RunLogEventKind::TickStarted
            | RunLogEventKind::DecisionEvaluated
            | RunLogEventKind::DispatchApplied
            | RunLogEventKind::PnlUpdated
            | RunLogEventKind::BudgetsUpdated
            | RunLogEventKind::ReplayRowWritten => {
                tracing::debug!(tick = event.tick, kind = ?event.kind, detail, "run log");
            }
            RunLogEventKind::ReplayArtifactWritten
            | RunLogEventKind::ControlsUpdated
            | RunLogEventKind::PresetApplied
            | RunLogEventKind::SessionReset => {
                tracing::info!(tick = event.tick, kind = ?event.kind, detail, "run log");
            }
        }
    }
}

/// Installs the global `tracing` subscriber. `filter` is an `EnvFilter`
/// directive such as `info` or `runtime=debug,api=info`; an unparsable
/// directive falls back to `info`. Repeated calls are ignored.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
