use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use market_sim::{Controls, PnlBuckets};
use runtime::{shared, SharedEngine, SimEngine, SimSession, StepOutcome, TickPublisher};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum StartRunError {
    #[error("run id space exhausted")]
    RunIdOverflow,
}

/// Event pushed to `/ws/events` subscribers.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    Connected {
        run_id: Option<u64>,
    },
    RunStarted {
        run_id: u64,
    },
    Tick {
        tick: u64,
        step: usize,
        time: String,
        action: &'static str,
        strategy: &'static str,
        soc: f64,
        pnl: PnlBuckets,
        total_pnl: f64,
    },
    PresetApplied {
        preset_id: String,
    },
    ControlsUpdated {
        controls: Controls,
    },
}

impl RuntimeEvent {
    pub fn connected(run_id: Option<u64>) -> Self {
        Self::Connected { run_id }
    }

    pub fn run_started(run_id: u64) -> Self {
        Self::RunStarted { run_id }
    }

    pub fn tick(outcome: &StepOutcome) -> Self {
        let report = &outcome.report;
        Self::Tick {
            tick: outcome.tick,
            step: report.step,
            time: report.time.clone(),
            action: report.decision.best_action.as_str(),
            strategy: report.decision.best_strategy.label(),
            soc: report.soc,
            pnl: report.pnl,
            total_pnl: report.total_pnl,
        }
    }

    pub fn preset_applied(preset_id: impl Into<String>) -> Self {
        Self::PresetApplied {
            preset_id: preset_id.into(),
        }
    }

    pub fn controls_updated(controls: Controls) -> Self {
        Self::ControlsUpdated { controls }
    }
}

#[derive(Clone)]
pub struct AppState {
    engine: SharedEngine,
    next_run_id: Arc<AtomicU64>,
    events_tx: broadcast::Sender<RuntimeEvent>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(shared(SimEngine::new(SimSession::default())))
    }
}

impl AppState {
    pub fn new(engine: SharedEngine) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine,
            next_run_id: Arc::new(AtomicU64::new(0)),
            events_tx,
        }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    pub fn start_run(&self) -> Result<u64, StartRunError> {
        let previous = self
            .next_run_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_add(1)
            })
            .map_err(|_| StartRunError::RunIdOverflow)?;

        Ok(previous + 1)
    }

    /// Most recently started run, if any.
    pub fn current_run_id(&self) -> Option<u64> {
        match self.next_run_id.load(Ordering::Relaxed) {
            0 => None,
            run_id => Some(run_id),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.events_tx.subscribe()
    }

    /// Sends to current subscribers; having none is not an error.
    pub fn publish_event(&self, event: RuntimeEvent) -> usize {
        self.events_tx.send(event).unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn with_next_run_id_for_test(next_run_id: u64) -> Self {
        let state = Self::default();
        state.next_run_id.store(next_run_id, Ordering::Relaxed);
        state
    }
}

impl TickPublisher for AppState {
    fn publish_tick(&self, outcome: &StepOutcome) {
        self.publish_event(RuntimeEvent::tick(outcome));
    }
}
