use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::engine::{SimEngine, StepOutcome};

pub type SharedEngine = Arc<Mutex<SimEngine>>;

pub fn shared(engine: SimEngine) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

/// Receives every completed tick, outside the engine lock.
pub trait TickPublisher: Send + Sync + 'static {
    fn publish_tick(&self, outcome: &StepOutcome);
}

fn tick_interval(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Fires ticks at the granularity's cadence until `shutdown` flips to true
/// or its sender is dropped. Each tick holds the engine lock end to end.
pub async fn run_ticks<P: TickPublisher>(
    engine: SharedEngine,
    publisher: P,
    mut shutdown: watch::Receiver<bool>,
) {
    if *shutdown.borrow() {
        return;
    }

    let mut period = engine.lock().await.session().controls().granularity.tick_period();
    let mut ticker = tick_interval(period);
    tracing::info!(period_ms = period.as_millis() as u64, "tick loop started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let (outcome, next_period) = {
                    let mut engine = engine.lock().await;
                    let outcome = engine.step_once().await;
                    let next_period = engine.session().controls().granularity.tick_period();
                    (outcome, next_period)
                };
                publisher.publish_tick(&outcome);

                if next_period != period {
                    tracing::info!(
                        period_ms = next_period.as_millis() as u64,
                        "tick cadence changed"
                    );
                    period = next_period;
                    ticker = tick_interval(period);
                }
            }
        }
    }

    tracing::info!("tick loop stopped");
}
