pub mod effects;
pub mod engine;
pub mod events;
pub mod logging;
pub mod replay;
pub mod runner;
pub mod session;

pub use effects::{apply_action, TickEffect};
pub use engine::{ReplaySink, SimEngine, StepOutcome};
pub use events::{RuntimeEvent, RuntimeStage};
pub use logging::{init_tracing, RunLogWriter, TracingRunLogWriter};
pub use runner::{run_ticks, shared, SharedEngine, TickPublisher};
pub use session::{SimSession, TickReport};
