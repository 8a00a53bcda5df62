pub mod config;
mod engine;
mod orchestrator;
mod types;

pub use engine::{select_winners, Compositor};
pub use orchestrator::{run_compositor, run_compositor_reported};
pub use types::{
    Composite, CompositeStats, NoOpReporter, PipelineStage, ProgressReporter, RunSummary,
};
