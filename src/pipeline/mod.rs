//! Pipeline components: reorder buffer, enqueue, fetch pool, archive consumer, orchestration.

pub mod consumer;
pub mod context;
pub mod enqueue;
pub mod error_handler;
pub mod fetch;
pub mod orchestrator;
pub mod reorder;
pub mod sequential;

pub use consumer::{ConsumerOutcome, run_consumer_loop, spawn_consumer_thread, write_record};
pub use context::{
    CancelToken, PipelineChannels, PipelineContext, PipelineHandles, PipelineHooks, WorkerGuard,
    create_pipeline_channels,
};
pub use enqueue::{run_enqueue_loop, spawn_enqueue_thread};
pub use error_handler::{check_for_first_error_or_skipped, log_skipped};
pub use fetch::spawn_fetch_workers;
pub use orchestrator::{run_pipeline, shutdown_pipeline_handles};
pub use reorder::{ReorderBuffer, TakeOutcome};
pub use sequential::run_sequential;
