//! Generation orchestration engine
//!
//! Turns one user request into a set of concurrent, streamed,
//! independently-failable generation jobs, tracks their lifecycle through a
//! single serialized state store, and feeds a bounded version/undo ledger
//! from completed results. Site mode generates pages sequentially so every
//! page can style-match the finished home page.

mod accumulator;
mod draft;
mod engine;
mod frame;
mod job;
mod ledger;
mod pipeline;
mod prompts;
mod publish;
mod scheduler;
mod site;
mod state;

#[cfg(test)]
mod test_support;

pub use accumulator::StreamAccumulator;
pub use draft::DraftService;
pub use engine::Engine;
pub use frame::{decode_frame_message, FrameAction, FrameMessage};
pub use job::{Job, JobOutcome, JobTarget};
pub use ledger::{UndoState, VersionLedger};
pub use pipeline::{decode_style_list, fallback_styles, GenerationOptions, StyleDecision, StyleKit};
pub use publish::{HttpPublishBackend, PublishBackend, PublishMetadata};
pub use scheduler::{BatchScheduler, RetryPolicy};
pub use state::{apply, EngineState, StoreEvent, StoreHandle};
