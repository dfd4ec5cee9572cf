//! Sequential generation pipeline
//!
//! The queue serializes every image request; `GenerationRun` and
//! `PreviewBoard` track what the App layer shows for each slot.

pub mod preview;
pub mod queue;
pub mod run;

pub use preview::{preview_prompt, PreviewBoard, PreviewSlot};
pub use queue::ImageQueue;
pub use run::GenerationRun;
