//! # Comic Crafter TUI
//!
//! A terminal wizard that turns a story idea into an eight-page comic.
//!
//! ## Features
//! - API key entry with local persistence
//! - Idea brainstorming and art style selection
//! - Editable storyboard with sketch previews
//! - Sequential cover and panel generation with per-image regeneration
//! - PDF and PNG export of the composed comic page
//!
//! ## Architecture
//! Actor-based with channels:
//! - UI Layer (Ratatui) - synchronous
//! - App Layer (Wizard state machine)
//! - Network Layer (Tokio runtime, single-worker image queue)

pub mod app;
pub mod config;
pub mod constants;
pub mod export;
pub mod messages;
pub mod models;
pub mod network;
pub mod pipeline;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use app::{AppActor, AppState, Step, Wizard};
pub use config::Config;
pub use export::{ExportError, ExportRequest};
pub use messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};
pub use models::{ArtStyle, Credential, ExportFormat, ExportQuality, SlotId, Storyboard};
pub use network::{GeminiClient, GenerationBackend, GenerationError, NetworkActor};
