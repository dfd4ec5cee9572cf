//! Network layer - generation API client and the actor that drives it
//!
//! The Network actor receives generation commands and sends back responses.

pub mod actor;
pub mod backend;
pub mod client;

pub use actor::NetworkActor;
pub use backend::{GenerationBackend, GenerationError, GenerationResult};
pub use client::GeminiClient;
