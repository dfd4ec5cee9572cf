//! Network messages - communication between App and Network layers

use crate::models::{Credential, SlotId, Storyboard, StoryboardRequest, SuggestionKind};
use crate::network::backend::GenerationResult;

/// Why an image is being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePurpose {
    /// Slot `index` of full run `run`
    Final { run: u64, index: usize },
    /// Explicit redo of one slot of run `run`
    Regenerate { run: u64 },
    /// Sketch preview for review visit `epoch`
    Preview { epoch: u64 },
}

impl ImagePurpose {
    pub fn is_preview(&self) -> bool {
        matches!(self, ImagePurpose::Preview { .. })
    }
}

/// One queued image request
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub id: u64,
    pub credential: Credential,
    pub slot: SlotId,
    pub prompt: String,
    pub purpose: ImagePurpose,
}

/// Commands sent from App layer to Network layer
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    /// Brainstorm one addition to the story idea
    SuggestIdea {
        id: u64,
        credential: Credential,
        idea: String,
        kind: SuggestionKind,
    },
    /// Write a storyboard from the ideation form
    GenerateStoryboard {
        id: u64,
        credential: Credential,
        request: StoryboardRequest,
    },
    /// Queue one image request behind any pending ones
    GenerateImage(ImageJob),
    /// Forget preview requests that have not started yet
    DropPendingPreviews,
    /// Forget every image request that has not started yet
    DropPendingImages,
    /// Shutdown the network actor
    Shutdown,
}

/// Responses sent from Network layer to App layer
#[derive(Debug, Clone)]
pub enum NetworkResponse {
    /// Suggestion text, or the fixed apology when brainstorming failed
    IdeaSuggested {
        id: u64,
        kind: SuggestionKind,
        text: String,
        failed: bool,
    },
    /// Outcome of a storyboard request
    StoryboardGenerated {
        id: u64,
        result: GenerationResult<Storyboard>,
    },
    /// The queue picked up an image job
    ImageStarted {
        id: u64,
        slot: SlotId,
        purpose: ImagePurpose,
    },
    /// An image job finished, successfully or not
    ImageFinished {
        id: u64,
        slot: SlotId,
        purpose: ImagePurpose,
        result: GenerationResult<String>,
    },
}
