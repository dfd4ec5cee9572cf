//! Sketch previews for the storyboard review screen

use std::collections::HashMap;

use crate::constants::PREVIEW_PROMPT_PREFIX;
use crate::models::SlotId;
use crate::network::backend::GenerationResult;

/// Preview request text for a visual prompt
pub fn preview_prompt(prompt: &str) -> String {
    format!("{}{}", PREVIEW_PROMPT_PREFIX, prompt)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreviewSlot {
    pub loading: bool,
    pub image: Option<String>,
    pub error: Option<String>,
}

/// Per-slot preview state for one visit to the review screen
#[derive(Clone, Debug)]
pub struct PreviewBoard {
    epoch: u64,
    slots: HashMap<SlotId, PreviewSlot>,
}

impl PreviewBoard {
    pub fn new(epoch: u64) -> Self {
        PreviewBoard {
            epoch,
            slots: HashMap::new(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn get(&self, id: SlotId) -> Option<&PreviewSlot> {
        self.slots.get(&id)
    }

    pub fn is_loading(&self, id: SlotId) -> bool {
        self.slots.get(&id).map(|s| s.loading).unwrap_or(false)
    }

    /// Mark `id` as requested. False when a preview for it is already in flight.
    pub fn request(&mut self, id: SlotId) -> bool {
        let slot = self.slots.entry(id).or_default();
        if slot.loading {
            return false;
        }
        slot.loading = true;
        slot.error = None;
        true
    }

    /// Request every slot that has no preview yet, in the given order
    pub fn request_missing(&mut self, ids: &[SlotId]) -> Vec<SlotId> {
        let mut requested = Vec::new();
        for &id in ids {
            let has_image = self.get(id).map(|s| s.image.is_some()).unwrap_or(false);
            if !has_image && self.request(id) {
                requested.push(id);
            }
        }
        requested
    }

    /// Apply a finished preview. Results from another epoch are discarded.
    pub fn finished(&mut self, epoch: u64, id: SlotId, result: GenerationResult<String>) -> bool {
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, slot = %id, "Discarding stale preview");
            return false;
        }
        let slot = self.slots.entry(id).or_default();
        slot.loading = false;
        match result {
            Ok(base64) => {
                slot.image = Some(base64);
                slot.error = None;
            }
            Err(e) => {
                tracing::warn!(slot = %id, error = %e, "Preview failed");
                slot.error = Some(e.to_string());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::backend::GenerationError;

    #[test]
    fn test_no_concurrent_request_for_same_slot() {
        let mut board = PreviewBoard::new(1);
        assert!(board.request(SlotId::Panel(1)));
        assert!(!board.request(SlotId::Panel(1)));
        assert!(board.request(SlotId::Panel(2)));

        board.finished(1, SlotId::Panel(1), Ok("img".into()));
        assert!(board.request(SlotId::Panel(1)));
    }

    #[test]
    fn test_request_missing_skips_ready_and_loading_slots() {
        let mut board = PreviewBoard::new(1);
        board.request(SlotId::FrontCover);
        board.finished(1, SlotId::FrontCover, Ok("img".into()));
        board.request(SlotId::Panel(1));

        let ids = SlotId::all();
        let requested = board.request_missing(&ids);
        assert_eq!(requested.len(), 6);
        assert_eq!(requested[0], SlotId::Panel(2));
        assert_eq!(requested[5], SlotId::BackCover);
    }

    #[test]
    fn test_stale_epoch_is_discarded() {
        let mut board = PreviewBoard::new(2);
        board.request(SlotId::Panel(3));
        assert!(!board.finished(1, SlotId::Panel(3), Ok("old".into())));
        assert!(board.is_loading(SlotId::Panel(3)));
    }

    #[test]
    fn test_failure_keeps_previous_sketch() {
        let mut board = PreviewBoard::new(1);
        board.request(SlotId::BackCover);
        board.finished(1, SlotId::BackCover, Ok("first".into()));
        board.request(SlotId::BackCover);
        board.finished(1, SlotId::BackCover, Err(GenerationError::EmptyResponse));

        let slot = board.get(SlotId::BackCover).unwrap();
        assert_eq!(slot.image.as_deref(), Some("first"));
        assert!(slot.error.is_some());
        assert!(!slot.loading);
    }

    #[test]
    fn test_preview_prompt_prefix() {
        assert!(preview_prompt("a cat").ends_with("depicting: a cat"));
    }
}
