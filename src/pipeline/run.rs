//! Progress of one full generation run plus point regeneration
//!
//! Pure state: the App layer feeds it queue events and renders what it holds.

use crate::constants::{STATUS_READY, STATUS_WARMING_UP};
use crate::models::{GeneratedImage, Slot, SlotId, Storyboard};
use crate::network::backend::GenerationResult;

#[derive(Clone, Debug)]
pub struct GenerationRun {
    run_id: u64,
    slots: Vec<Slot>,
    images: Vec<GeneratedImage>,
    is_generating: bool,
    status: String,
    regenerating: Option<SlotId>,
}

impl GenerationRun {
    /// New run over the storyboard's eight slots, nothing generated yet
    pub fn new(run_id: u64, storyboard: &Storyboard) -> Self {
        GenerationRun {
            run_id,
            slots: storyboard.slots(),
            images: Vec::new(),
            is_generating: true,
            status: String::from(STATUS_WARMING_UP),
            regenerating: None,
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn images(&self) -> &[GeneratedImage] {
        &self.images
    }

    pub fn image(&self, id: SlotId) -> Option<&GeneratedImage> {
        self.images.iter().find(|img| img.id == id)
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    pub fn regenerating(&self) -> Option<SlotId> {
        self.regenerating
    }

    /// Full run or a regeneration is in flight
    pub fn is_busy(&self) -> bool {
        self.is_generating || self.regenerating.is_some()
    }

    /// Every slot attempted and every image present
    pub fn is_complete(&self) -> bool {
        !self.is_generating
            && self.images.len() == self.slots.len()
            && self.images.iter().all(GeneratedImage::is_ready)
    }

    /// Slot `index` was picked up by the queue
    pub fn slot_started(&mut self, index: usize) {
        if !self.is_generating || index != self.images.len() {
            return;
        }
        if let Some(slot) = self.slots.get(index) {
            self.status = format!(
                "Generating {}... ({}/{})",
                slot.label,
                index + 1,
                self.slots.len()
            );
        }
    }

    /// Record the outcome of slot `index`; out-of-order reports are ignored
    pub fn slot_finished(&mut self, index: usize, result: GenerationResult<String>) {
        if !self.is_generating || index != self.images.len() {
            tracing::warn!(run = self.run_id, index, expected = self.images.len(), "Ignoring out-of-order slot result");
            return;
        }
        let Some(slot) = self.slots.get(index) else {
            return;
        };

        let image = match result {
            Ok(base64) => GeneratedImage::succeeded(slot, base64),
            Err(e) => {
                tracing::error!(run = self.run_id, slot = %slot.id, error = %e, "Slot failed");
                GeneratedImage::failed(slot, e.to_string())
            }
        };
        self.images.push(image);

        if self.images.len() == self.slots.len() {
            self.status = String::from(STATUS_READY);
            self.is_generating = false;
            tracing::info!(
                run = self.run_id,
                failed = self.images.iter().filter(|i| !i.is_ready()).count(),
                "Run finished"
            );
        }
    }

    /// Claim a regeneration of `id`.
    ///
    /// Returns the prompt to request, or `None` (state untouched) while
    /// anything else is in flight or the slot has no image yet.
    pub fn begin_regeneration(&mut self, id: SlotId) -> Option<String> {
        if self.is_busy() {
            return None;
        }
        let prompt = self.image(id)?.prompt.clone();
        self.regenerating = Some(id);
        Some(prompt)
    }

    /// Apply a regeneration outcome. Returns a notice when it failed.
    pub fn finish_regeneration(
        &mut self,
        id: SlotId,
        result: GenerationResult<String>,
    ) -> Option<String> {
        if self.regenerating != Some(id) {
            return None;
        }
        self.regenerating = None;

        let base_label = self
            .slots
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.label.clone())
            .unwrap_or_else(|| id.label());
        let image = self.images.iter_mut().find(|img| img.id == id)?;

        match result {
            Ok(base64) => {
                image.base64 = base64;
                image.label = base_label;
                image.error = None;
                None
            }
            Err(e) => {
                tracing::error!(run = self.run_id, slot = %id, error = %e, "Regeneration failed");
                Some(format!("Failed to regenerate {}. Please try again.", base_label))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Panel;
    use crate::network::backend::GenerationError;

    fn storyboard() -> Storyboard {
        Storyboard {
            title: "Brush Bot".into(),
            front_cover_prompt: "front".into(),
            back_cover_prompt: "back".into(),
            panels: (1..=6).map(|i| Panel::new(format!("p{}", i), "")).collect(),
        }
    }

    fn fail() -> GenerationResult<String> {
        Err(GenerationError::Transport("down".into()))
    }

    fn run_all(run: &mut GenerationRun, failing: Option<usize>) -> Vec<String> {
        let mut statuses = Vec::new();
        for i in 0..8 {
            run.slot_started(i);
            statuses.push(run.status().to_string());
            let result = if Some(i) == failing { fail() } else { Ok(format!("b{}", i)) };
            run.slot_finished(i, result);
        }
        statuses
    }

    #[test]
    fn test_run_starts_warming_up() {
        let run = GenerationRun::new(1, &storyboard());
        assert!(run.is_generating());
        assert_eq!(run.status(), STATUS_WARMING_UP);
        assert!(!run.is_complete());
    }

    #[test]
    fn test_status_enumerates_slots_in_order() {
        let mut run = GenerationRun::new(1, &storyboard());
        let statuses = run_all(&mut run, None);
        assert_eq!(statuses[0], "Generating Front Cover... (1/8)");
        assert_eq!(statuses[3], "Generating Panel 3... (4/8)");
        assert_eq!(statuses[7], "Generating Back Cover... (8/8)");
        let ordinals: Vec<String> = (1..=8).map(|i| format!("({}/8)", i)).collect();
        for (status, ordinal) in statuses.iter().zip(&ordinals) {
            assert!(status.ends_with(ordinal.as_str()));
        }
        assert_eq!(run.status(), STATUS_READY);
        assert!(!run.is_generating());
        assert!(run.is_complete());
    }

    #[test]
    fn test_failed_slot_still_completes_run() {
        let mut run = GenerationRun::new(1, &storyboard());
        run_all(&mut run, Some(4));

        assert!(!run.is_generating());
        assert_eq!(run.images().len(), 8);
        assert_eq!(run.images().iter().filter(|i| !i.is_ready()).count(), 1);
        assert_eq!(run.images()[4].label, "Panel 4 (Failed)");
        assert!(!run.is_complete());
    }

    #[test]
    fn test_out_of_order_result_is_ignored() {
        let mut run = GenerationRun::new(1, &storyboard());
        run.slot_finished(2, Ok("x".into()));
        assert!(run.images().is_empty());
        run.slot_finished(0, Ok("x".into()));
        run.slot_finished(0, Ok("y".into()));
        assert_eq!(run.images().len(), 1);
    }

    #[test]
    fn test_regeneration_blocked_during_run() {
        let mut run = GenerationRun::new(1, &storyboard());
        run.slot_started(0);
        run.slot_finished(0, Ok("x".into()));
        assert_eq!(run.begin_regeneration(SlotId::FrontCover), None);
        assert_eq!(run.regenerating(), None);
    }

    #[test]
    fn test_second_regeneration_is_a_no_op() {
        let mut run = GenerationRun::new(1, &storyboard());
        run_all(&mut run, None);

        assert_eq!(run.begin_regeneration(SlotId::Panel(2)).as_deref(), Some("p2"));
        let before = format!("{:?}", run);
        assert_eq!(run.begin_regeneration(SlotId::Panel(5)), None);
        assert_eq!(run.begin_regeneration(SlotId::Panel(2)), None);
        assert_eq!(format!("{:?}", run), before);
    }

    #[test]
    fn test_regeneration_replaces_failed_image_in_place() {
        let mut run = GenerationRun::new(1, &storyboard());
        run_all(&mut run, Some(7));
        assert!(!run.is_complete());

        run.begin_regeneration(SlotId::BackCover);
        assert!(run.is_busy());
        assert_eq!(run.finish_regeneration(SlotId::BackCover, Ok("new".into())), None);

        let img = run.image(SlotId::BackCover).unwrap();
        assert_eq!(img.base64, "new");
        assert_eq!(img.label, "Back Cover");
        assert_eq!(run.images().len(), 8);
        assert!(run.is_complete());
    }

    #[test]
    fn test_failed_regeneration_keeps_previous_image() {
        let mut run = GenerationRun::new(1, &storyboard());
        run_all(&mut run, None);

        run.begin_regeneration(SlotId::Panel(1));
        let notice = run.finish_regeneration(SlotId::Panel(1), fail());
        assert_eq!(notice.as_deref(), Some("Failed to regenerate Panel 1. Please try again."));
        assert_eq!(run.image(SlotId::Panel(1)).unwrap().base64, "b1");
        assert!(!run.is_busy());
    }
}
