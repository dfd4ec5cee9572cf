//! Command handlers - business logic for processing UI events
//!
//! Handlers mutate `AppState` and return the network commands to send, if any.
//! A handler that does not apply to the current step or busy state is a no-op.

use crate::app::state::{GenerationState, ReviewState};
use crate::app::wizard::{Step, Transition};
use crate::app::AppState;
use crate::constants::ART_STYLE_REQUIRED;
use crate::export::{ExportError, ExportRequest};
use crate::messages::network::{ImageJob, ImagePurpose};
use crate::messages::ui_events::{Field, InputMode};
use crate::messages::{NetworkCommand, NetworkResponse, Notice};
use crate::models::{
    Credential, ExportFormat, ExportQuality, SlotId, Storyboard, StoryboardRequest, SuggestionKind,
};
use crate::pipeline::{preview_prompt, GenerationRun, PreviewBoard};

impl AppState {
    // ========================
    // Input editing
    // ========================

    pub fn start_editing(&mut self) {
        if !self.field_is_editable() {
            return;
        }
        self.input_mode = InputMode::Editing;
        self.cursor_position = self.current_input().map(str::len).unwrap_or(0);
    }

    pub fn stop_editing(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn next_field(&mut self) {
        self.active_field = self.active_field.next();
        if self.input_mode == InputMode::Editing && !self.field_is_editable() {
            self.input_mode = InputMode::Normal;
        }
        self.cursor_position = self.current_input().map(str::len).unwrap_or(0);
    }

    /// Whether the focused field exists and accepts input right now
    fn field_is_editable(&self) -> bool {
        let busy = match self.step() {
            Step::Ideation => self.ideation.is_busy(),
            Step::Generation => true,
            _ => false,
        };
        !busy && self.current_input().is_some()
    }

    pub fn move_cursor_left(&mut self) {
        let Some(input) = self.current_input() else {
            return;
        };
        if self.cursor_position > 0 {
            let new_pos = input[..self.cursor_position]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.cursor_position = new_pos;
        }
    }

    pub fn move_cursor_right(&mut self) {
        let Some(input) = self.current_input() else {
            return;
        };
        if self.cursor_position < input.len() {
            let new_pos = input[self.cursor_position..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor_position + i)
                .unwrap_or(input.len());
            self.cursor_position = new_pos;
        }
    }

    pub fn enter_char(&mut self, c: char) {
        let cursor_pos = self.cursor_position;
        let Some(input) = self.current_input_mut() else {
            return;
        };
        if cursor_pos <= input.len() {
            input.insert(cursor_pos, c);
            self.cursor_position = cursor_pos + c.len_utf8();
        }
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        let cursor_pos = self.cursor_position;
        let Some(input) = self.current_input_mut() else {
            return;
        };
        let prev_pos = input[..cursor_pos]
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);
        input.remove(prev_pos);
        self.cursor_position = prev_pos;
    }

    // ========================
    // Popups
    // ========================

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn close_help(&mut self) {
        self.show_help = false;
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // ========================
    // Step transitions
    // ========================

    /// Bring per-step data in line with the step the wizard now sits on
    fn apply_transition(&mut self, transition: Transition) -> Vec<NetworkCommand> {
        let step = match transition {
            Transition::Ignored => return Vec::new(),
            Transition::Entered(step) => step,
            Transition::Healed(step) => {
                tracing::warn!(?step, "Wizard healed itself");
                if step == Step::CredentialEntry {
                    self.forget_stored_credential();
                }
                step
            }
        };

        let mut commands = Vec::new();
        if step != Step::StoryboardReview && self.review.take().is_some() {
            commands.push(NetworkCommand::DropPendingPreviews);
        }
        if step != Step::Generation && self.generation.take().is_some() {
            commands.push(NetworkCommand::DropPendingImages);
        }
        if step == Step::CredentialEntry {
            self.ideation.pending_suggestion = None;
            self.ideation.pending_storyboard = None;
        }

        self.input_mode = InputMode::Normal;
        self.active_field = Field::initial(step);
        self.cursor_position = self.current_input().map(str::len).unwrap_or(0);
        tracing::info!(?step, "Entered step");
        commands
    }

    fn forget_stored_credential(&mut self) {
        if let Err(e) = self.storage.clear_credential() {
            tracing::warn!(error = %e, "Could not remove stored credential");
        }
    }

    fn credential(&self) -> Option<Credential> {
        self.wizard.credential().cloned()
    }

    pub fn submit_credential(&mut self) {
        let transition = self.wizard.submit_credential(&self.credential_input);
        if let Transition::Entered(_) = transition {
            if let Some(credential) = self.wizard.credential() {
                if let Err(e) = self.storage.save_credential(credential.expose()) {
                    tracing::warn!(error = %e, "Could not persist credential");
                }
            }
            self.credential_input.clear();
        }
        self.apply_transition(transition);
    }

    /// Drop the key from memory and disk. Queued images are dropped; results
    /// of work already in flight are ignored once they arrive.
    pub fn clear_credential(&mut self) -> Vec<NetworkCommand> {
        let transition = self.wizard.clear_credential();
        self.forget_stored_credential();
        self.credential_input.clear();
        self.apply_transition(transition)
    }

    // ========================
    // Ideation
    // ========================

    pub fn cycle_art_style(&mut self) {
        if !self.ideation.is_busy() {
            self.ideation.art_style = self.ideation.art_style.next();
        }
    }

    pub fn next_suggestion_kind(&mut self) {
        self.ideation.suggestion_kind = step_kind(self.ideation.suggestion_kind, 1);
    }

    pub fn prev_suggestion_kind(&mut self) {
        self.ideation.suggestion_kind =
            step_kind(self.ideation.suggestion_kind, SuggestionKind::ALL.len() - 1);
    }

    pub fn suggest_idea(&mut self) -> Option<NetworkCommand> {
        if self.step() != Step::Ideation
            || self.ideation.is_busy()
            || self.ideation.story_idea.trim().is_empty()
        {
            return None;
        }
        let credential = self.credential()?;
        self.stop_editing();

        let id = self.next_id();
        self.ideation.pending_suggestion = Some(id);
        Some(NetworkCommand::SuggestIdea {
            id,
            credential,
            idea: self.ideation.story_idea.clone(),
            kind: self.ideation.suggestion_kind,
        })
    }

    pub fn generate_storyboard(&mut self) -> Option<NetworkCommand> {
        if self.step() != Step::Ideation
            || self.ideation.is_busy()
            || self.ideation.story_idea.trim().is_empty()
        {
            return None;
        }
        let art_style = self.ideation.art_style.resolve(&self.ideation.custom_style);
        if art_style.is_empty() {
            self.notice = Some(Notice::error(ART_STYLE_REQUIRED));
            return None;
        }
        let credential = self.credential()?;
        self.stop_editing();

        let id = self.next_id();
        self.ideation.pending_storyboard = Some(id);
        Some(NetworkCommand::GenerateStoryboard {
            id,
            credential,
            request: StoryboardRequest {
                story_idea: self.ideation.story_idea.clone(),
                art_style,
                character_descriptions: self.ideation.characters.clone(),
            },
        })
    }

    // ========================
    // Storyboard review
    // ========================

    fn enter_review(&mut self, storyboard: Storyboard) -> Vec<NetworkCommand> {
        let epoch = self.next_epoch();
        let mut previews = PreviewBoard::new(epoch);
        let requested = previews.request_missing(&SlotId::all());
        self.review = Some(ReviewState {
            draft: storyboard,
            selected: SlotId::FrontCover,
            previews,
        });
        self.cursor_position = self.current_input().map(str::len).unwrap_or(0);

        requested
            .into_iter()
            .filter_map(|slot| self.preview_job(slot, epoch))
            .collect()
    }

    fn preview_job(&mut self, slot: SlotId, epoch: u64) -> Option<NetworkCommand> {
        let credential = self.credential()?;
        let prompt = self.review.as_ref()?.draft.prompt_for(slot)?.to_string();
        Some(NetworkCommand::GenerateImage(ImageJob {
            id: self.next_id(),
            credential,
            slot,
            prompt: preview_prompt(&prompt),
            purpose: ImagePurpose::Preview { epoch },
        }))
    }

    pub fn next_slot(&mut self) {
        self.select_slot(|id| id.next());
    }

    pub fn prev_slot(&mut self) {
        self.select_slot(|id| id.prev());
    }

    fn select_slot(&mut self, step: impl Fn(SlotId) -> SlotId) {
        if let Some(review) = self.review.as_mut() {
            review.selected = step(review.selected);
            if review.draft.description_for(review.selected).is_none()
                && self.active_field == Field::Description
            {
                self.active_field = Field::Prompt;
                self.input_mode = InputMode::Normal;
            }
        } else if let Some(generation) = self.generation.as_mut() {
            generation.selected = step(generation.selected);
        }
        self.cursor_position = self.current_input().map(str::len).unwrap_or(0);
    }

    /// Re-request the preview of the selected slot with its current prompt
    pub fn refresh_preview(&mut self) -> Option<NetworkCommand> {
        let review = self.review.as_mut()?;
        let (slot, epoch) = (review.selected, review.previews.epoch());
        if !review.previews.request(slot) {
            return None;
        }
        self.preview_job(slot, epoch)
    }

    pub fn confirm_storyboard(&mut self) -> Vec<NetworkCommand> {
        let Some(review) = self.review.take() else {
            return Vec::new();
        };
        let mut commands = vec![NetworkCommand::DropPendingPreviews];

        let draft = review.draft;
        let transition = self.wizard.storyboard_confirmed(draft);
        commands.extend(self.apply_transition(transition));
        if transition == Transition::Entered(Step::Generation) {
            commands.extend(self.start_run());
        }
        commands
    }

    pub fn go_back(&mut self) -> Vec<NetworkCommand> {
        let transition = self.wizard.go_back();
        self.apply_transition(transition)
    }

    // ========================
    // Generation
    // ========================

    fn start_run(&mut self) -> Vec<NetworkCommand> {
        let Some(storyboard) = self.wizard.storyboard().cloned() else {
            return Vec::new();
        };
        let Some(credential) = self.credential() else {
            return Vec::new();
        };

        let run_id = self.next_run();
        let run = GenerationRun::new(run_id, &storyboard);
        let slots = run.slots().to_vec();
        tracing::info!(run = run_id, title = %storyboard.title, "Starting generation run");
        self.generation = Some(GenerationState {
            storyboard,
            run,
            selected: SlotId::FrontCover,
            quality: ExportQuality::default(),
            is_exporting: false,
        });

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                NetworkCommand::GenerateImage(ImageJob {
                    id: self.next_id(),
                    credential: credential.clone(),
                    slot: slot.id,
                    prompt: slot.prompt,
                    purpose: ImagePurpose::Final { run: run_id, index },
                })
            })
            .collect()
    }

    pub fn regenerate_selected(&mut self) -> Option<NetworkCommand> {
        let credential = self.credential()?;
        let generation = self.generation.as_mut()?;
        if generation.is_exporting {
            return None;
        }
        let slot = generation.selected;
        let prompt = generation.run.begin_regeneration(slot)?;
        let run = generation.run.run_id();
        tracing::info!(run, slot = %slot, "Regenerating image");

        Some(NetworkCommand::GenerateImage(ImageJob {
            id: self.next_id(),
            credential,
            slot,
            prompt,
            purpose: ImagePurpose::Regenerate { run },
        }))
    }

    pub fn toggle_quality(&mut self) {
        if let Some(generation) = self.generation.as_mut() {
            if !generation.is_exporting {
                generation.quality = generation.quality.toggle();
            }
        }
    }

    pub fn reset(&mut self) -> Vec<NetworkCommand> {
        if let Some(generation) = &self.generation {
            if generation.run.is_busy() || generation.is_exporting {
                return Vec::new();
            }
        }
        let transition = self.wizard.reset();
        self.apply_transition(transition)
    }

    // ========================
    // Export
    // ========================

    /// Claim the export slot for a full-comic export
    pub fn prepare_export(&mut self, format: ExportFormat) -> Option<ExportRequest> {
        let dir = self.config.export_dir.clone();
        let generation = self.generation.as_mut()?;
        if generation.is_exporting || generation.run.is_busy() || !generation.run.is_complete() {
            return None;
        }
        generation.is_exporting = true;
        Some(ExportRequest::Comic {
            storyboard: generation.storyboard.clone(),
            images: generation.run.images().to_vec(),
            quality: generation.quality,
            format,
            dir,
        })
    }

    /// Claim the export slot for saving the selected image on its own
    pub fn prepare_save_slot(&mut self) -> Option<ExportRequest> {
        let dir = self.config.export_dir.clone();
        let generation = self.generation.as_mut()?;
        if generation.is_exporting || generation.run.is_generating() {
            return None;
        }
        let image = generation.run.image(generation.selected)?;
        if !image.is_ready() {
            return None;
        }
        let image = image.clone();
        generation.is_exporting = true;
        Some(ExportRequest::Slot { image, dir })
    }

    pub fn export_finished(&mut self, result: Result<std::path::PathBuf, ExportError>) {
        if let Some(generation) = self.generation.as_mut() {
            generation.is_exporting = false;
        }
        self.notice = Some(match result {
            Ok(path) => Notice::info(format!("Saved {}", path.display())),
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                Notice::error(format!("Export failed: {}", e))
            }
        });
    }

    // ========================
    // Response handling
    // ========================

    pub fn handle_response(&mut self, response: NetworkResponse) -> Vec<NetworkCommand> {
        match response {
            NetworkResponse::IdeaSuggested { id, kind, text, failed } => {
                if self.ideation.pending_suggestion == Some(id) {
                    self.ideation.pending_suggestion = None;
                    if failed {
                        tracing::warn!(?kind, "Brainstorming failed");
                    }
                    self.ideation.story_idea = format!("{}\n\n{}", self.ideation.story_idea, text);
                }
                Vec::new()
            }
            NetworkResponse::StoryboardGenerated { id, result } => {
                if self.ideation.pending_storyboard != Some(id) {
                    return Vec::new();
                }
                self.ideation.pending_storyboard = None;
                match result {
                    Ok(storyboard) => {
                        let transition = self.wizard.storyboard_generated(storyboard.clone());
                        let mut commands = self.apply_transition(transition);
                        if transition == Transition::Entered(Step::StoryboardReview) {
                            commands.extend(self.enter_review(storyboard));
                        }
                        commands
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Storyboard generation failed");
                        self.notice = Some(Notice::error(format!(
                            "Failed to generate storyboard: {}",
                            e
                        )));
                        Vec::new()
                    }
                }
            }
            NetworkResponse::ImageStarted { purpose, .. } => {
                if let ImagePurpose::Final { run, index } = purpose {
                    if let Some(generation) = self.current_run(run) {
                        generation.run.slot_started(index);
                    }
                }
                Vec::new()
            }
            NetworkResponse::ImageFinished { slot, purpose, result, .. } => {
                match purpose {
                    ImagePurpose::Final { run, index } => {
                        if let Some(generation) = self.current_run(run) {
                            generation.run.slot_finished(index, result);
                        }
                    }
                    ImagePurpose::Regenerate { run } => {
                        let notice = self
                            .current_run(run)
                            .and_then(|g| g.run.finish_regeneration(slot, result));
                        if let Some(message) = notice {
                            self.notice = Some(Notice::error(message));
                        }
                    }
                    ImagePurpose::Preview { epoch } => {
                        if let Some(review) = self.review.as_mut() {
                            review.previews.finished(epoch, slot, result);
                        }
                    }
                }
                Vec::new()
            }
        }
    }

    fn current_run(&mut self, run: u64) -> Option<&mut GenerationState> {
        self.generation
            .as_mut()
            .filter(|g| g.run.run_id() == run)
    }
}

fn step_kind(kind: SuggestionKind, offset: usize) -> SuggestionKind {
    let all = SuggestionKind::ALL;
    let index = all.iter().position(|k| *k == kind).unwrap_or(0);
    all[(index + offset) % all.len()]
}
