//! App state - pure data structure with no I/O logic beyond the credential slot

use crate::app::wizard::{Step, Wizard};
use crate::config::Config;
use crate::constants::{DEFAULT_CHARACTERS, DEFAULT_STORY_IDEA};
use crate::messages::render::{
    GenerationView, IdeationView, ImageView, PreviewStatus, ReviewSlotView, ReviewView,
};
use crate::messages::ui_events::{Field, InputMode};
use crate::messages::{Notice, RenderState};
use crate::models::{ArtStyle, Credential, ExportQuality, SlotId, Storyboard, SuggestionKind};
use crate::pipeline::{GenerationRun, PreviewBoard};
use crate::storage::Storage;

/// Ideation form, kept across visits to the ideation screen
#[derive(Clone, Debug)]
pub struct IdeationForm {
    pub story_idea: String,
    pub characters: String,
    pub custom_style: String,
    pub art_style: ArtStyle,
    pub suggestion_kind: SuggestionKind,
    pub pending_suggestion: Option<u64>,
    pub pending_storyboard: Option<u64>,
}

impl Default for IdeationForm {
    fn default() -> Self {
        IdeationForm {
            story_idea: String::from(DEFAULT_STORY_IDEA),
            characters: String::from(DEFAULT_CHARACTERS),
            custom_style: String::new(),
            art_style: ArtStyle::default(),
            suggestion_kind: SuggestionKind::Villain,
            pending_suggestion: None,
            pending_storyboard: None,
        }
    }
}

impl IdeationForm {
    pub fn is_suggesting(&self) -> bool {
        self.pending_suggestion.is_some()
    }

    pub fn is_generating(&self) -> bool {
        self.pending_storyboard.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.is_suggesting() || self.is_generating()
    }
}

/// Editable draft on the review screen
#[derive(Clone, Debug)]
pub struct ReviewState {
    pub draft: Storyboard,
    pub selected: SlotId,
    pub previews: PreviewBoard,
}

#[derive(Clone, Debug)]
pub struct GenerationState {
    /// The storyboard as confirmed; captions and title go into the export
    pub storyboard: Storyboard,
    pub run: GenerationRun,
    pub selected: SlotId,
    pub quality: ExportQuality,
    pub is_exporting: bool,
}

/// Main application state - owned by the App actor only
pub struct AppState {
    pub wizard: Wizard,
    pub storage: Storage,
    pub config: Config,

    // Input
    pub input_mode: InputMode,
    pub active_field: Field,
    pub cursor_position: usize,
    pub credential_input: String,

    // Per-step data
    pub ideation: IdeationForm,
    pub review: Option<ReviewState>,
    pub generation: Option<GenerationState>,

    // Popups
    pub notice: Option<Notice>,
    pub show_help: bool,

    next_request_id: u64,
    next_epoch: u64,
    next_run: u64,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_storage(Storage::new(), config)
    }

    /// State backed by an explicit credential store
    pub fn with_storage(storage: Storage, config: Config) -> Self {
        let stored = storage.load_credential().and_then(|v| Credential::parse(&v));
        if stored.is_some() {
            tracing::info!("Using stored credential");
        }
        let wizard = Wizard::new(stored);
        let active_field = Field::initial(wizard.step());

        AppState {
            wizard,
            storage,
            config,
            input_mode: InputMode::Normal,
            active_field,
            cursor_position: 0,
            credential_input: String::new(),
            ideation: IdeationForm::default(),
            review: None,
            generation: None,
            notice: None,
            show_help: false,
            next_request_id: 1,
            next_epoch: 1,
            next_run: 1,
        }
    }

    pub fn step(&self) -> Step {
        self.wizard.step()
    }

    /// Generate a unique request ID
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    pub(crate) fn next_epoch(&mut self) -> u64 {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        epoch
    }

    pub(crate) fn next_run(&mut self) -> u64 {
        let run = self.next_run;
        self.next_run += 1;
        run
    }

    /// Get the current input field content
    pub fn current_input(&self) -> Option<&str> {
        match self.active_field {
            Field::Credential => Some(&self.credential_input),
            Field::StoryIdea => Some(&self.ideation.story_idea),
            Field::Characters => Some(&self.ideation.characters),
            Field::CustomStyle => Some(&self.ideation.custom_style),
            Field::Title => self.review.as_ref().map(|r| r.draft.title.as_str()),
            Field::Prompt => self
                .review
                .as_ref()
                .and_then(|r| r.draft.prompt_for(r.selected)),
            Field::Description => self
                .review
                .as_ref()
                .and_then(|r| r.draft.description_for(r.selected)),
        }
    }

    /// Get mutable reference to current input field
    pub fn current_input_mut(&mut self) -> Option<&mut String> {
        match self.active_field {
            Field::Credential => Some(&mut self.credential_input),
            Field::StoryIdea => Some(&mut self.ideation.story_idea),
            Field::Characters => Some(&mut self.ideation.characters),
            Field::CustomStyle => Some(&mut self.ideation.custom_style),
            Field::Title => self.review.as_mut().map(|r| &mut r.draft.title),
            Field::Prompt => self.review.as_mut().and_then(|r| {
                let selected = r.selected;
                r.draft.prompt_for_mut(selected)
            }),
            Field::Description => self.review.as_mut().and_then(|r| {
                let selected = r.selected;
                r.draft.description_for_mut(selected)
            }),
        }
    }

    /// Convert state to RenderState for UI
    pub fn to_render_state(&self) -> RenderState {
        RenderState {
            step: self.step(),
            input_mode: self.input_mode,
            active_field: self.active_field,
            cursor_position: self.cursor_position,
            credential_input_len: self.credential_input.chars().count(),
            ideation: IdeationView {
                story_idea: self.ideation.story_idea.clone(),
                characters: self.ideation.characters.clone(),
                custom_style: self.ideation.custom_style.clone(),
                art_style: self.ideation.art_style,
                suggestion_kind: self.ideation.suggestion_kind,
                is_suggesting: self.ideation.is_suggesting(),
                is_generating: self.ideation.is_generating(),
            },
            review: self.review.as_ref().map(review_view),
            generation: self.generation.as_ref().map(generation_view),
            notice: self.notice.clone(),
            show_help: self.show_help,
        }
    }
}

fn review_view(review: &ReviewState) -> ReviewView {
    let slots = review
        .draft
        .slots()
        .into_iter()
        .map(|slot| {
            let description = review.draft.description_for(slot.id).map(str::to_string);
            let preview = match review.previews.get(slot.id) {
                Some(p) if p.loading => PreviewStatus::Loading,
                Some(p) => match (&p.image, &p.error) {
                    (_, Some(error)) => PreviewStatus::Failed(error.clone()),
                    (Some(image), None) => PreviewStatus::Ready { bytes: image.len() },
                    (None, None) => PreviewStatus::Empty,
                },
                None => PreviewStatus::Empty,
            };
            ReviewSlotView {
                id: slot.id,
                label: slot.label,
                prompt: slot.prompt,
                description,
                preview,
            }
        })
        .collect();

    ReviewView {
        title: review.draft.title.clone(),
        slots,
        selected: review.selected,
    }
}

fn generation_view(generation: &GenerationState) -> GenerationView {
    let run = &generation.run;
    GenerationView {
        title: generation.storyboard.title.clone(),
        status: run.status().to_string(),
        is_generating: run.is_generating(),
        regenerating: run.regenerating(),
        images: run
            .images()
            .iter()
            .map(|img| ImageView {
                id: img.id,
                label: img.label.clone(),
                prompt: img.prompt.clone(),
                description: generation.storyboard.description_for(img.id).map(str::to_string),
                ready: img.is_ready(),
                bytes: img.base64.len(),
                error: img.error.clone(),
            })
            .collect(),
        total_slots: run.slots().len(),
        selected: generation.selected,
        quality: generation.quality,
        is_exporting: generation.is_exporting,
        can_export: run.is_complete() && !run.is_busy() && !generation.is_exporting,
    }
}
