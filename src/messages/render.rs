//! Render state - data structure sent from App layer to UI for rendering
//!
//! Image payloads never cross this boundary; views carry byte counts only.

use chrono::{DateTime, Local};

use crate::app::wizard::Step;
use crate::messages::ui_events::{Field, InputMode};
use crate::models::{ArtStyle, ExportQuality, SlotId, SuggestionKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Dismissable message shown over the current screen
#[derive(Clone, Debug)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub at: DateTime<Local>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Info,
            message: message.into(),
            at: Local::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Error,
            message: message.into(),
            at: Local::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdeationView {
    pub story_idea: String,
    pub characters: String,
    pub custom_style: String,
    pub art_style: ArtStyle,
    pub suggestion_kind: SuggestionKind,
    pub is_suggesting: bool,
    pub is_generating: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewStatus {
    Empty,
    Loading,
    Ready { bytes: usize },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ReviewSlotView {
    pub id: SlotId,
    pub label: String,
    pub prompt: String,
    /// Panel caption; covers have none
    pub description: Option<String>,
    pub preview: PreviewStatus,
}

#[derive(Debug, Clone)]
pub struct ReviewView {
    pub title: String,
    pub slots: Vec<ReviewSlotView>,
    pub selected: SlotId,
}

#[derive(Debug, Clone)]
pub struct ImageView {
    pub id: SlotId,
    pub label: String,
    pub prompt: String,
    /// Panel caption; covers have none
    pub description: Option<String>,
    pub ready: bool,
    pub bytes: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationView {
    pub title: String,
    pub status: String,
    pub is_generating: bool,
    pub regenerating: Option<SlotId>,
    pub images: Vec<ImageView>,
    pub total_slots: usize,
    pub selected: SlotId,
    pub quality: ExportQuality,
    pub is_exporting: bool,
    pub can_export: bool,
}

/// Complete state needed by the UI to render
#[derive(Debug, Clone)]
pub struct RenderState {
    pub step: Step,
    pub input_mode: InputMode,
    pub active_field: Field,
    pub cursor_position: usize,

    /// Length of the typed key; the key itself is never rendered
    pub credential_input_len: usize,

    pub ideation: IdeationView,
    pub review: Option<ReviewView>,
    pub generation: Option<GenerationView>,

    // Popups
    pub notice: Option<Notice>,
    pub show_help: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        RenderState {
            step: Step::CredentialEntry,
            input_mode: InputMode::Normal,
            active_field: Field::Credential,
            cursor_position: 0,
            credential_input_len: 0,
            ideation: IdeationView {
                story_idea: String::new(),
                characters: String::new(),
                custom_style: String::new(),
                art_style: ArtStyle::default(),
                suggestion_kind: SuggestionKind::Villain,
                is_suggesting: false,
                is_generating: false,
            },
            review: None,
            generation: None,
            notice: None,
            show_help: false,
        }
    }
}
