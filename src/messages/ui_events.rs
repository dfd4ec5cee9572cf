//! UI events - messages from UI layer to App layer

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::wizard::Step;
use crate::models::ExportFormat;

/// Events generated from user input in the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    // Input editing
    StartEditing,
    StopEditing,
    CharInput(char),
    Backspace,
    CursorLeft,
    CursorRight,
    NextField,

    // Credential
    SubmitCredential,
    ClearCredential,

    // Ideation
    CycleArtStyle,
    NextSuggestionKind,
    PrevSuggestionKind,
    SuggestIdea,
    GenerateStoryboard,

    // Storyboard review
    NextSlot,
    PrevSlot,
    RefreshPreview,
    ConfirmStoryboard,
    GoBack,

    // Generation
    Regenerate,
    ToggleQuality,
    Export(ExportFormat),
    SaveSlot,
    Reset,

    // Popups
    ToggleHelp,
    CloseHelp,
    DismissNotice,

    // System
    Quit,
}

/// Editable text field, context for cursor handling
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Field {
    Credential,
    StoryIdea,
    Characters,
    CustomStyle,
    Prompt,
    Description,
    Title,
}

impl Field {
    /// Next field on the same screen
    pub fn next(&self) -> Field {
        match self {
            Field::Credential => Field::Credential,
            Field::StoryIdea => Field::Characters,
            Field::Characters => Field::CustomStyle,
            Field::CustomStyle => Field::StoryIdea,
            Field::Prompt => Field::Description,
            Field::Description => Field::Title,
            Field::Title => Field::Prompt,
        }
    }

    /// Field focused when a step is entered
    pub fn initial(step: Step) -> Field {
        match step {
            Step::CredentialEntry => Field::Credential,
            Step::Ideation => Field::StoryIdea,
            Step::StoryboardReview | Step::Generation => Field::Prompt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Credential => "API Key",
            Field::StoryIdea => "Story Idea",
            Field::Characters => "Characters",
            Field::CustomStyle => "Custom Style",
            Field::Prompt => "Visual Prompt",
            Field::Description => "Caption",
            Field::Title => "Title",
        }
    }
}

/// Input mode
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Convert a key event to a UiEvent based on current UI context
pub fn key_to_ui_event(
    key: KeyEvent,
    step: Step,
    input_mode: InputMode,
    show_help: bool,
    has_notice: bool,
) -> Option<UiEvent> {
    use crossterm::event::KeyEventKind;

    if key.kind != KeyEventKind::Press {
        return None;
    }

    // Global Ctrl shortcuts
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(UiEvent::Quit),
            KeyCode::Char('k') => Some(UiEvent::ClearCredential),
            _ => None,
        };
    }

    if show_help {
        return Some(UiEvent::CloseHelp);
    }

    if key.code == KeyCode::F(1) {
        return Some(UiEvent::ToggleHelp);
    }

    // The key screen is a single always-focused input
    if step == Step::CredentialEntry {
        return match key.code {
            KeyCode::Enter => Some(UiEvent::SubmitCredential),
            KeyCode::Esc => Some(UiEvent::Quit),
            KeyCode::Left => Some(UiEvent::CursorLeft),
            KeyCode::Right => Some(UiEvent::CursorRight),
            KeyCode::Backspace => Some(UiEvent::Backspace),
            KeyCode::Char(c) => Some(UiEvent::CharInput(c)),
            _ => None,
        };
    }

    if input_mode == InputMode::Editing {
        return match key.code {
            KeyCode::Esc | KeyCode::Enter => Some(UiEvent::StopEditing),
            KeyCode::Left => Some(UiEvent::CursorLeft),
            KeyCode::Right => Some(UiEvent::CursorRight),
            KeyCode::Backspace => Some(UiEvent::Backspace),
            KeyCode::Tab => Some(UiEvent::NextField),
            KeyCode::Char(c) => Some(UiEvent::CharInput(c)),
            _ => None,
        };
    }

    if has_notice && key.code == KeyCode::Esc {
        return Some(UiEvent::DismissNotice);
    }

    match key.code {
        KeyCode::Char('q') => return Some(UiEvent::Quit),
        KeyCode::Char('?') => return Some(UiEvent::ToggleHelp),
        _ => {}
    }

    match step {
        Step::CredentialEntry => None,
        Step::Ideation => handle_ideation_keys(key),
        Step::StoryboardReview => handle_review_keys(key),
        Step::Generation => handle_generation_keys(key),
    }
}

fn handle_ideation_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Tab => Some(UiEvent::NextField),
        KeyCode::Char('e') | KeyCode::Enter => Some(UiEvent::StartEditing),
        KeyCode::Char('a') => Some(UiEvent::CycleArtStyle),
        KeyCode::Left => Some(UiEvent::PrevSuggestionKind),
        KeyCode::Right => Some(UiEvent::NextSuggestionKind),
        KeyCode::Char('i') => Some(UiEvent::SuggestIdea),
        KeyCode::Char('g') => Some(UiEvent::GenerateStoryboard),
        _ => None,
    }
}

fn handle_review_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Up => Some(UiEvent::PrevSlot),
        KeyCode::Down => Some(UiEvent::NextSlot),
        KeyCode::Tab => Some(UiEvent::NextField),
        KeyCode::Char('e') | KeyCode::Enter => Some(UiEvent::StartEditing),
        KeyCode::Char('r') => Some(UiEvent::RefreshPreview),
        KeyCode::Char('c') => Some(UiEvent::ConfirmStoryboard),
        KeyCode::Char('b') | KeyCode::Esc => Some(UiEvent::GoBack),
        _ => None,
    }
}

fn handle_generation_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Up => Some(UiEvent::PrevSlot),
        KeyCode::Down => Some(UiEvent::NextSlot),
        KeyCode::Char('r') => Some(UiEvent::Regenerate),
        KeyCode::Char('t') => Some(UiEvent::ToggleQuality),
        KeyCode::Char('p') => Some(UiEvent::Export(ExportFormat::Pdf)),
        KeyCode::Char('i') => Some(UiEvent::Export(ExportFormat::Png)),
        KeyCode::Char('s') => Some(UiEvent::SaveSlot),
        KeyCode::Char('n') => Some(UiEvent::Reset),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_credential_screen_types_every_character() {
        let event = key_to_ui_event(press(KeyCode::Char('q')), Step::CredentialEntry, InputMode::Normal, false, false);
        assert_eq!(event, Some(UiEvent::CharInput('q')));
        let event = key_to_ui_event(press(KeyCode::Enter), Step::CredentialEntry, InputMode::Normal, false, false);
        assert_eq!(event, Some(UiEvent::SubmitCredential));
    }

    #[test]
    fn test_ctrl_k_clears_credential_from_any_step() {
        let key = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL);
        for step in [Step::Ideation, Step::StoryboardReview, Step::Generation] {
            assert_eq!(
                key_to_ui_event(key, step, InputMode::Editing, false, false),
                Some(UiEvent::ClearCredential)
            );
        }
    }

    #[test]
    fn test_same_key_maps_per_step() {
        let r = press(KeyCode::Char('r'));
        assert_eq!(
            key_to_ui_event(r, Step::StoryboardReview, InputMode::Normal, false, false),
            Some(UiEvent::RefreshPreview)
        );
        assert_eq!(
            key_to_ui_event(r, Step::Generation, InputMode::Normal, false, false),
            Some(UiEvent::Regenerate)
        );
        assert_eq!(key_to_ui_event(r, Step::Ideation, InputMode::Normal, false, false), None);
    }

    #[test]
    fn test_escape_dismisses_notice_before_going_back() {
        let esc = press(KeyCode::Esc);
        assert_eq!(
            key_to_ui_event(esc, Step::StoryboardReview, InputMode::Normal, false, true),
            Some(UiEvent::DismissNotice)
        );
        assert_eq!(
            key_to_ui_event(esc, Step::StoryboardReview, InputMode::Normal, false, false),
            Some(UiEvent::GoBack)
        );
    }

    #[test]
    fn test_field_cycle_stays_on_screen() {
        assert_eq!(Field::CustomStyle.next(), Field::StoryIdea);
        assert_eq!(Field::Title.next(), Field::Prompt);
    }
}
