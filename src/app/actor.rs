//! App actor - message loop processing UI events, network responses and
//! finished exports

use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::app::state::AppState;
use crate::export::{ExportError, ExportRequest};
use crate::messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};

type ExportOutcome = Result<PathBuf, ExportError>;

/// App actor that processes UI events and network responses
pub struct AppActor {
    state: AppState,
    network_tx: mpsc::UnboundedSender<NetworkCommand>,
    render_tx: mpsc::UnboundedSender<RenderState>,
    export_tx: mpsc::UnboundedSender<ExportOutcome>,
    export_rx: mpsc::UnboundedReceiver<ExportOutcome>,
}

impl AppActor {
    pub fn new(
        state: AppState,
        network_tx: mpsc::UnboundedSender<NetworkCommand>,
        render_tx: mpsc::UnboundedSender<RenderState>,
    ) -> Self {
        let (export_tx, export_rx) = mpsc::unbounded_channel();
        AppActor {
            state,
            network_tx,
            render_tx,
            export_tx,
            export_rx,
        }
    }

    /// Run the actor message loop
    pub async fn run(
        mut self,
        mut ui_rx: mpsc::UnboundedReceiver<UiEvent>,
        mut net_rx: mpsc::UnboundedReceiver<NetworkResponse>,
    ) {
        // Send initial render state
        let _ = self.render_tx.send(self.state.to_render_state());

        loop {
            tokio::select! {
                Some(event) = ui_rx.recv() => {
                    if self.handle_ui_event(event) {
                        // Quit signal received
                        let _ = self.network_tx.send(NetworkCommand::Shutdown);
                        break;
                    }
                }
                Some(response) = net_rx.recv() => {
                    let commands = self.state.handle_response(response);
                    self.send_all(commands);
                }
                Some(outcome) = self.export_rx.recv() => {
                    self.state.export_finished(outcome);
                }
                else => break,
            }
            let _ = self.render_tx.send(self.state.to_render_state());
        }
    }

    fn send(&self, command: Option<NetworkCommand>) {
        if let Some(cmd) = command {
            let _ = self.network_tx.send(cmd);
        }
    }

    fn send_all(&self, commands: Vec<NetworkCommand>) {
        for cmd in commands {
            let _ = self.network_tx.send(cmd);
        }
    }

    fn spawn_export(&self, request: Option<ExportRequest>) {
        let Some(request) = request else {
            return;
        };
        let export_tx = self.export_tx.clone();
        tokio::spawn(async move {
            let outcome = match tokio::task::spawn_blocking(move || request.run()).await {
                Ok(outcome) => outcome,
                Err(e) => Err(ExportError::Io(std::io::Error::other(e.to_string()))),
            };
            let _ = export_tx.send(outcome);
        });
    }

    /// Handle a UI event, returns true if quit was requested
    fn handle_ui_event(&mut self, event: UiEvent) -> bool {
        match event {
            // Input editing
            UiEvent::StartEditing => self.state.start_editing(),
            UiEvent::StopEditing => self.state.stop_editing(),
            UiEvent::CharInput(c) => self.state.enter_char(c),
            UiEvent::Backspace => self.state.delete_char(),
            UiEvent::CursorLeft => self.state.move_cursor_left(),
            UiEvent::CursorRight => self.state.move_cursor_right(),
            UiEvent::NextField => self.state.next_field(),

            // Credential
            UiEvent::SubmitCredential => self.state.submit_credential(),
            UiEvent::ClearCredential => {
                let commands = self.state.clear_credential();
                self.send_all(commands);
            }

            // Ideation
            UiEvent::CycleArtStyle => self.state.cycle_art_style(),
            UiEvent::NextSuggestionKind => self.state.next_suggestion_kind(),
            UiEvent::PrevSuggestionKind => self.state.prev_suggestion_kind(),
            UiEvent::SuggestIdea => {
                let cmd = self.state.suggest_idea();
                self.send(cmd);
            }
            UiEvent::GenerateStoryboard => {
                let cmd = self.state.generate_storyboard();
                self.send(cmd);
            }

            // Storyboard review
            UiEvent::NextSlot => self.state.next_slot(),
            UiEvent::PrevSlot => self.state.prev_slot(),
            UiEvent::RefreshPreview => {
                let cmd = self.state.refresh_preview();
                self.send(cmd);
            }
            UiEvent::ConfirmStoryboard => {
                let commands = self.state.confirm_storyboard();
                self.send_all(commands);
            }
            UiEvent::GoBack => {
                let commands = self.state.go_back();
                self.send_all(commands);
            }

            // Generation
            UiEvent::Regenerate => {
                let cmd = self.state.regenerate_selected();
                self.send(cmd);
            }
            UiEvent::ToggleQuality => self.state.toggle_quality(),
            UiEvent::Export(format) => {
                let request = self.state.prepare_export(format);
                self.spawn_export(request);
            }
            UiEvent::SaveSlot => {
                let request = self.state.prepare_save_slot();
                self.spawn_export(request);
            }
            UiEvent::Reset => {
                let commands = self.state.reset();
                self.send_all(commands);
            }

            // Popups
            UiEvent::ToggleHelp => self.state.toggle_help(),
            UiEvent::CloseHelp => self.state.close_help(),
            UiEvent::DismissNotice => self.state.dismiss_notice(),

            // System
            UiEvent::Quit => return true,
        }

        false
    }
}
