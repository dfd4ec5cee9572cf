//! End-to-end wizard flow against an in-process generation backend

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use tempfile::tempdir;
use tokio::sync::mpsc;

use comic_crafter::app::{AppState, Step};
use comic_crafter::config::Config;
use comic_crafter::constants::{SLOT_COUNT, STATUS_READY};
use comic_crafter::messages::{NetworkCommand, NetworkResponse};
use comic_crafter::models::{ArtStyle, ExportFormat, Panel, Storyboard, StoryboardRequest, SuggestionKind};
use comic_crafter::network::{GenerationBackend, GenerationError, GenerationResult, NetworkActor};
use comic_crafter::storage::Storage;

/// Answers every request immediately; image prompts containing `fail_marker` fail
struct StudioBackend {
    requests: Mutex<Vec<StoryboardRequest>>,
    prompts: Mutex<Vec<String>>,
    fail_marker: Option<String>,
    png: String,
}

impl StudioBackend {
    fn new() -> Self {
        let mut bytes = Vec::new();
        image::RgbImage::from_pixel(4, 4, image::Rgb([200, 40, 40]))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        StudioBackend {
            requests: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            fail_marker: None,
            png: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    fn failing(marker: &str) -> Self {
        StudioBackend {
            fail_marker: Some(marker.to_string()),
            ..Self::new()
        }
    }
}

#[async_trait::async_trait]
impl GenerationBackend for StudioBackend {
    async fn suggest_idea(
        &self,
        _credential: &str,
        _current_idea: &str,
        kind: SuggestionKind,
    ) -> GenerationResult<String> {
        Ok(format!("Add a {}.", kind.noun()))
    }

    async fn generate_storyboard(
        &self,
        _credential: &str,
        request: &StoryboardRequest,
    ) -> GenerationResult<Storyboard> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(Storyboard {
            title: "The Painting Machine".into(),
            front_cover_prompt: "robot holding a brush".into(),
            back_cover_prompt: "gallery at night".into(),
            panels: (1..=6)
                .map(|i| Panel::new(format!("panel {}", i), format!("caption {}", i)))
                .collect(),
        })
    }

    async fn generate_image(&self, _credential: &str, prompt: &str) -> GenerationResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.fail_marker {
            Some(marker) if prompt.contains(marker.as_str()) => Err(GenerationError::EmptyResponse),
            _ => Ok(self.png.clone()),
        }
    }
}

/// App state wired to a running network actor
struct Harness {
    state: AppState,
    cmd_tx: mpsc::UnboundedSender<NetworkCommand>,
    resp_rx: mpsc::UnboundedReceiver<NetworkResponse>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn start(backend: Arc<StudioBackend>) -> Self {
        let dir = tempdir().unwrap();
        let config = Config {
            export_dir: dir.path().join("exports"),
            ..Config::default()
        };
        let state = AppState::with_storage(Storage::with_dir(dir.path()), config);

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();
        tokio::spawn(NetworkActor::new(backend, resp_tx).run(cmd_rx));

        Harness {
            state,
            cmd_tx,
            resp_rx,
            _dir: dir,
        }
    }

    fn send(&self, commands: impl IntoIterator<Item = NetworkCommand>) {
        for command in commands {
            self.cmd_tx.send(command).unwrap();
        }
    }

    /// Feed responses back into the state until `done` holds
    async fn pump_until(&mut self, done: impl Fn(&AppState) -> bool) {
        while !done(&self.state) {
            let response = tokio::time::timeout(Duration::from_secs(5), self.resp_rx.recv())
                .await
                .expect("timed out waiting for a response")
                .expect("network actor stopped");
            let follow_up = self.state.handle_response(response);
            self.send(follow_up);
        }
    }

    fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.state.enter_char(c);
        }
    }

    fn run_finished(state: &AppState) -> bool {
        state
            .generation
            .as_ref()
            .map(|g| !g.run.is_busy() && g.run.images().len() == SLOT_COUNT)
            .unwrap_or(false)
    }
}

async fn into_generation(h: &mut Harness) {
    assert_eq!(h.state.step(), Step::CredentialEntry);
    h.type_text("test-key");
    h.state.submit_credential();
    assert_eq!(h.state.step(), Step::Ideation);

    h.state.ideation.story_idea = "A robot learns to paint".into();
    while h.state.ideation.art_style != ArtStyle::MangaAnime {
        h.state.cycle_art_style();
    }

    let command = h.state.generate_storyboard().expect("storyboard request");
    h.send([command]);
    h.pump_until(|s| s.step() == Step::StoryboardReview).await;

    let commands = h.state.confirm_storyboard();
    assert_eq!(h.state.step(), Step::Generation);
    h.send(commands);
    h.pump_until(Harness::run_finished).await;
}

#[tokio::test]
async fn test_idea_to_finished_comic() {
    let backend = Arc::new(StudioBackend::new());
    let mut h = Harness::start(backend.clone());

    into_generation(&mut h).await;

    let requests = backend.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].story_idea, "A robot learns to paint");
    assert_eq!(requests[0].art_style, ArtStyle::MangaAnime.resolve(""));

    let generation = h.state.generation.as_ref().unwrap();
    assert!(!generation.run.is_generating());
    assert!(generation.run.is_complete());
    assert_eq!(generation.run.status(), STATUS_READY);
    assert_eq!(generation.storyboard.title, "The Painting Machine");

    let view = h.state.to_render_state().generation.unwrap();
    assert_eq!(view.images[1].description.as_deref(), Some("caption 1"));
    assert_eq!(view.images[0].description, None);

    let labels: Vec<&str> = generation.run.images().iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels.first(), Some(&"Front Cover"));
    assert_eq!(labels.last(), Some(&"Back Cover"));

    // Final images are generated in slot order after any previews
    let prompts = backend.prompts.lock().unwrap().clone();
    let finals: Vec<&String> = prompts.iter().rev().take(SLOT_COUNT).rev().collect();
    assert_eq!(finals.first().map(|p| p.as_str()), Some("robot holding a brush"));
    assert_eq!(finals.last().map(|p| p.as_str()), Some("gallery at night"));
}

#[tokio::test]
async fn test_finished_comic_exports_pdf() {
    let mut h = Harness::start(Arc::new(StudioBackend::new()));
    into_generation(&mut h).await;

    let request = h.state.prepare_export(ExportFormat::Pdf).expect("export allowed");
    assert!(h.state.prepare_export(ExportFormat::Png).is_none());

    let result = tokio::task::spawn_blocking(move || request.run()).await.unwrap();
    let path = result.as_ref().unwrap().clone();
    h.state.export_finished(result);

    assert!(path.exists());
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));
    assert!(!h.state.generation.as_ref().unwrap().is_exporting);
    assert!(h.state.notice.as_ref().unwrap().message.contains("Saved"));
}

#[tokio::test]
async fn test_failed_panel_blocks_export_until_regenerated() {
    let backend = Arc::new(StudioBackend::failing("panel 3"));
    let mut h = Harness::start(backend);
    into_generation(&mut h).await;

    let generation = h.state.generation.as_ref().unwrap();
    assert_eq!(generation.run.status(), STATUS_READY);
    assert!(!generation.run.is_complete());
    assert!(generation.run.images()[3].label.ends_with("(Failed)"));
    assert!(h.state.prepare_export(ExportFormat::Png).is_none());

    // Retrying the failed slot fails again and keeps the run incomplete
    for _ in 0..3 {
        h.state.next_slot();
    }
    let command = h.state.regenerate_selected().expect("regeneration request");
    h.send([command]);
    h.pump_until(|s| s.notice.is_some()).await;

    assert!(h
        .state
        .notice
        .as_ref()
        .unwrap()
        .message
        .starts_with("Failed to regenerate"));
    assert!(!h.state.generation.as_ref().unwrap().run.is_busy());
}

#[tokio::test]
async fn test_reset_returns_to_ideation_keeping_key() {
    let mut h = Harness::start(Arc::new(StudioBackend::new()));
    into_generation(&mut h).await;

    h.state.reset();

    assert_eq!(h.state.step(), Step::Ideation);
    assert!(h.state.generation.is_none());
    assert!(h.state.review.is_none());
    assert!(h.state.wizard.credential().is_some());
}
