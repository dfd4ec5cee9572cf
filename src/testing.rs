//! In-memory generation backend for unit tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

use crate::models::{Panel, Storyboard, StoryboardRequest, SuggestionKind};
use crate::network::backend::{GenerationBackend, GenerationError, GenerationResult};

/// Records every call; images succeed unless their prompt was marked failing
pub struct ScriptedBackend {
    failing: HashSet<String>,
    panels: usize,
    gate: Option<Semaphore>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        ScriptedBackend {
            failing: HashSet::new(),
            panels: 6,
            gate: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Image calls block until `release` hands out permits
    pub fn gated() -> Self {
        ScriptedBackend {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn fail_on(mut self, prompt: &str) -> Self {
        self.failing.insert(prompt.to_string());
        self
    }

    /// Number of panels the storyboard comes back with, before normalization
    pub fn with_panels(mut self, panels: usize) -> Self {
        self.panels = panels;
        self
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn image_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn suggest_idea(
        &self,
        _credential: &str,
        _current_idea: &str,
        kind: SuggestionKind,
    ) -> GenerationResult<String> {
        Ok(format!("Introduce {}.", kind.noun()))
    }

    async fn generate_storyboard(
        &self,
        _credential: &str,
        request: &StoryboardRequest,
    ) -> GenerationResult<Storyboard> {
        let mut storyboard = Storyboard {
            title: request.story_idea.clone(),
            front_cover_prompt: format!("cover: {}", request.story_idea),
            back_cover_prompt: String::from("the end"),
            panels: (1..=self.panels)
                .map(|i| Panel::new(format!("panel {}", i), format!("caption {}", i)))
                .collect(),
        };
        storyboard.normalize();
        Ok(storyboard)
    }

    async fn generate_image(&self, _credential: &str, prompt: &str) -> GenerationResult<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(prompt) {
            Err(GenerationError::Transport(String::from("scripted failure")))
        } else {
            Ok(format!("img:{}", prompt))
        }
    }
}
