//! Network actor - runs generation requests in the Tokio async runtime
//!
//! Text requests run concurrently on a `JoinSet`; every image request goes
//! through the single-worker `ImageQueue`.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::constants::BRAINSTORM_FAILED;
use crate::messages::{NetworkCommand, NetworkResponse};
use crate::network::backend::GenerationBackend;
use crate::pipeline::ImageQueue;

/// Network actor that processes generation commands
pub struct NetworkActor {
    backend: Arc<dyn GenerationBackend>,
    response_tx: mpsc::UnboundedSender<NetworkResponse>,
    active_requests: JoinSet<()>,
    images: ImageQueue,
}

impl NetworkActor {
    /// Must be called from within a Tokio runtime; spawns the image worker
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        response_tx: mpsc::UnboundedSender<NetworkResponse>,
    ) -> Self {
        let images = ImageQueue::spawn(backend.clone(), response_tx.clone());
        NetworkActor {
            backend,
            response_tx,
            active_requests: JoinSet::new(),
            images,
        }
    }

    /// Run the network actor message loop
    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<NetworkCommand>) {
        loop {
            tokio::select! {
                biased;

                // Handle incoming commands
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NetworkCommand::SuggestIdea { id, credential, idea, kind }) => {
                            let response_tx = self.response_tx.clone();
                            let backend = self.backend.clone();

                            self.active_requests.spawn(async move {
                                tracing::info!(id, ?kind, "Requesting idea suggestion");
                                let (text, failed) = match backend
                                    .suggest_idea(credential.expose(), &idea, kind)
                                    .await
                                {
                                    Ok(text) => (text, false),
                                    Err(e) => {
                                        tracing::error!(id, error = %e, "Idea suggestion failed");
                                        (String::from(BRAINSTORM_FAILED), true)
                                    }
                                };
                                let _ = response_tx.send(NetworkResponse::IdeaSuggested { id, kind, text, failed });
                            });
                        }

                        Some(NetworkCommand::GenerateStoryboard { id, credential, request }) => {
                            let response_tx = self.response_tx.clone();
                            let backend = self.backend.clone();

                            self.active_requests.spawn(async move {
                                tracing::info!(id, "Requesting storyboard");
                                let result = backend.generate_storyboard(credential.expose(), &request).await;
                                match &result {
                                    Ok(sb) => tracing::info!(id, title = %sb.title, "Storyboard ready"),
                                    Err(e) => tracing::error!(id, error = %e, "Storyboard failed"),
                                }
                                let _ = response_tx.send(NetworkResponse::StoryboardGenerated { id, result });
                            });
                        }

                        Some(NetworkCommand::GenerateImage(job)) => self.images.push(job),

                        Some(NetworkCommand::DropPendingPreviews) => self.images.drop_previews(),

                        Some(NetworkCommand::DropPendingImages) => self.images.drop_pending(),

                        Some(NetworkCommand::Shutdown) | None => {
                            // Started requests cannot be cancelled; just stop waiting for them
                            self.active_requests.abort_all();
                            self.images.abort();
                            break;
                        }
                    }
                }

                // Clean up completed tasks
                Some(_result) = self.active_requests.join_next() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::network::{ImageJob, ImagePurpose};
    use crate::models::{Credential, SlotId, StoryboardRequest, SuggestionKind};
    use crate::testing::ScriptedBackend;

    fn key() -> Credential {
        Credential::parse("key").unwrap()
    }

    #[tokio::test]
    async fn test_storyboard_and_images_round_trip() {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
        let actor = NetworkActor::new(Arc::new(ScriptedBackend::new().with_panels(3)), resp_tx);
        let handle = tokio::spawn(actor.run(cmd_rx));

        cmd_tx
            .send(NetworkCommand::GenerateStoryboard {
                id: 1,
                credential: key(),
                request: StoryboardRequest {
                    story_idea: "A robot learns to paint".into(),
                    art_style: "ink".into(),
                    character_descriptions: String::new(),
                },
            })
            .unwrap();
        match resp_rx.recv().await.unwrap() {
            NetworkResponse::StoryboardGenerated { id, result } => {
                assert_eq!(id, 1);
                assert_eq!(result.unwrap().panels.len(), 6);
            }
            other => panic!("unexpected {:?}", other),
        }

        cmd_tx
            .send(NetworkCommand::GenerateImage(ImageJob {
                id: 2,
                credential: key(),
                slot: SlotId::FrontCover,
                prompt: "cover".into(),
                purpose: ImagePurpose::Preview { epoch: 1 },
            }))
            .unwrap();
        assert!(matches!(resp_rx.recv().await, Some(NetworkResponse::ImageStarted { id: 2, .. })));
        match resp_rx.recv().await.unwrap() {
            NetworkResponse::ImageFinished { result, .. } => assert_eq!(result.unwrap(), "img:cover"),
            other => panic!("unexpected {:?}", other),
        }

        cmd_tx.send(NetworkCommand::Shutdown).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_suggestion_reports_kind() {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
        let actor = NetworkActor::new(Arc::new(ScriptedBackend::new()), resp_tx);
        let handle = tokio::spawn(actor.run(cmd_rx));

        cmd_tx
            .send(NetworkCommand::SuggestIdea {
                id: 7,
                credential: key(),
                idea: "A robot".into(),
                kind: SuggestionKind::Sidekick,
            })
            .unwrap();
        match resp_rx.recv().await.unwrap() {
            NetworkResponse::IdeaSuggested { id, text, failed, .. } => {
                assert_eq!(id, 7);
                assert_eq!(text, "Introduce sidekick.");
                assert!(!failed);
            }
            other => panic!("unexpected {:?}", other),
        }

        drop(cmd_tx);
        handle.await.unwrap();
    }
}
