//! Single-worker image queue
//!
//! Jobs run strictly in submission order with at most one request in flight.
//! A started job always runs to completion; only jobs still waiting in the
//! queue can be dropped.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::messages::network::ImageJob;
use crate::messages::NetworkResponse;
use crate::network::backend::GenerationBackend;

enum QueueMessage {
    Push(ImageJob),
    DropPreviews,
    DropAll,
}

/// Handle to the worker task
pub struct ImageQueue {
    tx: mpsc::UnboundedSender<QueueMessage>,
    worker: JoinHandle<()>,
}

impl ImageQueue {
    /// Spawn the worker; progress is reported on `events`
    pub fn spawn(
        backend: Arc<dyn GenerationBackend>,
        events: mpsc::UnboundedSender<NetworkResponse>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(backend, rx, events));
        ImageQueue { tx, worker }
    }

    pub fn push(&self, job: ImageJob) {
        let _ = self.tx.send(QueueMessage::Push(job));
    }

    /// Drop preview jobs that have not started yet
    pub fn drop_previews(&self) {
        let _ = self.tx.send(QueueMessage::DropPreviews);
    }

    /// Drop every job that has not started yet
    pub fn drop_pending(&self) {
        let _ = self.tx.send(QueueMessage::DropAll);
    }

    /// Stop accepting jobs and wait for the queued ones to drain
    pub async fn shutdown(self) {
        drop(self.tx);
        let _ = self.worker.await;
    }

    /// Stop without waiting for queued jobs
    pub fn abort(self) {
        self.worker.abort();
    }
}

fn apply(pending: &mut VecDeque<ImageJob>, msg: QueueMessage) {
    match msg {
        QueueMessage::Push(job) => pending.push_back(job),
        QueueMessage::DropPreviews => {
            let before = pending.len();
            pending.retain(|job| !job.purpose.is_preview());
            let dropped = before - pending.len();
            if dropped > 0 {
                tracing::info!(dropped, "Dropped pending preview jobs");
            }
        }
        QueueMessage::DropAll => {
            if !pending.is_empty() {
                tracing::info!(dropped = pending.len(), "Dropped all pending image jobs");
                pending.clear();
            }
        }
    }
}

async fn run_worker(
    backend: Arc<dyn GenerationBackend>,
    mut rx: mpsc::UnboundedReceiver<QueueMessage>,
    events: mpsc::UnboundedSender<NetworkResponse>,
) {
    let mut pending: VecDeque<ImageJob> = VecDeque::new();

    loop {
        if pending.is_empty() {
            match rx.recv().await {
                Some(msg) => apply(&mut pending, msg),
                None => break,
            }
        }
        // Anything that arrived while the last job ran is applied before
        // picking the next one, so drops take effect immediately.
        while let Ok(msg) = rx.try_recv() {
            apply(&mut pending, msg);
        }

        let Some(job) = pending.pop_front() else {
            continue;
        };

        let _ = events.send(NetworkResponse::ImageStarted {
            id: job.id,
            slot: job.slot,
            purpose: job.purpose,
        });

        tracing::info!(id = job.id, slot = %job.slot, purpose = ?job.purpose, "Generating image");
        let result = backend
            .generate_image(job.credential.expose(), &job.prompt)
            .await;
        match &result {
            Ok(bytes) => tracing::info!(id = job.id, slot = %job.slot, len = bytes.len(), "Image ready"),
            Err(e) => tracing::error!(id = job.id, slot = %job.slot, error = %e, "Image generation failed"),
        }

        let _ = events.send(NetworkResponse::ImageFinished {
            id: job.id,
            slot: job.slot,
            purpose: job.purpose,
            result,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::network::ImagePurpose;
    use crate::models::{Credential, SlotId};
    use crate::testing::ScriptedBackend;
    use std::sync::atomic::Ordering;

    fn job(id: u64, slot: SlotId, purpose: ImagePurpose) -> ImageJob {
        ImageJob {
            id,
            credential: Credential::parse("key").unwrap(),
            slot,
            prompt: format!("prompt {}", id),
            purpose,
        }
    }

    #[tokio::test]
    async fn test_jobs_run_in_order_one_at_a_time() {
        let backend = Arc::new(ScriptedBackend::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let queue = ImageQueue::spawn(backend.clone(), tx);

        for (i, slot) in SlotId::all().into_iter().enumerate() {
            queue.push(job(i as u64, slot, ImagePurpose::Final { run: 1, index: i }));
        }
        queue.shutdown().await;

        let mut started = Vec::new();
        let mut finished = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                NetworkResponse::ImageStarted { id, .. } => started.push(id),
                NetworkResponse::ImageFinished { id, result, .. } => {
                    assert!(result.is_ok());
                    // every start is followed by its own finish
                    assert_eq!(started.last(), Some(&id));
                    finished.push(id);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }

        assert_eq!(finished, (0..8).collect::<Vec<u64>>());
        assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(backend.image_calls().len(), 8);
    }

    #[tokio::test]
    async fn test_pending_previews_can_be_dropped() {
        let backend = Arc::new(ScriptedBackend::gated());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let queue = ImageQueue::spawn(backend.clone(), tx);

        queue.push(job(1, SlotId::FrontCover, ImagePurpose::Final { run: 1, index: 0 }));
        queue.push(job(2, SlotId::Panel(1), ImagePurpose::Preview { epoch: 1 }));
        queue.push(job(3, SlotId::Panel(2), ImagePurpose::Preview { epoch: 1 }));

        // job 1 is now blocked inside the backend
        match rx.recv().await {
            Some(NetworkResponse::ImageStarted { id, .. }) => assert_eq!(id, 1),
            other => panic!("unexpected event {:?}", other),
        }

        queue.drop_previews();
        queue.push(job(4, SlotId::Panel(1), ImagePurpose::Final { run: 1, index: 1 }));
        backend.release(10);
        queue.shutdown().await;

        let mut finished = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let NetworkResponse::ImageFinished { id, .. } = event {
                finished.push(id);
            }
        }
        assert_eq!(finished, vec![1, 4]);
    }

    #[tokio::test]
    async fn test_drop_pending_keeps_only_the_started_job() {
        let backend = Arc::new(ScriptedBackend::gated());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let queue = ImageQueue::spawn(backend.clone(), tx);

        for (i, slot) in SlotId::all().into_iter().enumerate() {
            queue.push(job(i as u64, slot, ImagePurpose::Final { run: 1, index: i }));
        }
        match rx.recv().await {
            Some(NetworkResponse::ImageStarted { id, .. }) => assert_eq!(id, 0),
            other => panic!("unexpected event {:?}", other),
        }

        queue.drop_pending();
        queue.push(job(20, SlotId::FrontCover, ImagePurpose::Final { run: 2, index: 0 }));
        backend.release(10);
        queue.shutdown().await;

        let finished: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                NetworkResponse::ImageFinished { id, .. } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(finished, vec![0, 20]);
        assert_eq!(backend.image_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let backend = Arc::new(ScriptedBackend::new().fail_on("prompt 2"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let queue = ImageQueue::spawn(backend, tx);

        queue.push(job(2, SlotId::Panel(2), ImagePurpose::Regenerate { run: 1 }));
        queue.push(job(3, SlotId::Panel(3), ImagePurpose::Regenerate { run: 1 }));
        queue.shutdown().await;

        let results: Vec<bool> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                NetworkResponse::ImageFinished { result, .. } => Some(result.is_ok()),
                _ => None,
            })
            .collect();
        assert_eq!(results, vec![false, true]);
    }
}
