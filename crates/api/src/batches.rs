//! Running image/audio batches, one per `(parent, kind)`.
//!
//! Each batch runs on its own task and reports through a `watch` channel
//! kept here, so progress stays readable after the batch finishes. A second
//! start for the same pair while one is running is a conflict, and so is
//! mixing a batch with single-segment regenerations of the same pair.
//!
//! Tasks get a child of the registry's master cancellation token; shutdown
//! cancels the master and waits up to 5 seconds per task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use studio_core::error::CoreError;
use studio_core::types::DbId;
use studio_db::models::segment::Segment;
use studio_pipeline::{AssetKind, BatchGenerator, BatchProgress, PipelineError, SegmentParent};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type BatchKey = (SegmentParent, AssetKind);

pub struct BatchRegistry {
    generator: Arc<BatchGenerator>,
    runs: Arc<RwLock<HashMap<BatchKey, BatchRun>>>,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

struct BatchRun {
    progress: Arc<watch::Sender<BatchProgress>>,
    /// Latest task for the pair; `None` until a batch is started.
    task_handle: Option<JoinHandle<()>>,
    /// Single-segment regenerations in flight for the pair.
    regenerating: usize,
}

impl BatchRun {
    fn idle(kind: AssetKind) -> Self {
        let (tx, _rx) = watch::channel(BatchProgress::idle(kind));
        Self {
            progress: Arc::new(tx),
            task_handle: None,
            regenerating: 0,
        }
    }

    /// Mark a batch as running, resetting the previous progress.
    fn claim_batch(&mut self, key: BatchKey) -> Result<(), CoreError> {
        if self.progress.borrow().running {
            return Err(busy("batch already running", key));
        }
        if self.regenerating > 0 {
            return Err(busy("segment regeneration in progress", key));
        }
        let (_, kind) = key;
        self.progress.send_replace(BatchProgress {
            running: true,
            ..BatchProgress::idle(kind)
        });
        Ok(())
    }

    /// Count one regeneration in, unless a batch owns the pair.
    fn claim_regeneration(
        &mut self,
        key: BatchKey,
    ) -> Result<Arc<watch::Sender<BatchProgress>>, CoreError> {
        if self.progress.borrow().running {
            return Err(busy("batch running", key));
        }
        self.regenerating += 1;
        Ok(Arc::clone(&self.progress))
    }
}

impl BatchRegistry {
    pub fn new(generator: Arc<BatchGenerator>) -> Self {
        Self {
            generator,
            runs: Arc::new(RwLock::new(HashMap::new())),
            cancel: CancellationToken::new(),
        }
    }

    /// Start a batch in the background and return its initial progress.
    pub async fn start(
        &self,
        parent: SegmentParent,
        kind: AssetKind,
        style: String,
    ) -> Result<BatchProgress, CoreError> {
        let mut runs = self.runs.write().await;
        let run = runs.entry((parent, kind)).or_insert_with(|| BatchRun::idle(kind));
        run.claim_batch((parent, kind))?;

        let generator = Arc::clone(&self.generator);
        let cancel = self.cancel.child_token();
        let tx = Arc::clone(&run.progress);
        run.task_handle = Some(tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(?parent, kind = kind.as_str(), "Batch interrupted by shutdown");
                }
                result = generator.generate_all(parent, kind, &style, &tx) => {
                    if let Err(e) = result {
                        tracing::error!(?parent, kind = kind.as_str(), error = %e, "Batch failed");
                    }
                }
            }
            tx.send_modify(|p| {
                p.running = false;
                p.current_index = None;
            });
        }));

        let initial = run.progress.borrow().clone();
        Ok(initial)
    }

    /// Image then audio progress for a parent. Kinds never started are idle.
    pub async fn progress(&self, parent: SegmentParent) -> Vec<BatchProgress> {
        let runs = self.runs.read().await;
        [AssetKind::Image, AssetKind::Audio]
            .into_iter()
            .map(|kind| match runs.get(&(parent, kind)) {
                Some(run) => run.progress.borrow().clone(),
                None => BatchProgress::idle(kind),
            })
            .collect()
    }

    /// Regenerate one segment's asset, keeping the pair's error list in
    /// step. Refused while a batch for the same pair is running.
    ///
    /// The work runs on its own task so a dropped request still releases
    /// the pair.
    pub async fn regenerate(
        &self,
        parent: SegmentParent,
        segment_id: DbId,
        kind: AssetKind,
        style: &str,
    ) -> Result<Segment, PipelineError> {
        let key = (parent, kind);
        let tx = {
            let mut runs = self.runs.write().await;
            let run = runs.entry(key).or_insert_with(|| BatchRun::idle(kind));
            run.claim_regeneration(key)?
        };

        let generator = Arc::clone(&self.generator);
        let runs = Arc::clone(&self.runs);
        let style = style.to_string();
        let task = tokio::spawn(async move {
            let result = generator.regenerate(segment_id, kind, &style, &tx).await;
            if let Some(run) = runs.write().await.get_mut(&key) {
                run.regenerating = run.regenerating.saturating_sub(1);
            }
            result
        });

        task.await.map_err(|e| {
            PipelineError::Core(CoreError::Internal(format!("Regeneration task failed: {e}")))
        })?
    }

    /// Interrupt running batches and wait up to 5 seconds for each task.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down batch registry");
        self.cancel.cancel();

        let mut runs = self.runs.write().await;
        for ((parent, kind), run) in runs.drain() {
            let Some(handle) = run.task_handle else { continue };
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                tracing::warn!(?parent, kind = kind.as_str(), "Batch task did not stop in time");
            }
        }
    }
}

fn describe(parent: SegmentParent) -> String {
    match parent {
        SegmentParent::Story(id) => format!("story {id}"),
        SegmentParent::Episode(id) => format!("episode {id}"),
    }
}

fn busy(reason: &str, (parent, kind): BatchKey) -> CoreError {
    CoreError::Conflict(format!("{} {reason} for {}", kind.as_str(), describe(parent)))
}
