use super::result::{PipelineError, PipelineResponse, PipelineResult, Stage};
use super::scratch::ScratchArea;
use crate::build::BuildExecutor;
use crate::extract::Extractor;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::publish::{ArtifactPublisher, ObjectStore, PublishReport};
use crate::site_config::ConfigInjector;
use crate::trigger::{BuildInvocation, TriggerEvent};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Runs invocations through every stage in order
pub struct PipelineController {
    source_store: Arc<dyn ObjectStore>,
    extractor: Arc<dyn Extractor>,
    injector: ConfigInjector,
    builder: BuildExecutor,
    publisher: ArtifactPublisher,
    scratch_root: PathBuf,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
}

impl PipelineController {
    pub fn new(
        source_store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn Extractor>,
        injector: ConfigInjector,
        builder: BuildExecutor,
        publisher: ArtifactPublisher,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_store,
            extractor,
            injector,
            builder,
            publisher,
            scratch_root: scratch_root.into(),
            progress_handler: None,
        }
    }

    pub fn with_progress_handler(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    /// Runs every invocation carried by `event`, stopping at the first failure
    pub async fn handle_event(&self, event: &TriggerEvent) -> Result<PipelineResponse, PipelineError> {
        debug!(records = event.records.len(), "Received trigger event");
        let invocations = event.invocations()?;

        let mut published = 0;
        for invocation in &invocations {
            published += self.execute(invocation).await.into_result()?.published();
        }

        Ok(PipelineResponse::success(published))
    }

    /// Runs one invocation to completion or first failure
    pub async fn execute(&self, invocation: &BuildInvocation) -> PipelineResult {
        let span = tracing::info_span!(
            "invocation",
            id = %invocation.invocation_id,
            site = %invocation.site_name
        );

        async {
            let start = Instant::now();
            self.emit(&ProgressEvent::Started {
                invocation_id: invocation.invocation_id.to_string(),
                bucket: invocation.bucket.clone(),
                key: invocation.key.clone(),
            });

            let outcome = match ScratchArea::acquire(&self.scratch_root, invocation.invocation_id) {
                Ok(scratch) => {
                    let outcome = self.run_stages(invocation, &scratch).await;
                    let scratch_path = scratch.path().to_path_buf();
                    if let Err(e) = scratch.close() {
                        warn!(path = %scratch_path.display(), error = %e, "Failed to remove scratch area");
                    }
                    outcome
                }
                Err(e) => Err(PipelineError::Scratch(e)),
            };

            match outcome {
                Ok(report) => {
                    self.emit(&ProgressEvent::Completed {
                        published: report.published(),
                        total_time: start.elapsed(),
                    });
                    PipelineResult::Success(report)
                }
                Err(e) => {
                    self.emit(&ProgressEvent::Failed {
                        stage: e.stage(),
                        error: e.to_string(),
                    });
                    PipelineResult::Failure(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        invocation: &BuildInvocation,
        scratch: &ScratchArea,
    ) -> Result<PublishReport, PipelineError> {
        let tree = scratch.working_tree();

        let archive = self
            .stage(Stage::Download, self.download(invocation))
            .await?;

        self.stage(Stage::Extract, async {
            info!(
                extractor = self.extractor.name(),
                dest = %tree.root().display(),
                "Unpacking source archive"
            );
            self.extractor
                .extract(archive, tree.root())
                .await
                .map_err(PipelineError::from)
        })
        .await?;

        self.stage(Stage::Configure, async {
            self.injector
                .inject(tree.root())
                .map(|_| ())
                .map_err(PipelineError::Configure)
        })
        .await?;

        let output_dir = self
            .stage(Stage::Build, async {
                self.builder
                    .run(tree.root())
                    .await
                    .map_err(PipelineError::from)
            })
            .await?;

        self.stage(Stage::Publish, async {
            self.publisher
                .publish(&output_dir)
                .await
                .map_err(PipelineError::from)
        })
        .await
    }

    async fn download(&self, invocation: &BuildInvocation) -> Result<Bytes, PipelineError> {
        info!(bucket = %invocation.bucket, key = %invocation.key, "Downloading source archive");
        let archive = self
            .source_store
            .get_object(&invocation.bucket, &invocation.key)
            .await?;

        info!(
            bytes = archive.len(),
            sha256 = %hex::encode(Sha256::digest(&archive)),
            "Source archive downloaded"
        );
        Ok(archive)
    }

    async fn stage<T, F>(&self, stage: Stage, work: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, PipelineError>>,
    {
        self.emit(&ProgressEvent::StageStarted { stage });
        let stage_start = Instant::now();

        let output = work.await?;

        self.emit(&ProgressEvent::StageComplete {
            stage,
            duration: stage_start.elapsed(),
        });
        Ok(output)
    }

    fn emit(&self, event: &ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(event);
        }
    }
}
