//! Per-platform publish orchestration.
//!
//! One [`Orchestrator`] owns one platform's publisher and runs the full
//! sequence for an asset:
//!
//! credentials → stage → (validate) → submit → initial delay → poll →
//! finalize → unstage
//!
//! `publish` never returns an error. Every failure becomes a
//! [`PublishResult`] with an [`ErrorKind`](reelpost_models::ErrorKind), and
//! unstaging runs exactly once for every stage call, whatever happened in
//! between.

use std::sync::Arc;
use std::time::Duration;

use reelpost_models::{
    MediaAsset, MediaKind, Platform, PostMetadata, ProgressEvent, PublishJob, PublishPhase,
    PublishResult, StagedMedia, StagingRecord,
};
use reelpost_platforms::PlatformPublisher;
use tokio::time::Instant;
use tracing::Instrument;

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics::record_publish_result;
use crate::notify::NotificationSink;
use crate::poller::{PollOutcome, PollPolicy, StatusPoller};
use crate::staging::Staging;
use crate::validation::MediaValidator;

/// Publishes assets to one platform.
pub struct Orchestrator {
    publisher: Arc<dyn PlatformPublisher>,
    staging: Arc<dyn Staging>,
    poller: StatusPoller,
    validator: Option<Arc<dyn MediaValidator>>,
    deadline: Option<Duration>,
    default_caption: Option<String>,
}

impl Orchestrator {
    pub fn new(
        publisher: Arc<dyn PlatformPublisher>,
        staging: Arc<dyn Staging>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            publisher,
            staging,
            poller: StatusPoller::new(policy),
            validator: None,
            deadline: None,
            default_caption: None,
        }
    }

    /// Run `validator` on staged media before submission.
    pub fn with_validator(mut self, validator: Arc<dyn MediaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Abort polling once `deadline` has passed since the publish started.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Caption used for assets that have none.
    pub fn with_default_caption(mut self, caption: Option<String>) -> Self {
        self.default_caption = caption;
        self
    }

    pub fn platform(&self) -> Platform {
        self.publisher.platform()
    }

    pub fn staging(&self) -> &Arc<dyn Staging> {
        &self.staging
    }

    /// Checks that need no network: credentials and media kind.
    pub fn preflight(&self, kind: MediaKind) -> WorkerResult<()> {
        self.publisher
            .check_credentials()
            .map_err(|e| WorkerError::config_error(e.detail()))?;

        if !self.publisher.supports(kind) {
            return Err(WorkerError::SubmissionFailed(format!(
                "{} does not accept {} posts",
                self.platform().display_name(),
                kind.as_str()
            )));
        }
        Ok(())
    }

    /// Publish `asset` end to end, staging and unstaging it.
    pub async fn publish(
        &self,
        asset: &MediaAsset,
        notify: &dyn NotificationSink,
    ) -> PublishResult {
        let started = Instant::now();
        let logger = JobLogger::new(&asset.id, self.platform());
        let span = logger.create_span();

        async {
            logger.log_start(&format!("source={}", asset.source.kind_str()));
            self.emit(notify, PublishPhase::Validating, "Checking credentials");

            if let Err(e) = self.preflight(asset.kind) {
                return self.finish(Err(e), &logger, notify, started);
            }

            let mut record = StagingRecord::new(asset.id.clone());
            self.emit(notify, PublishPhase::Staging, "Staging media");
            let outcome = match self.staging.stage(asset, &mut record).await {
                Ok(staged) => {
                    let metadata = self.metadata_for(asset);
                    self.execute(&staged, &metadata, notify, &logger, started).await
                }
                Err(e) => Err(e),
            };

            self.emit(notify, PublishPhase::CleaningUp, "Cleaning up staged media");
            let report = self.staging.unstage(&record).await;
            if !report.is_clean() {
                logger.log_warning(&report.errors.join("; "));
                notify.notify(ProgressEvent::for_platform(
                    self.platform(),
                    PublishPhase::CleaningUp,
                    format!("Cleanup incomplete: {}", report.errors.join("; ")),
                ));
            }

            self.finish(outcome, &logger, notify, started)
        }
        .instrument(span)
        .await
    }

    /// Publish media that another component staged (and will unstage).
    pub async fn run_staged(
        &self,
        staged: &StagedMedia,
        metadata: &PostMetadata,
        notify: &dyn NotificationSink,
    ) -> PublishResult {
        let started = Instant::now();
        let logger = JobLogger::new(&staged.asset_id, self.platform());
        let span = logger.create_span();

        async {
            logger.log_start("using shared staged media");
            let metadata = match (&metadata.caption, &self.default_caption) {
                (None, Some(fallback)) => PostMetadata {
                    caption: Some(fallback.clone()),
                    kind: metadata.kind,
                },
                _ => metadata.clone(),
            };

            let outcome = match self.preflight(staged.kind) {
                Ok(()) => self.execute(staged, &metadata, notify, &logger, started).await,
                Err(e) => Err(e),
            };
            self.finish(outcome, &logger, notify, started)
        }
        .instrument(span)
        .await
    }

    /// Turn an error that happened outside this orchestrator (e.g. shared
    /// staging) into this platform's result.
    pub fn fail(
        &self,
        asset: &MediaAsset,
        err: WorkerError,
        notify: &dyn NotificationSink,
    ) -> PublishResult {
        let logger = JobLogger::new(&asset.id, self.platform());
        self.finish(Err(err), &logger, notify, Instant::now())
    }

    /// Validate, submit, poll and finalize. Returns the published media id.
    async fn execute(
        &self,
        staged: &StagedMedia,
        metadata: &PostMetadata,
        notify: &dyn NotificationSink,
        logger: &JobLogger,
        started: Instant,
    ) -> WorkerResult<String> {
        let deadline = self.deadline.map(|d| started + d);
        let platform = self.platform();

        if let Some(validator) = &self.validator {
            self.emit(notify, PublishPhase::Validating, "Validating media");
            validator.validate(staged).await?;
        }

        self.emit(notify, PublishPhase::Submitting, "Submitting media");
        let job_id = self
            .publisher
            .submit(staged, metadata)
            .await
            .map_err(WorkerError::from_submit)?;
        tracing::Span::current().record("job_id", job_id.as_str());
        logger.log_progress(&format!("submitted job {}", job_id));

        let mut job = PublishJob::new(platform, job_id);

        let policy = self.poller.policy();
        self.emit(
            notify,
            PublishPhase::Waiting,
            format!(
                "Waiting {}s for processing to start",
                policy.initial_delay.as_secs()
            ),
        );
        if !self.poller.wait_initial_delay(deadline).await {
            return Err(WorkerError::processing_timed_out(format!(
                "deadline reached before the first status check; job {} may still be processing",
                job.job_id
            )));
        }

        self.emit(
            notify,
            PublishPhase::Polling,
            format!(
                "Checking processing status every {}s (up to {} checks)",
                policy.interval.as_secs(),
                policy.max_attempts
            ),
        );
        match self.poller.poll(self.publisher.as_ref(), &mut job, deadline).await {
            PollOutcome::Succeeded => {}
            PollOutcome::Failed { detail } => {
                return Err(WorkerError::processing_failed(detail));
            }
            PollOutcome::TimedOut { attempts } => {
                return Err(WorkerError::processing_timed_out(format!(
                    "no terminal status after {} checks; job {} may still be processing",
                    attempts, job.job_id
                )));
            }
        }

        self.emit(notify, PublishPhase::Finalizing, "Publishing");
        let media_id = self
            .publisher
            .finalize(&job.job_id)
            .await
            .map_err(WorkerError::from_finalize)?;

        Ok(media_id)
    }

    fn finish(
        &self,
        outcome: WorkerResult<String>,
        logger: &JobLogger,
        notify: &dyn NotificationSink,
        started: Instant,
    ) -> PublishResult {
        let platform = self.platform();
        let result = match outcome {
            Ok(media_id) => {
                let link = self
                    .publisher
                    .media_url(&media_id)
                    .map(|url| format!(" {}", url))
                    .unwrap_or_default();
                logger.log_completion(&format!("media_id={}", media_id));
                self.emit(notify, PublishPhase::Done, format!("Published{}", link));
                PublishResult::succeeded(platform, media_id)
            }
            Err(e) => {
                let kind = e.kind();
                let detail = e.detail();
                if kind.needs_attention() {
                    logger.log_error(&format!("{}: {} (needs manual check)", kind, detail));
                } else {
                    logger.log_error(&format!("{}: {}", kind, detail));
                }
                self.emit(notify, PublishPhase::Failed, format!("{}: {}", kind, detail));
                PublishResult::failed(platform, kind, detail)
            }
        };

        record_publish_result(&result, started.elapsed().as_secs_f64());
        result
    }

    fn metadata_for(&self, asset: &MediaAsset) -> PostMetadata {
        let mut metadata = asset.metadata();
        if metadata.caption.is_none() {
            metadata.caption = self.default_caption.clone();
        }
        metadata
    }

    fn emit(&self, notify: &dyn NotificationSink, phase: PublishPhase, message: impl Into<String>) {
        notify.notify(ProgressEvent::for_platform(self.platform(), phase, message));
    }
}
