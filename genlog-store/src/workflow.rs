//! Generation workflow.
//!
//! prompt → decorate → synthesize → archive image → append usage row.
//!
//! The image outcome and the bookkeeping outcomes are kept apart: once an
//! image exists it is always returned, and archive or log failures are
//! reported next to it instead of replacing it.

use chrono::Utc;
use genlog_core::{
    BlobRef, CoreError, GeneratedImage, GenerationParams, ImageSynthesizer, LogEntry, LogTable,
    RemoteLogStore, Session, aspect_directive, decorate, numbered_name,
};
use genlog_fetch::RetryStrategy;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::LogError;
use crate::retry::append_with_retry;

/// How many numbered alternatives of an artifact name are tried.
const MAX_NAME_SUFFIX: u32 = 100;

// ============================================================================
// Request & Outcome
// ============================================================================

/// What the user asked for.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// Prompt as typed.
    pub prompt: String,
    /// Add the lighting phrase.
    pub brighten: bool,
    /// Generation parameters. A `--ar` directive in the prompt overrides the
    /// aspect ratio.
    pub params: GenerationParams,
}

impl GenerationRequest {
    /// Creates a request with default parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the brighten flag.
    pub fn with_brighten(mut self, brighten: bool) -> Self {
        self.brighten = brighten;
        self
    }

    /// Sets the parameters.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// Result of archiving the image blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArchiveStatus {
    /// Stored under the given blob.
    Stored {
        /// The created blob.
        blob: BlobRef,
    },
    /// Archiving is turned off.
    Disabled,
    /// The upload failed.
    Failed {
        /// Error message.
        error: String,
    },
}

/// Result of appending the usage row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogStatus {
    /// Row appended after this many attempts.
    Appended {
        /// Attempts used.
        attempts: u32,
    },
    /// Row not appended.
    Failed(LogError),
}

impl LogStatus {
    /// True if the row was written.
    pub fn is_appended(&self) -> bool {
        matches!(self, LogStatus::Appended { .. })
    }
}

/// Everything a generation produced, reported step by step.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Prompt actually sent to the model.
    pub sent_prompt: String,
    /// Parameters actually sent.
    pub params: GenerationParams,
    /// The image, if the model returned one.
    pub image: Option<GeneratedImage>,
    /// The row describing the image. `None` without an image.
    pub entry: Option<LogEntry>,
    /// Archive step. `None` without an image.
    pub archive: Option<ArchiveStatus>,
    /// Log step. `None` without an image.
    pub log: Option<LogStatus>,
}

impl GenerationOutcome {
    /// True if an image came back but its usage row was not written.
    pub fn logging_failed(&self) -> bool {
        self.image.is_some() && !self.log.as_ref().is_some_and(LogStatus::is_appended)
    }
}

// ============================================================================
// Workflow
// ============================================================================

/// Runs generations against a synthesizer and a log store.
#[derive(Debug)]
pub struct GenerationWorkflow<G, S> {
    synthesizer: G,
    store: S,
    table: LogTable,
    archive_images: bool,
    retry: RetryStrategy,
}

impl<G, S> GenerationWorkflow<G, S>
where
    G: ImageSynthesizer,
    S: RemoteLogStore,
{
    /// Creates a workflow that archives images and retries log appends with
    /// the default strategy.
    pub fn new(synthesizer: G, store: S, table: LogTable) -> Self {
        Self {
            synthesizer,
            store,
            table,
            archive_images: true,
            retry: RetryStrategy::default(),
        }
    }

    /// Turns image archiving on or off.
    pub fn with_archive(mut self, archive_images: bool) -> Self {
        self.archive_images = archive_images;
        self
    }

    /// Sets the retry strategy for log appends.
    pub fn with_retry(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    /// The log store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The synthesizer.
    pub fn synthesizer(&self) -> &G {
        &self.synthesizer
    }

    /// Runs one generation for `session`.
    ///
    /// # Errors
    ///
    /// Only a failed generation is an error. Archive and log failures are
    /// reported in the returned outcome.
    #[instrument(skip_all, fields(user = %session.user(), model = %self.synthesizer.model()))]
    pub async fn run(
        &self,
        session: &Session,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, CoreError> {
        let sent_prompt = decorate(&request.prompt, request.brighten);
        let mut params = request.params.clone();
        if let Some(ratio) = aspect_directive(&request.prompt) {
            params.aspect_ratio = ratio;
        }

        let image = self.synthesizer.generate(&sent_prompt, &params).await?;
        let Some(image) = image else {
            warn!("No image returned, nothing to archive or log");
            return Ok(GenerationOutcome {
                sent_prompt,
                params,
                image: None,
                entry: None,
                archive: None,
                log: None,
            });
        };

        let entry = LogEntry::for_artifact(Utc::now(), session.user(), image.format, &request.prompt);
        let (entry, archive) = self.archive(entry, &image).await;

        let log = match append_with_retry(&entry, &self.table, &self.store, &self.retry).await {
            Ok(attempts) => LogStatus::Appended { attempts },
            Err(e) => {
                warn!(error = %e, "Image ready, logging failed");
                LogStatus::Failed(e)
            }
        };

        info!(artifact = %entry.artifact_name(), logged = log.is_appended(), "Generation finished");
        Ok(GenerationOutcome {
            sent_prompt,
            params,
            image: Some(image),
            entry: Some(entry),
            archive: Some(archive),
            log: Some(log),
        })
    }

    /// Archives the image under a name not yet taken in the folder. The
    /// returned entry carries that name.
    async fn archive(&self, entry: LogEntry, image: &GeneratedImage) -> (LogEntry, ArchiveStatus) {
        if !self.archive_images {
            return (entry, ArchiveStatus::Disabled);
        }
        let name = self.free_name(entry.artifact_name()).await;
        let entry = if name == entry.artifact_name() {
            entry
        } else {
            info!(name = %name, "Artifact name taken, using a numbered one");
            entry.with_artifact_name(name)
        };

        let status = match self
            .store
            .create(
                entry.artifact_name(),
                &self.table.container_id,
                image.format.mime_type(),
                image.data.clone(),
            )
            .await
        {
            Ok(blob) => ArchiveStatus::Stored { blob },
            Err(e) => {
                warn!(error = %e, "Image archive failed");
                ArchiveStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        (entry, status)
    }

    /// First of `base`, `base_1`, `base_2`, ... with no blob in the folder.
    ///
    /// Falls back to `base` when the folder cannot be listed.
    async fn free_name(&self, base: &str) -> String {
        for n in 0..=MAX_NAME_SUFFIX {
            let candidate = numbered_name(base, n);
            match self.store.list(&candidate, &self.table.container_id).await {
                Ok(found) if found.is_empty() => return candidate,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Could not check artifact name");
                    return base.to_string();
                }
            }
        }
        base.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FailurePoint, MemoryLogStore};
    use chrono::TimeZone;
    use genlog_core::row::parse_table;
    use genlog_core::{AccessPolicy, AspectRatio, ImageFormat, LIGHTING_PHRASE};
    use std::sync::Mutex;
    use std::time::Duration;

    const FOLDER: &str = "folder-w";
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

    /// Synthesizer returning a canned answer and remembering requests.
    #[derive(Default)]
    struct FakeSynthesizer {
        empty: bool,
        fail: bool,
        seen: Mutex<Vec<(String, GenerationParams)>>,
    }

    impl ImageSynthesizer for FakeSynthesizer {
        async fn generate(
            &self,
            prompt: &str,
            params: &GenerationParams,
        ) -> Result<Option<GeneratedImage>, CoreError> {
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), params.clone()));
            if self.fail {
                return Err(CoreError::Generation("quota exceeded".into()));
            }
            if self.empty {
                return Ok(None);
            }
            Ok(Some(GeneratedImage::new(PNG.to_vec(), ImageFormat::Png)))
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    fn session() -> Session {
        Session::authenticate("sato", None, &AccessPolicy::open()).unwrap()
    }

    fn workflow(synth: FakeSynthesizer) -> GenerationWorkflow<FakeSynthesizer, MemoryLogStore> {
        GenerationWorkflow::new(synth, MemoryLogStore::new(), LogTable::in_container(FOLDER))
            .with_retry(RetryStrategy::new(3).with_base_delay(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_run_archives_and_logs() {
        let wf = workflow(FakeSynthesizer::default());
        let outcome = wf
            .run(&session(), &GenerationRequest::new("a lighthouse"))
            .await
            .unwrap();

        let entry = outcome.entry.clone().unwrap();
        assert!(entry.artifact_name().ends_with("_sato.png"));
        assert!(matches!(outcome.archive, Some(ArchiveStatus::Stored { .. })));
        assert_eq!(outcome.log, Some(LogStatus::Appended { attempts: 1 }));
        assert!(!outcome.logging_failed());

        let store = wf.store();
        assert_eq!(store.contents_of(FOLDER, entry.artifact_name()), vec![PNG.to_vec()]);
        assert_eq!(
            store.mime_type_of(FOLDER, entry.artifact_name()).as_deref(),
            Some("image/png")
        );
        let rows = parse_table(&store.text_of(FOLDER, "usage_log.csv").unwrap()).unwrap();
        assert_eq!(rows, vec![entry]);
    }

    #[tokio::test]
    async fn test_logs_typed_prompt_and_sends_decorated() {
        let wf = workflow(FakeSynthesizer::default());
        let request = GenerationRequest::new("harbor at dusk --ar 16:9").with_brighten(true);
        let outcome = wf.run(&session(), &request).await.unwrap();

        assert!(outcome.sent_prompt.contains(LIGHTING_PHRASE));
        assert_eq!(outcome.params.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(outcome.entry.unwrap().prompt(), "harbor at dusk --ar 16:9");

        let seen = wf.synthesizer().seen.lock().unwrap();
        assert_eq!(seen[0].0, outcome.sent_prompt);
    }

    #[tokio::test]
    async fn test_no_image_writes_nothing() {
        let wf = workflow(FakeSynthesizer {
            empty: true,
            ..FakeSynthesizer::default()
        });
        let outcome = wf.run(&session(), &GenerationRequest::new("x")).await.unwrap();

        assert!(outcome.image.is_none());
        assert!(outcome.log.is_none());
        assert!(!outcome.logging_failed());
        assert!(wf.store().is_empty());
        assert_eq!(wf.store().calls().lists, 0);
    }

    #[tokio::test]
    async fn test_generation_failure_is_error() {
        let wf = workflow(FakeSynthesizer {
            fail: true,
            ..FakeSynthesizer::default()
        });
        let err = wf.run(&session(), &GenerationRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, CoreError::Generation(_)));
        assert!(wf.store().is_empty());
    }

    #[tokio::test]
    async fn test_logging_failure_keeps_image() {
        let wf = workflow(FakeSynthesizer::default()).with_archive(false);
        wf.store().fail_next(FailurePoint::Create);

        let outcome = wf.run(&session(), &GenerationRequest::new("x")).await.unwrap();
        assert!(outcome.image.is_some());
        assert_eq!(outcome.archive, Some(ArchiveStatus::Disabled));
        assert!(matches!(
            outcome.log,
            Some(LogStatus::Failed(LogError::WriteFailed(_)))
        ));
        assert!(outcome.logging_failed());
    }

    #[tokio::test]
    async fn test_free_name_skips_taken_names() {
        let wf = workflow(FakeSynthesizer::default());
        wf.store().seed(FOLDER, "20250101_120000_sato.png", PNG);
        wf.store().seed(FOLDER, "20250101_120000_sato_1.png", PNG);

        assert_eq!(wf.free_name("20250101_120000_sato.png").await, "20250101_120000_sato_2.png");
        assert_eq!(wf.free_name("20250101_120001_sato.png").await, "20250101_120001_sato.png");
    }

    #[tokio::test]
    async fn test_free_name_falls_back_when_listing_fails() {
        let wf = workflow(FakeSynthesizer::default());
        wf.store().fail_next(FailurePoint::List);
        assert_eq!(wf.free_name("a.png").await, "a.png");
    }

    #[tokio::test]
    async fn test_archive_renames_and_row_follows() {
        let wf = workflow(FakeSynthesizer::default());
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let entry = LogEntry::for_artifact(ts, "sato", ImageFormat::Png, "second");
        wf.store().seed(FOLDER, entry.artifact_name(), PNG);

        let image = GeneratedImage::new(PNG.to_vec(), ImageFormat::Png);
        let (entry, status) = wf.archive(entry, &image).await;
        assert_eq!(entry.artifact_name(), "20250101_120000_sato_1.png");
        match status {
            ArchiveStatus::Stored { blob } => assert_eq!(blob.name, entry.artifact_name()),
            other => panic!("expected stored, got {other:?}"),
        }
        assert_eq!(wf.store().contents_of(FOLDER, "20250101_120000_sato.png").len(), 1);
    }

    #[tokio::test]
    async fn test_archive_failure_still_logs() {
        let wf = workflow(FakeSynthesizer::default());
        wf.store().fail_next(FailurePoint::Create);

        let outcome = wf.run(&session(), &GenerationRequest::new("x")).await.unwrap();
        assert!(matches!(outcome.archive, Some(ArchiveStatus::Failed { .. })));
        assert!(outcome.log.unwrap().is_appended());
    }
}
