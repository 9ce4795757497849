/*!
 * Background translation pipeline.
 *
 * Jobs go through an unbounded tokio channel to a fixed set of workers.
 * Each job downloads its source subtitle, translates it chunk by chunk with
 * bounded retries, and replaces the sentinel with the finished file. A job
 * that fails marks its record Failed and leaves the sentinel for the next
 * request to clean up; nothing is requeued automatically.
 */

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::chunking::{chunk_boundaries, ChunkLimits};
use super::diagnostics::{DiagnosticSink, MismatchDump, NullSink};
use super::reconcile::reconcile_unit_count;
use super::retry::{run_with_retry, Delay, RetryPolicy, TokioDelay};
use crate::artifacts::ArtifactStore;
use crate::database::{ArtifactKey, ArtifactRecord};
use crate::errors::TranslationError;
use crate::media::SubtitleCandidate;
use crate::providers::{build_provider, Provider, ProviderSettings};
use crate::subtitle_processor::SubtitleCollection;

/// One queued translation; discarded after it succeeds or fails
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub id: Uuid,
    /// Destination artifact; carries media, target language and provider namespace
    pub key: ArtifactKey,
    pub source: SubtitleCandidate,
    pub provider: ProviderSettings,
    pub chunk_limits: ChunkLimits,
}

impl TranslationJob {
    pub fn new(key: ArtifactKey, source: SubtitleCandidate, provider: ProviderSettings, chunk_limits: ChunkLimits) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            source,
            provider,
            chunk_limits,
        }
    }
}

/// Downloads source subtitle bodies
#[async_trait]
pub trait SubtitleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TranslationError>;
}

/// Fetcher over HTTP
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, TranslationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::Configuration(format!("Failed to build download client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SubtitleFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TranslationError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TranslationError::Download(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Download(format!("HTTP {} from {}", status, url)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TranslationError::Download(format!("{}: {}", url, e)))?;
        Ok(body.to_vec())
    }
}

/// Builds provider clients for jobs
pub trait ProviderFactory: Send + Sync {
    fn create(&self, settings: &ProviderSettings) -> Result<Arc<dyn Provider>, TranslationError>;
}

/// Factory building real HTTP clients
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProviderFactory;

impl ProviderFactory for DefaultProviderFactory {
    fn create(&self, settings: &ProviderSettings) -> Result<Arc<dyn Provider>, TranslationError> {
        build_provider(settings)
    }
}

/// Keys with a job queued or running in this process
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    keys: Arc<Mutex<HashSet<ArtifactKey>>>,
}

/// Releases its key when dropped
pub struct InFlightGuard {
    registry: InFlightRegistry,
    key: ArtifactKey,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a key; `None` when someone else holds it
    pub fn try_claim(&self, key: &ArtifactKey) -> Option<InFlightGuard> {
        if self.keys.lock().insert(key.clone()) {
            Some(InFlightGuard {
                registry: self.clone(),
                key: key.clone(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, key: &ArtifactKey) -> bool {
        self.keys.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.keys.lock().remove(&self.key);
    }
}

/// Executes jobs; shared by every worker
pub struct JobRunner {
    store: ArtifactStore,
    fetcher: Arc<dyn SubtitleFetcher>,
    providers: Arc<dyn ProviderFactory>,
    diagnostics: Arc<dyn DiagnosticSink>,
    delay: Arc<dyn Delay>,
    retry: RetryPolicy,
}

impl JobRunner {
    pub fn new(store: ArtifactStore, fetcher: Arc<dyn SubtitleFetcher>, providers: Arc<dyn ProviderFactory>) -> Self {
        Self {
            store,
            fetcher,
            providers,
            diagnostics: Arc::new(NullSink),
            delay: Arc::new(TokioDelay),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run a job and settle its record either way
    pub async fn process(&self, job: &TranslationJob) -> Result<ArtifactRecord, TranslationError> {
        info!("Job {} started for {} from {}", job.id, job.key, job.source.source_name);

        match self.run(job).await {
            Ok(record) => {
                info!("Job {} finished for {}", job.id, job.key);
                Ok(record)
            }
            Err(e) => {
                error!("Job {} failed for {}: {}", job.id, job.key, e);
                if let Err(mark_err) = self.store.mark_failed(&job.key).await {
                    warn!("Could not mark {} as failed: {}", job.key, mark_err);
                }
                Err(e)
            }
        }
    }

    /// Run a job without touching the record on failure
    pub async fn run(&self, job: &TranslationJob) -> Result<ArtifactRecord, TranslationError> {
        let provider = self.providers.create(&job.provider)?;

        let body = self.fetcher.fetch(&job.source.source_url).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(TranslationError::Download(format!(
                "Empty subtitle body from {}",
                job.source.source_url
            )));
        }

        let subtitles = SubtitleCollection::from_bytes(&body)
            .map_err(|e| TranslationError::Download(e.to_string()))?;
        let units = subtitles.texts();
        let boundaries = chunk_boundaries(&units, job.chunk_limits);

        debug!(
            "Job {}: {} units in {} chunks via {}",
            job.id,
            units.len(),
            boundaries.len(),
            provider.name()
        );

        let mut translated = Vec::with_capacity(units.len());
        for (chunk_index, range) in boundaries.into_iter().enumerate() {
            let chunk = &units[range];
            let output = run_with_retry(&self.retry, self.delay.as_ref(), |attempt| {
                self.translate_chunk(provider.as_ref(), job, chunk_index, chunk, attempt)
            })
            .await?;
            translated.extend(output);
        }

        let finished = subtitles
            .with_texts(&translated)
            .map_err(|e| TranslationError::Storage(e.to_string()))?;

        self.store
            .complete(&job.key, &finished)
            .await
            .map_err(|e| TranslationError::Storage(e.to_string()))
    }

    async fn translate_chunk(
        &self,
        provider: &dyn Provider,
        job: &TranslationJob,
        chunk_index: usize,
        chunk: &[String],
        attempt: u32,
    ) -> Result<Vec<String>, TranslationError> {
        let reply = provider.translate_units(chunk, &job.key.language).await?;
        let reply = reconcile_unit_count(chunk.len(), reply);

        if reply.len() != chunk.len() {
            self.diagnostics.record(&MismatchDump {
                job_id: job.id,
                chunk: chunk_index,
                attempt,
                expected: chunk.len(),
                actual: reply.len(),
                source_units: chunk.to_vec(),
                translated_units: reply.clone(),
            });
            return Err(TranslationError::CountMismatch {
                expected: chunk.len(),
                actual: reply.len(),
            });
        }

        Ok(reply)
    }
}

struct QueuedJob {
    job: TranslationJob,
    _guard: InFlightGuard,
}

/// Work queue drained by a fixed number of workers
pub struct TranslationPipeline {
    sender: Mutex<Option<UnboundedSender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    in_flight: InFlightRegistry,
}

impl TranslationPipeline {
    /// Spawn `workers` workers on the current tokio runtime
    pub fn start(runner: JobRunner, workers: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let runner = Arc::new(runner);

        let handles = (0..workers.max(1))
            .map(|worker_id| tokio::spawn(worker_loop(worker_id, runner.clone(), receiver.clone())))
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
            in_flight: InFlightRegistry::new(),
        }
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    /// Queue a job; the guard is held until the job settles
    pub fn enqueue(&self, job: TranslationJob, guard: InFlightGuard) -> Result<(), TranslationError> {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(TranslationError::Configuration("Translation queue is closed".to_string()));
        };

        debug!("Queued job {} for {}", job.id, job.key);
        sender
            .send(QueuedJob { job, _guard: guard })
            .map_err(|_| TranslationError::Configuration("Translation queue is closed".to_string()))
    }

    /// Close the queue and wait for every worker to finish its backlog
    pub async fn drain(&self) {
        self.sender.lock().take();
        let handles = std::mem::take(&mut *self.workers.lock());

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("Translation worker ended abnormally: {}", e);
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    runner: Arc<JobRunner>,
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<QueuedJob>>>,
) {
    debug!("Translation worker {} started", worker_id);

    loop {
        let next = receiver.lock().await.recv().await;
        let Some(queued) = next else {
            break;
        };

        // Outcome is logged and recorded by the runner
        let _ = runner.process(&queued.job).await;
    }

    debug!("Translation worker {} stopped", worker_id);
}
