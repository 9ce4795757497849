/*!
 * Translation job pipeline.
 *
 * - `chunking`: groups subtitle cues into provider-sized chunks
 * - `reconcile`: repairs a reply that merged the first units
 * - `retry`: bounded retry state machine with injectable waiting
 * - `diagnostics`: sinks for count-mismatch dumps
 * - `pipeline`: job queue, workers and the in-flight registry
 */

pub mod chunking;
pub mod diagnostics;
pub mod pipeline;
pub mod reconcile;
pub mod retry;

pub use self::chunking::{chunk_boundaries, ChunkLimits};
pub use self::diagnostics::{DiagnosticSink, FileDiagnosticSink, MemorySink, MismatchDump, NullSink};
pub use self::pipeline::{
    DefaultProviderFactory, HttpFetcher, InFlightGuard, InFlightRegistry, JobRunner, ProviderFactory,
    SubtitleFetcher, TranslationJob, TranslationPipeline,
};
pub use self::reconcile::reconcile_unit_count;
pub use self::retry::{run_with_retry, Delay, RecordingDelay, RetryPolicy, RetryStep, TokioDelay};
