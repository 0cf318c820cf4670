//! Incremental metrics engine
//!
//! Keeps the document totals current without rescanning the buffer on every
//! keystroke. Each edit is bracketed by [`MetricsEngine::notify_edit`] and
//! [`MetricsEngine::finish_edit`]; in between the caller mutates the buffer.
//! Only the slice around the edit is captured and rescanned, either as a
//! before/after delta or by re-slicing the cached chunks it touches.
//!
//! Flow (asynchronous mode):
//!   finish_edit → Job (owned snapshot, revision) → (worker thread)
//!              → JobResult → poll() → MetricsEvent::Changed
//!
//! The worker processes jobs in order. Every result carries the revision it
//! was computed for and only the result for the latest revision is published;
//! anything older is discarded, so under sustained edits nothing is published
//! until the worker catches up with the newest revision.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::buffer::EditBuffer;
use crate::metrics::Metrics;
use crate::range::TextRange;

/// Default maximum chunk length in chars
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default delay before the busy indicator is raised
pub const DEFAULT_RECOMPUTE_GRACE: Duration = Duration::from_millis(250);

/// How edits update the running totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsMode {
    /// Subtract the metrics of the old slice, add those of the new one
    Delta,
    /// Recompute the cached chunks the edit touches
    #[default]
    Chunked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSettings {
    pub mode: MetricsMode,
    pub chunk_size: usize,
    pub recompute_grace: Duration,
    /// Compute on a background worker instead of inline
    pub asynchronous: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            mode: MetricsMode::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            recompute_grace: DEFAULT_RECOMPUTE_GRACE,
            asynchronous: true,
        }
    }
}

impl MetricsSettings {
    /// Inline computation, handy for tools and tests
    pub fn synchronous() -> Self {
        Self {
            asynchronous: false,
            ..Self::default()
        }
    }
}

/// Notification sent to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsEvent {
    /// New totals were published
    Changed(Metrics),
    /// A recomputation is taking longer than the grace period (true) or has
    /// finished after such a report (false)
    Recomputing(bool),
}

/// Owned snapshot of a buffer slice, with the char right before it
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fragment {
    text: String,
    preceding: Option<char>,
    len_chars: usize,
}

impl Fragment {
    fn metrics(&self) -> Metrics {
        Metrics::of_fragment(&self.text, self.preceding)
    }
}

/// Split `text` into fragments of at most `chunk_size` chars
fn split_fragments(text: &str, preceding: Option<char>, chunk_size: usize) -> Vec<Fragment> {
    let size = chunk_size.max(1);
    let mut fragments = Vec::new();
    let mut prev = preceding;
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == size {
            fragments.push(Fragment {
                text: std::mem::take(&mut current),
                preceding: prev,
                len_chars: count,
            });
            prev = Some(ch);
            count = 0;
        }
    }
    if count > 0 {
        fragments.push(Fragment {
            text: current,
            preceding: prev,
            len_chars: count,
        });
    }

    fragments
}

/// Work sent to the worker (or applied inline)
#[derive(Debug)]
enum Job {
    /// Replace all state with the given chunks
    Reindex {
        revision: u64,
        chunks: Vec<Fragment>,
    },
    /// Running totals minus `before` plus `after`
    Delta {
        revision: u64,
        before: Fragment,
        after: Fragment,
    },
    /// Replace `removed` chunks starting at `first` with `chunks`
    Splice {
        revision: u64,
        first: usize,
        removed: usize,
        chunks: Vec<Fragment>,
    },
}

impl Job {
    fn revision(&self) -> u64 {
        match self {
            Job::Reindex { revision, .. }
            | Job::Delta { revision, .. }
            | Job::Splice { revision, .. } => *revision,
        }
    }

    fn is_reindex(&self) -> bool {
        matches!(self, Job::Reindex { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JobResult {
    revision: u64,
    total: Metrics,
}

/// Running totals plus per-chunk cache.
///
/// In delta mode the chunk cache is only set by re-indexing and goes stale;
/// delta jobs never read it.
#[derive(Debug, Default)]
struct MetricsState {
    chunks: Vec<Metrics>,
    raw: Metrics,
}

impl MetricsState {
    /// Apply `job` and return the document total
    fn apply(&mut self, job: Job) -> Metrics {
        match job {
            Job::Reindex { chunks, .. } => {
                self.chunks = chunks.iter().map(Fragment::metrics).collect();
                self.raw = self.chunks.iter().sum();
            }
            Job::Delta { before, after, .. } => {
                self.raw -= before.metrics();
                self.raw += after.metrics();
            }
            Job::Splice {
                first,
                removed,
                chunks,
                ..
            } => {
                let first = first.min(self.chunks.len());
                let end = (first + removed).min(self.chunks.len());
                let fresh: Vec<Metrics> = chunks.iter().map(Fragment::metrics).collect();
                let stale: Metrics = self.chunks.splice(first..end, fresh.iter().copied()).sum();
                self.raw -= stale;
                self.raw += fresh.iter().sum::<Metrics>();
            }
        }
        self.raw.with_trailing_line()
    }
}

/// Worker loop: drain the queue, drop jobs superseded by a re-index, apply
/// the rest and report the total for the last one.
fn run_worker(jobs: Receiver<Job>, results: Sender<JobResult>) {
    let mut state = MetricsState::default();

    while let Ok(job) = jobs.recv() {
        let mut batch = vec![job];
        batch.extend(jobs.try_iter());

        if let Some(last_reindex) = batch.iter().rposition(Job::is_reindex) {
            if last_reindex > 0 {
                tracing::debug!("Dropping {} metrics jobs superseded by re-index", last_reindex);
                batch.drain(..last_reindex);
            }
        }

        let mut latest = None;
        for job in batch {
            let revision = job.revision();
            let total = state.apply(job);
            latest = Some(JobResult { revision, total });
        }

        if let Some(result) = latest {
            if results.send(result).is_err() {
                break;
            }
        }
    }

    tracing::debug!("Metrics worker exiting");
}

enum Backend {
    Inline(MetricsState),
    Worker {
        jobs: Option<Sender<Job>>,
        results: Receiver<JobResult>,
        handle: Option<JoinHandle<()>>,
    },
}

impl Backend {
    fn spawn() -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("quire-metrics".to_string())
            .spawn(move || run_worker(job_rx, result_tx))?;

        Ok(Backend::Worker {
            jobs: Some(job_tx),
            results: result_rx,
            handle: Some(handle),
        })
    }
}

/// Chunks touched by an edit, in pre-edit coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkSpan {
    first: usize,
    removed: usize,
    start: usize,
    len_chars: usize,
}

#[derive(Debug)]
enum PendingKind {
    /// Nothing indexed yet; the edit triggers a full re-index
    Unindexed,
    Delta {
        affected: TextRange,
        before: Fragment,
    },
    Splice(ChunkSpan),
}

/// State captured by [`MetricsEngine::notify_edit`] before the buffer changes
#[derive(Debug)]
#[must_use = "pass the pending edit to finish_edit once the buffer has changed"]
pub struct PendingEdit {
    range: TextRange,
    kind: PendingKind,
}

pub struct MetricsEngine {
    settings: MetricsSettings,
    backend: Backend,
    /// Char length of every cached chunk, in buffer order (chunked mode)
    chunk_lens: Vec<usize>,
    indexed: bool,
    /// Latest submitted revision
    revision: u64,
    published_revision: u64,
    published: Metrics,
    in_flight_since: Option<Instant>,
    busy_reported: bool,
    subscribers: Vec<Sender<MetricsEvent>>,
}

impl std::fmt::Debug for MetricsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsEngine")
            .field("settings", &self.settings)
            .field("chunks", &self.chunk_lens.len())
            .field("revision", &self.revision)
            .field("published_revision", &self.published_revision)
            .field("published", &self.published)
            .finish()
    }
}

impl MetricsEngine {
    pub fn new(settings: MetricsSettings) -> Self {
        let backend = if settings.asynchronous {
            match Backend::spawn() {
                Ok(backend) => backend,
                Err(e) => {
                    tracing::warn!("Failed to spawn metrics worker, computing inline: {}", e);
                    Backend::Inline(MetricsState::default())
                }
            }
        } else {
            Backend::Inline(MetricsState::default())
        };
        Self::with_backend(settings, backend)
    }

    fn with_backend(settings: MetricsSettings, backend: Backend) -> Self {
        Self {
            settings,
            backend,
            chunk_lens: Vec::new(),
            indexed: false,
            revision: 0,
            published_revision: 0,
            published: Metrics::ZERO.with_trailing_line(),
            in_flight_since: None,
            busy_reported: false,
            subscribers: Vec::new(),
        }
    }

    pub fn settings(&self) -> &MetricsSettings {
        &self.settings
    }

    /// True if jobs go to a background worker
    pub fn is_asynchronous(&self) -> bool {
        matches!(self.backend, Backend::Worker { .. })
    }

    /// Last published document totals
    pub fn metrics(&self) -> Metrics {
        self.published
    }

    /// True while a submitted job has not been published yet
    pub fn is_recomputing(&self) -> bool {
        self.published_revision < self.revision
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Number of cached chunks (chunked mode)
    pub fn chunk_count(&self) -> usize {
        self.chunk_lens.len()
    }

    pub fn subscribe(&mut self) -> Receiver<MetricsEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Index the buffer if that has not happened yet
    pub fn ensure_indexed<B: EditBuffer + ?Sized>(&mut self, buffer: &B) {
        if !self.indexed {
            self.reindex(buffer);
        }
    }

    /// Full rescan of `buffer`, replacing every cached chunk
    pub fn reindex<B: EditBuffer + ?Sized>(&mut self, buffer: &B) {
        let text = buffer.slice(TextRange::new(0, buffer.len_chars()));
        let chunks = split_fragments(&text, None, self.settings.chunk_size);
        self.chunk_lens = match self.settings.mode {
            MetricsMode::Chunked => chunks.iter().map(|c| c.len_chars).collect(),
            MetricsMode::Delta => Vec::new(),
        };
        self.indexed = true;

        tracing::debug!(
            "Re-indexing metrics: {} chars in {} chunks",
            buffer.len_chars(),
            chunks.len()
        );

        let revision = self.next_revision();
        self.submit(buffer, Job::Reindex { revision, chunks });
    }

    /// Capture what the edit of `range` is about to replace.
    ///
    /// Must be called before the buffer changes; hand the result to
    /// [`Self::finish_edit`] afterwards.
    pub fn notify_edit<B: EditBuffer + ?Sized>(&self, buffer: &B, range: TextRange) -> PendingEdit {
        let len = buffer.len_chars();
        let range = range.clamp(len);

        let kind = if !self.indexed {
            PendingKind::Unindexed
        } else {
            let affected = range.expand(1, len);
            match self.settings.mode {
                MetricsMode::Delta => PendingKind::Delta {
                    affected,
                    before: Fragment {
                        text: buffer.slice(affected),
                        preceding: preceding_char(buffer, affected.location),
                        len_chars: affected.length,
                    },
                },
                MetricsMode::Chunked => PendingKind::Splice(self.chunk_span(affected)),
            }
        };

        PendingEdit { range, kind }
    }

    /// Account for a completed edit. `inserted` is the range the new text
    /// occupies, as returned by the buffer's `replace`.
    pub fn finish_edit<B: EditBuffer + ?Sized>(
        &mut self,
        buffer: &B,
        pending: PendingEdit,
        inserted: TextRange,
    ) {
        let PendingEdit { range, kind } = pending;

        match kind {
            PendingKind::Unindexed => self.reindex(buffer),
            PendingKind::Delta { affected, before } => {
                let after_range =
                    TextRange::new(affected.location, affected.length - range.length + inserted.length);
                let after = Fragment {
                    text: buffer.slice(after_range),
                    preceding: before.preceding,
                    len_chars: after_range.length,
                };
                let revision = self.next_revision();
                self.submit(buffer, Job::Delta {
                    revision,
                    before,
                    after,
                });
            }
            PendingKind::Splice(span) => {
                let new_len = span.len_chars - range.length + inserted.length;
                let text = buffer.slice(TextRange::new(span.start, new_len));
                let chunks = split_fragments(
                    &text,
                    preceding_char(buffer, span.start),
                    self.settings.chunk_size,
                );
                let end = (span.first + span.removed).min(self.chunk_lens.len());
                self.chunk_lens
                    .splice(span.first..end, chunks.iter().map(|c| c.len_chars));

                let revision = self.next_revision();
                self.submit(buffer, Job::Splice {
                    revision,
                    first: span.first,
                    removed: span.removed,
                    chunks,
                });

                if self.is_fragmented(buffer.len_chars()) {
                    tracing::debug!("Chunk cache fragmented ({} chunks), re-indexing", self.chunk_lens.len());
                    self.reindex(buffer);
                }
            }
        }
    }

    /// Publish finished results; see [`Self::poll_at`]
    pub fn poll(&mut self) -> Option<Metrics> {
        self.poll_at(Instant::now())
    }

    /// Drain finished results and update the busy indicator as of `now`.
    ///
    /// Returns the newly published totals, if any.
    pub fn poll_at(&mut self, now: Instant) -> Option<Metrics> {
        let received: Vec<JobResult> = match &self.backend {
            Backend::Worker { results, .. } => results.try_iter().collect(),
            Backend::Inline(_) => Vec::new(),
        };

        let mut published = None;
        for result in received {
            if let Some(total) = self.accept(result) {
                published = Some(total);
            }
        }

        self.update_busy(now);
        published
    }

    /// Block until the latest submitted revision is published or `timeout`
    /// elapses. Returns true if caught up.
    pub fn flush(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            self.poll();
            if !self.is_recomputing() {
                return true;
            }

            let Backend::Worker { results, .. } = &self.backend else {
                return true;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            match results.recv_timeout(remaining) {
                Ok(result) => {
                    self.accept(result);
                }
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Metrics worker disconnected before catching up");
                    return false;
                }
            }
        }
    }

    /// Compare the published totals with a full rescan, re-indexing on drift.
    ///
    /// Skipped while a job is in flight. Returns false if drift was found.
    pub fn consistency_check<B: EditBuffer + ?Sized>(&mut self, buffer: &B) -> bool {
        if !self.indexed || self.is_recomputing() {
            return true;
        }

        let expected = Metrics::compute(&buffer.slice(TextRange::new(0, buffer.len_chars())));
        if expected == self.published {
            return true;
        }

        tracing::warn!(
            "Metrics drift detected at revision {}: published {:?}, rescan {:?}",
            self.revision,
            self.published,
            expected
        );
        self.reindex(buffer);
        false
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Hand `job` to the backend. `buffer` is the post-edit text, used to
    /// re-index if the worker turns out to be gone.
    fn submit<B: EditBuffer + ?Sized>(&mut self, buffer: &B, job: Job) {
        let revision = job.revision();
        match &mut self.backend {
            Backend::Inline(state) => {
                let total = state.apply(job);
                self.accept(JobResult { revision, total });
            }
            Backend::Worker { jobs: Some(tx), .. } => match tx.send(job) {
                Ok(()) => {
                    if self.in_flight_since.is_none() {
                        self.in_flight_since = Some(Instant::now());
                    }
                }
                Err(mpsc::SendError(job)) => {
                    tracing::warn!("Metrics worker is gone, computing inline");
                    self.fall_back_inline(buffer, job);
                }
            },
            Backend::Worker { jobs: None, .. } => self.fall_back_inline(buffer, job),
        }
    }

    /// Replace a dead worker with inline computation. The worker's state is
    /// lost, so anything but a re-index is replaced by one over `buffer`.
    fn fall_back_inline<B: EditBuffer + ?Sized>(&mut self, buffer: &B, job: Job) {
        self.backend = Backend::Inline(MetricsState::default());
        self.in_flight_since = None;
        if job.is_reindex() {
            self.submit(buffer, job);
        } else {
            self.reindex(buffer);
        }
    }

    /// Publish `result` if it is for the latest revision
    fn accept(&mut self, result: JobResult) -> Option<Metrics> {
        if result.revision != self.revision || result.revision <= self.published_revision {
            tracing::debug!(
                "Discarding stale metrics: revision {} != latest {}",
                result.revision,
                self.revision
            );
            return None;
        }

        self.published_revision = result.revision;
        self.published = result.total;
        tracing::debug!("Published metrics for revision {}: {:?}", result.revision, result.total);
        self.emit(MetricsEvent::Changed(result.total));
        Some(result.total)
    }

    fn update_busy(&mut self, now: Instant) {
        if !self.is_recomputing() {
            self.in_flight_since = None;
            if self.busy_reported {
                self.busy_reported = false;
                self.emit(MetricsEvent::Recomputing(false));
            }
            return;
        }

        if let Some(since) = self.in_flight_since {
            if !self.busy_reported && now.saturating_duration_since(since) >= self.settings.recompute_grace {
                self.busy_reported = true;
                self.emit(MetricsEvent::Recomputing(true));
            }
        }
    }

    fn emit(&mut self, event: MetricsEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// Locate the chunks overlapping `affected`
    fn chunk_span(&self, affected: TextRange) -> ChunkSpan {
        let last_char = affected.end().saturating_sub(1).max(affected.location);
        let mut first = None;
        let mut start = 0;

        for (i, &len) in self.chunk_lens.iter().enumerate() {
            let end = start + len;
            if first.is_none() && affected.location < end {
                first = Some((i, start));
            }
            if let Some((first_idx, span_start)) = first {
                if last_char < end {
                    return ChunkSpan {
                        first: first_idx,
                        removed: i - first_idx + 1,
                        start: span_start,
                        len_chars: end - span_start,
                    };
                }
            }
            start = end;
        }

        match first {
            Some((first_idx, span_start)) => ChunkSpan {
                first: first_idx,
                removed: self.chunk_lens.len() - first_idx,
                start: span_start,
                len_chars: start - span_start,
            },
            // Empty buffer: nothing cached, append at the end
            None => ChunkSpan {
                first: self.chunk_lens.len(),
                removed: 0,
                start,
                len_chars: 0,
            },
        }
    }

    fn is_fragmented(&self, len_chars: usize) -> bool {
        let ideal = len_chars / self.settings.chunk_size.max(1) + 1;
        self.chunk_lens.len() > ideal * 2 + 8
    }
}

fn preceding_char<B: EditBuffer + ?Sized>(buffer: &B, offset: usize) -> Option<char> {
    offset.checked_sub(1).and_then(|prev| buffer.char_at(prev))
}

impl Drop for MetricsEngine {
    fn drop(&mut self) {
        if let Backend::Worker { jobs, handle, .. } = &mut self.backend {
            // Closing the job channel ends the worker loop
            jobs.take();
            if let Some(handle) = handle.take() {
                if handle.join().is_err() {
                    tracing::warn!("Metrics worker panicked");
                }
            }
        }
    }
}
