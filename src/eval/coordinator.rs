//! Fan scoring out over a worker pool and stream error records to one writer.
//!
//! - W blocking workers pull task indices from a shared atomic cursor; each
//!   builds its [`WorkerContext`] once through the context factory.
//! - Workers report `(index, outcome)` to the coordinating task, the only
//!   owner of the outcomes table.
//! - Misses go through a bounded channel to a single writer that owns the
//!   output and flushes after every line. The writer stops when the last
//!   worker drops its sender.
//! - A worker whose context cannot be built aborts the whole batch.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::matcher::MatchMode;
use super::scorer::{score_task, WorkerContext};
use super::types::{ErrorCase, MatchResult, Outcome, RankedResult};
use crate::error::{QacurateError, Result};
use crate::jsonl;

/// Builds a worker's context; called once per worker with its id.
pub type ContextFactory = Arc<dyn Fn(usize) -> Result<WorkerContext> + Send + Sync>;

/// Batch settings.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub num_workers: usize,
    pub mode: MatchMode,
    /// Bound of the error-record channel.
    pub channel_capacity: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            num_workers: crate::config::default_workers(),
            mode: MatchMode::default(),
            channel_capacity: 1024,
        }
    }
}

/// Everything known once a batch has finished.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// `outcomes[i]` belongs to input task `i`.
    pub outcomes: Vec<Outcome>,
    pub misses: usize,
    pub failures: usize,
    /// Error records written by the writer.
    pub records_written: usize,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Misses as a percentage of all questions; 0 for an empty batch.
    pub fn miss_percentage(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.misses as f64 / self.outcomes.len() as f64 * 100.0
    }
}

enum WorkerEvent {
    Scored(MatchResult),
    InitFailed { worker: usize, error: String },
}

/// Drain error records into `sink`, one flushed JSON line each.
fn write_records<W: Write>(mut sink: W, mut rx: mpsc::Receiver<ErrorCase>) -> Result<usize> {
    let mut written = 0;
    while let Some(record) = rx.blocking_recv() {
        sink.write_all(jsonl::to_line(&record)?.as_bytes())?;
        sink.flush()?;
        written += 1;
    }
    Ok(written)
}

struct WorkerShared {
    tasks: Arc<Vec<RankedResult>>,
    cursor: Arc<AtomicUsize>,
    abort: Arc<AtomicBool>,
    factory: ContextFactory,
    mode: MatchMode,
}

fn worker_loop(
    worker: usize,
    shared: WorkerShared,
    records: mpsc::Sender<ErrorCase>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut ctx = match (shared.factory)(worker) {
        Ok(ctx) => ctx,
        Err(e) => {
            // Abort before reporting.
            shared.abort.store(true, Ordering::Release);
            let _ = events.send(WorkerEvent::InitFailed {
                worker,
                error: e.to_string(),
            });
            return;
        }
    };

    loop {
        if shared.abort.load(Ordering::Acquire) {
            break;
        }
        let index = shared.cursor.fetch_add(1, Ordering::Relaxed);
        let Some(task) = shared.tasks.get(index) else {
            break;
        };

        let scored = score_task(&mut ctx, task, shared.mode);
        match &scored.outcome {
            Outcome::Miss => {
                let record = ErrorCase::new(
                    task.question.clone(),
                    task.answer.clone(),
                    scored.candidates,
                );
                if records.blocking_send(record).is_err() {
                    log::error!("worker {}: error-record writer has stopped", worker);
                    shared.abort.store(true, Ordering::Release);
                    break;
                }
            }
            Outcome::Failed(reason) => {
                log::warn!("question {} could not be scored: {}", index, reason);
            }
            Outcome::Hit => {}
        }

        let result = MatchResult {
            index,
            outcome: scored.outcome,
        };
        if events.send(WorkerEvent::Scored(result)).is_err() {
            break;
        }
    }
    log::debug!("worker {} finished", worker);
}

/// Score every task and stream one JSON line per miss into `sink`.
///
/// `on_progress(completed, total)` is called after each task is accounted
/// for; `completed` only ever increases.
pub async fn run_batch<W, P>(
    tasks: Vec<RankedResult>,
    options: &BatchOptions,
    factory: ContextFactory,
    sink: W,
    mut on_progress: P,
) -> Result<BatchReport>
where
    W: Write + Send + 'static,
    P: FnMut(usize, usize),
{
    let start = Instant::now();
    let total = tasks.len();
    let workers = options.num_workers.max(1).min(total.max(1));

    let (record_tx, record_rx) = mpsc::channel::<ErrorCase>(options.channel_capacity.max(1));
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WorkerEvent>();
    let writer = tokio::task::spawn_blocking(move || write_records(sink, record_rx));

    let tasks = Arc::new(tasks);
    let cursor = Arc::new(AtomicUsize::new(0));
    let abort = Arc::new(AtomicBool::new(false));

    log::info!("Scoring {} questions with {} workers ({} match)", total, workers, options.mode);

    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
    for worker in 0..workers {
        let shared = WorkerShared {
            tasks: Arc::clone(&tasks),
            cursor: Arc::clone(&cursor),
            abort: Arc::clone(&abort),
            factory: Arc::clone(&factory),
            mode: options.mode,
        };
        let records = record_tx.clone();
        let events = event_tx.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            worker_loop(worker, shared, records, events)
        }));
    }
    // Workers hold the only senders now; both channels close when they exit.
    drop(record_tx);
    drop(event_tx);

    let mut outcomes: Vec<Option<Outcome>> = vec![None; total];
    let mut completed = 0;
    let mut fatal: Option<QacurateError> = None;

    while let Some(event) = event_rx.recv().await {
        match event {
            WorkerEvent::Scored(result) => {
                let Some(slot) = outcomes.get_mut(result.index) else {
                    fatal = Some(QacurateError::Batch(format!("result for unknown index {}", result.index)));
                    break;
                };
                if slot.replace(result.outcome).is_some() {
                    fatal = Some(QacurateError::Batch(format!("index {} reported twice", result.index)));
                    break;
                }
                completed += 1;
                on_progress(completed, total);
            }
            WorkerEvent::InitFailed { worker, error } => {
                log::error!("worker {} failed to initialize: {}", worker, error);
                fatal = Some(QacurateError::WorkerInit(format!("worker {}: {}", worker, error)));
                break;
            }
        }
    }

    if fatal.is_some() {
        abort.store(true, Ordering::Release);
    }
    drop(event_rx);

    for handle in handles {
        handle
            .await
            .map_err(|e| QacurateError::Batch(format!("worker task join: {}", e)))?;
    }
    let records_written = writer
        .await
        .map_err(|e| QacurateError::Batch(format!("writer task join: {}", e)))??;

    if let Some(err) = fatal {
        return Err(err);
    }

    let outcomes: Vec<Outcome> = outcomes
        .into_iter()
        .enumerate()
        .map(|(i, o)| o.ok_or_else(|| QacurateError::Batch(format!("no result for index {}", i))))
        .collect::<Result<_>>()?;

    let misses = outcomes.iter().filter(|o| o.is_miss()).count();
    let failures = outcomes.iter().filter(|o| o.is_failed()).count();

    Ok(BatchReport {
        outcomes,
        misses,
        failures,
        records_written,
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryDocStore};
    use crate::text::SimpleTokenizer;
    use std::sync::Mutex;

    /// Sink shared with the test body.
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedSink {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(String::from)
                .collect()
        }
    }

    fn factory(store: MemoryDocStore) -> ContextFactory {
        Arc::new(move |_| {
            Ok(WorkerContext::new(
                Box::new(store.clone()),
                Box::new(SimpleTokenizer::new()?),
                16,
            ))
        })
    }

    fn task(answer: &str, candidates: &[&str]) -> RankedResult {
        RankedResult {
            question: format!("question about {}", answer),
            answer: vec![answer.to_string()],
            candidates: candidates
                .iter()
                .enumerate()
                .map(|(i, d)| (d.to_string(), 10.0 - i as f64))
                .collect(),
        }
    }

    fn options(num_workers: usize) -> BatchOptions {
        BatchOptions {
            num_workers,
            mode: MatchMode::String,
            channel_capacity: 4,
        }
    }

    #[tokio::test]
    async fn test_outcomes_follow_input_order() {
        let store = MemoryDocStore::new([("yes", "alpha beta gamma"), ("no", "delta")]);
        let tasks: Vec<_> = (0..40)
            .map(|i| if i % 3 == 0 { task("beta", &["no", "yes"]) } else { task("omega", &["no"]) })
            .collect();

        let sink = SharedSink::default();
        let report = run_batch(tasks, &options(4), factory(store), sink.clone(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.total(), 40);
        for (i, outcome) in report.outcomes.iter().enumerate() {
            let expected = if i % 3 == 0 { Outcome::Hit } else { Outcome::Miss };
            assert_eq!(outcome, &expected, "index {}", i);
        }
        assert_eq!(report.misses, 26);
        assert_eq!(report.records_written, 26);
        assert_eq!(sink.lines().len(), 26);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_complete() {
        let store = MemoryDocStore::new([("d", "text")]);
        let tasks: Vec<_> = (0..10).map(|_| task("text", &["d"])).collect();
        let mut seen = Vec::new();

        run_batch(tasks, &options(3), factory(store), SharedSink::default(), |done, total| {
            assert_eq!(total, 10);
            seen.push(done);
        })
        .await
        .unwrap();

        assert_eq!(seen, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_reported_per_index() {
        let store = MemoryDocStore::new([("d", "Paris")]);
        let tasks = vec![task("Paris", &["d"]), task("Paris", &["missing"]), task("Lyon", &["d"])];

        let sink = SharedSink::default();
        let report = run_batch(tasks, &options(2), factory(store), sink.clone(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.outcomes[0], Outcome::Hit);
        assert!(report.outcomes[1].is_failed());
        assert_eq!(report.outcomes[2], Outcome::Miss);
        assert_eq!(report.failures, 1);
        assert_eq!(report.misses, 1);
        assert_eq!(sink.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_worker_init_failure_aborts_batch() {
        let failing: ContextFactory = Arc::new(|worker| {
            Err(QacurateError::WorkerInit(format!("cannot open store for {}", worker)))
        });
        let tasks = vec![task("a", &["d"]), task("b", &["d"])];

        let err = run_batch(tasks, &options(2), failing, SharedSink::default(), |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, QacurateError::WorkerInit(_)));
    }

    /// Store that takes a little while per lookup.
    #[derive(Clone)]
    struct SlowStore(MemoryDocStore);

    impl DocumentStore for SlowStore {
        fn get_doc_text(&self, doc_id: &str) -> Result<String> {
            std::thread::sleep(Duration::from_millis(2));
            self.0.get_doc_text(doc_id)
        }
    }

    #[tokio::test]
    async fn test_late_init_failure_stops_healthy_workers() {
        let store = SlowStore(MemoryDocStore::new([("d", "nothing relevant")]));
        let late_failure: ContextFactory = Arc::new(move |worker| {
            if worker == 1 {
                std::thread::sleep(Duration::from_millis(50));
                return Err(QacurateError::WorkerInit("store unavailable".to_string()));
            }
            Ok(WorkerContext::new(
                Box::new(store.clone()),
                Box::new(SimpleTokenizer::new()?),
                16,
            ))
        });
        let tasks: Vec<_> = (0..1000).map(|_| task("Paris", &["d"])).collect();

        let sink = SharedSink::default();
        let err = run_batch(tasks, &options(2), late_failure, sink.clone(), |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, QacurateError::WorkerInit(_)));
        let written = sink.lines().len();
        assert!(written < 1000, "healthy worker kept going: {} records", written);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = run_batch(
            Vec::new(),
            &options(4),
            factory(MemoryDocStore::default()),
            SharedSink::default(),
            |_, _| {},
        )
        .await
        .unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(report.miss_percentage(), 0.0);
    }

    #[tokio::test]
    async fn test_writer_failure_surfaces() {
        struct BrokenSink;
        impl Write for BrokenSink {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let store = MemoryDocStore::new([("d", "nothing here")]);
        let tasks: Vec<_> = (0..20).map(|_| task("Paris", &["d"])).collect();
        let err = run_batch(tasks, &options(2), factory(store), BrokenSink, |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, QacurateError::Io(_)), "got {:?}", err);
    }
}
