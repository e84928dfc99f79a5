use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::error::{JobError, Result};
use crate::event::{EventSink, JobEvent};

/// Worker count matching the expected interactive load
pub const DEFAULT_WORKERS: usize = 2;

type JobBody<R> = Box<dyn FnOnce(&ProgressHandle<R>) -> std::result::Result<R, String> + Send>;

struct QueuedJob<R> {
    id: String,
    body: JobBody<R>,
}

struct Shared<R> {
    registry: Mutex<HashSet<String>>,
    sink: Arc<dyn EventSink<R>>,
}

/// Recover the guard even if a sink panicked while holding the lock
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Progress reporter handed to a running job body.
///
/// Ratios are clamped to `[0, 1]` and must be non-decreasing; stale or
/// repeated values are dropped, as are reports for jobs no longer tracked.
pub struct ProgressHandle<R> {
    job_id: String,
    shared: Arc<Shared<R>>,
    last: Mutex<f32>,
}

impl<R> ProgressHandle<R> {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn report(&self, ratio: f32) {
        let ratio = ratio.clamp(0.0, 1.0);
        let mut last = lock(&self.last);
        if ratio <= *last {
            return;
        }
        // Emit under the registry lock: cancellation removes the id and
        // emits the terminal event under the same lock, so no progress
        // event can slip out after the terminal one
        let registry = lock(&self.shared.registry);
        if !registry.contains(&self.job_id) {
            // Cancelled mid-run; the terminal event is already out
            return;
        }
        *last = ratio;
        self.shared.sink.emit(JobEvent::Progress {
            job_id: self.job_id.clone(),
            ratio,
        });
    }
}

/// Fixed pool of worker threads draining a FIFO job queue.
///
/// Jobs are identified by caller-chosen string ids; an id is tracked from
/// `submit` until its terminal event, and may be reused afterwards.
pub struct JobEngine<R: Send + 'static> {
    shared: Arc<Shared<R>>,
    queue: Option<Sender<QueuedJob<R>>>,
    workers: Vec<JoinHandle<()>>,
}

impl<R: Send + 'static> JobEngine<R> {
    pub fn new(workers: usize, sink: Arc<dyn EventSink<R>>) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<QueuedJob<R>>();
        let receiver = Arc::new(Mutex::new(receiver));
        let shared = Arc::new(Shared {
            registry: Mutex::new(HashSet::new()),
            sink,
        });

        let handles = (0..workers)
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("job-worker-{index}"))
                    .spawn(move || worker_loop(receiver, shared))
            })
            .collect::<std::io::Result<Vec<_>>>()
            .unwrap_or_default();
        if handles.is_empty() {
            warn!("no worker threads could be spawned; jobs will queue forever");
        }

        Self {
            shared,
            queue: Some(sender),
            workers: handles,
        }
    }

    pub fn with_default_workers(sink: Arc<dyn EventSink<R>>) -> Self {
        Self::new(DEFAULT_WORKERS, sink)
    }

    /// Enqueue a job under a unique id.
    ///
    /// Rejects ids that are already tracked (queued or running); ids become
    /// available again once their terminal event has been emitted.
    pub fn submit<F>(&self, job_id: impl Into<String>, body: F) -> Result<()>
    where
        F: FnOnce(&ProgressHandle<R>) -> std::result::Result<R, String> + Send + 'static,
    {
        let job_id = job_id.into();
        {
            let mut registry = lock(&self.shared.registry);
            if registry.contains(&job_id) {
                return Err(JobError::DuplicateJobId(job_id));
            }
            registry.insert(job_id.clone());
        }

        let sender = self.queue.as_ref().ok_or(JobError::Shutdown)?;
        let queued = QueuedJob {
            id: job_id.clone(),
            body: Box::new(body),
        };
        if sender.send(queued).is_err() {
            lock(&self.shared.registry).remove(&job_id);
            return Err(JobError::Shutdown);
        }
        debug!(job_id, "job queued");
        Ok(())
    }

    /// Best-effort cancellation.
    ///
    /// Untracks the job and emits its terminal `Failed` event; a body that is
    /// already running keeps running, but its outcome is discarded. Returns
    /// whether the id was tracked.
    pub fn cancel(&self, job_id: &str) -> bool {
        // Remove and emit under one lock so workers checking membership
        // can never emit for this id once the terminal event is out
        let mut registry = lock(&self.shared.registry);
        let removed = registry.remove(job_id);
        if removed {
            debug!(job_id, "job cancelled");
            self.shared.sink.emit(JobEvent::Failed {
                job_id: job_id.to_string(),
                message: "cancelled".to_string(),
            });
        }
        removed
    }

    /// Whether an id is currently tracked (queued or running)
    pub fn is_tracked(&self, job_id: &str) -> bool {
        lock(&self.shared.registry).contains(job_id)
    }

    pub fn tracked_count(&self) -> usize {
        lock(&self.shared.registry).len()
    }
}

impl<R: Send + 'static> Drop for JobEngine<R> {
    fn drop(&mut self) {
        // Closing the queue lets idle workers observe the hangup
        self.queue.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop<R: Send + 'static>(
    receiver: Arc<Mutex<Receiver<QueuedJob<R>>>>,
    shared: Arc<Shared<R>>,
) {
    loop {
        let job = {
            let guard = lock(&receiver);
            guard.recv()
        };
        let Ok(job) = job else {
            break;
        };

        // Cancelled while still queued; the Failed event is already out.
        // The Started emit stays under the lock so a concurrent cancel
        // cannot slot its terminal event before it.
        {
            let registry = lock(&shared.registry);
            if !registry.contains(&job.id) {
                continue;
            }
            shared.sink.emit(JobEvent::Started {
                job_id: job.id.clone(),
            });
        }

        let progress = ProgressHandle {
            job_id: job.id.clone(),
            shared: Arc::clone(&shared),
            last: Mutex::new(0.0),
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| (job.body)(&progress)));

        // Terminal event goes out only if the job wasn't cancelled mid-run
        let still_tracked = lock(&shared.registry).remove(&job.id);
        if !still_tracked {
            continue;
        }
        match outcome {
            Ok(Ok(result)) => shared.sink.emit(JobEvent::Completed {
                job_id: job.id,
                result,
            }),
            Ok(Err(message)) => shared.sink.emit(JobEvent::Failed {
                job_id: job.id,
                message,
            }),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                shared.sink.emit(JobEvent::Failed {
                    job_id: job.id,
                    message: format!("job panicked: {message}"),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChannelSink;
    use std::sync::mpsc::RecvTimeoutError;
    use std::time::Duration;

    type Events = mpsc::Receiver<JobEvent<u32>>;

    fn engine(workers: usize) -> (JobEngine<u32>, Events) {
        let (tx, rx) = mpsc::channel();
        (JobEngine::new(workers, Arc::new(ChannelSink::new(tx))), rx)
    }

    fn wait_terminal(events: &Events, job_id: &str) -> JobEvent<u32> {
        loop {
            match events.recv_timeout(Duration::from_secs(5)) {
                Ok(event) if event.job_id() == job_id && event.is_terminal() => return event,
                Ok(_) => continue,
                Err(err) => panic!("no terminal event for {job_id}: {err}"),
            }
        }
    }

    #[test]
    fn test_lifecycle_ordering() {
        let (engine, events) = engine(1);
        engine
            .submit("j1", |progress| {
                progress.report(0.5);
                Ok(7)
            })
            .expect("Should submit");

        let mut seen = Vec::new();
        loop {
            let event = events
                .recv_timeout(Duration::from_secs(5))
                .expect("Should receive event");
            let terminal = event.is_terminal();
            seen.push(event);
            if terminal {
                break;
            }
        }
        assert!(matches!(seen[0], JobEvent::Started { .. }));
        assert!(matches!(seen[1], JobEvent::Progress { ratio, .. } if ratio == 0.5));
        assert!(matches!(seen[2], JobEvent::Completed { result: 7, .. }));
    }

    #[test]
    fn test_duplicate_id_rejected_while_in_flight() {
        let (engine, events) = engine(1);
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate_rx = Mutex::new(gate_rx);
        engine
            .submit("busy", move |_| {
                let _ = lock(&gate_rx).recv();
                Ok(1)
            })
            .expect("Should submit");

        let err = engine.submit("busy", |_| Ok(2)).expect_err("Should reject");
        assert_eq!(err, JobError::DuplicateJobId("busy".to_string()));

        gate_tx.send(()).expect("Should unblock");
        wait_terminal(&events, "busy");
    }

    #[test]
    fn test_id_reusable_after_terminal() {
        let (engine, events) = engine(1);
        engine.submit("again", |_| Ok(1)).expect("Should submit");
        wait_terminal(&events, "again");
        engine.submit("again", |_| Ok(2)).expect("Should resubmit");
        let event = wait_terminal(&events, "again");
        assert!(matches!(event, JobEvent::Completed { result: 2, .. }));
    }

    #[test]
    fn test_failing_body_emits_failed() {
        let (engine, events) = engine(1);
        engine
            .submit("bad", |_| Err("transform exploded".to_string()))
            .expect("Should submit");
        let event = wait_terminal(&events, "bad");
        assert!(matches!(
            event,
            JobEvent::Failed { message, .. } if message == "transform exploded"
        ));
    }

    #[test]
    fn test_panicking_body_emits_failed() {
        let (engine, events) = engine(1);
        engine
            .submit("boom", |_| -> std::result::Result<u32, String> {
                panic!("tile index out of range")
            })
            .expect("Should submit");
        let event = wait_terminal(&events, "boom");
        assert!(matches!(
            event,
            JobEvent::Failed { message, .. } if message.contains("tile index out of range")
        ));
    }

    #[test]
    fn test_cancel_queued_job_never_starts() {
        let (engine, events) = engine(1);
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate_rx = Mutex::new(gate_rx);
        engine
            .submit("blocker", move |_| {
                let _ = lock(&gate_rx).recv();
                Ok(1)
            })
            .expect("Should submit");
        engine.submit("victim", |_| Ok(2)).expect("Should submit");

        assert!(engine.cancel("victim"));
        gate_tx.send(()).expect("Should unblock");

        let mut victim_events = Vec::new();
        // Drain until the blocker finishes; the engine is then quiescent
        loop {
            match events.recv_timeout(Duration::from_secs(5)) {
                Ok(event) => {
                    let done = event.job_id() == "blocker" && event.is_terminal();
                    if event.job_id() == "victim" {
                        victim_events.push(event);
                    }
                    if done {
                        break;
                    }
                }
                Err(err) => panic!("event stream ended early: {err}"),
            }
        }
        assert_eq!(victim_events.len(), 1);
        assert!(matches!(
            &victim_events[0],
            JobEvent::Failed { message, .. } if message == "cancelled"
        ));
    }

    #[test]
    fn test_no_events_after_cancelled_job_terminal() {
        let (engine, events) = engine(1);
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate_rx = Mutex::new(gate_rx);
        engine
            .submit("spin", move |progress| {
                let _ = lock(&gate_rx).recv();
                for step in 1..=100 {
                    progress.report(step as f32 / 100.0);
                }
                Ok(1)
            })
            .expect("Should submit");

        // Running (Started is out) but blocked on the gate
        let started = events
            .recv_timeout(Duration::from_secs(5))
            .expect("Should start");
        assert!(matches!(started, JobEvent::Started { .. }));

        assert!(engine.cancel("spin"));
        gate_tx.send(()).expect("Should unblock");
        // Joins the worker, so every report the body made has happened
        drop(engine);

        let terminal = events
            .recv_timeout(Duration::from_secs(5))
            .expect("Should receive terminal event");
        assert!(matches!(
            terminal,
            JobEvent::Failed { message, .. } if message == "cancelled"
        ));
        assert!(
            events.try_recv().is_err(),
            "no events may follow the terminal event"
        );
    }

    #[test]
    fn test_cancel_unknown_id_is_noop() {
        let (engine, events) = engine(1);
        assert!(!engine.cancel("ghost"));
        assert!(matches!(
            events.recv_timeout(Duration::from_millis(100)),
            Err(RecvTimeoutError::Timeout)
        ));
    }

    #[test]
    fn test_progress_is_clamped_and_monotonic() {
        let (engine, events) = engine(1);
        engine
            .submit("steps", |progress| {
                progress.report(0.3);
                progress.report(0.2);
                progress.report(0.3);
                progress.report(1.5);
                Ok(0)
            })
            .expect("Should submit");

        let mut ratios = Vec::new();
        loop {
            let event = events
                .recv_timeout(Duration::from_secs(5))
                .expect("Should receive event");
            if let JobEvent::Progress { ratio, .. } = event {
                ratios.push(ratio);
            } else if event.is_terminal() {
                break;
            }
        }
        assert_eq!(ratios, vec![0.3, 1.0]);
    }

    #[test]
    fn test_parallel_workers_run_concurrently() {
        let (engine, events) = engine(2);
        let (a_tx, a_rx) = mpsc::channel::<()>();
        let a_rx = Mutex::new(a_rx);
        engine
            .submit("a", move |_| {
                let _ = lock(&a_rx).recv();
                Ok(1)
            })
            .expect("Should submit");
        // With two workers, "b" completes while "a" is still blocked
        engine.submit("b", |_| Ok(2)).expect("Should submit");
        let event = wait_terminal(&events, "b");
        assert!(matches!(event, JobEvent::Completed { result: 2, .. }));
        assert!(engine.is_tracked("a"));

        a_tx.send(()).expect("Should unblock");
        wait_terminal(&events, "a");
        assert_eq!(engine.tracked_count(), 0);
    }
}
