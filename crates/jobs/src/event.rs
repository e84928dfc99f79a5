use std::sync::mpsc;

/// Lifecycle event for one job.
///
/// Every submitted job that starts running emits exactly one `Started` and
/// exactly one terminal event (`Completed` or `Failed`). Jobs cancelled
/// while still queued emit only the terminal `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent<R> {
    Started { job_id: String },
    Progress { job_id: String, ratio: f32 },
    Completed { job_id: String, result: R },
    Failed { job_id: String, message: String },
}

impl<R> JobEvent<R> {
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::Started { job_id }
            | JobEvent::Progress { job_id, .. }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Failed { job_id, .. } => job_id,
        }
    }

    /// Whether this event ends the job's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Completed { .. } | JobEvent::Failed { .. })
    }
}

/// Observer for job lifecycle events.
///
/// Sinks are invoked from worker threads, sometimes while engine locks are
/// held, and must neither block nor call back into the engine.
pub trait EventSink<R>: Send + Sync {
    fn emit(&self, event: JobEvent<R>);
}

/// Sink that forwards events into an `mpsc` channel, dropping them once the
/// receiving side hangs up
pub struct ChannelSink<R> {
    sender: mpsc::Sender<JobEvent<R>>,
}

impl<R> ChannelSink<R> {
    pub fn new(sender: mpsc::Sender<JobEvent<R>>) -> Self {
        Self { sender }
    }
}

impl<R: Send> EventSink<R> for ChannelSink<R> {
    fn emit(&self, event: JobEvent<R>) {
        let _ = self.sender.send(event);
    }
}
