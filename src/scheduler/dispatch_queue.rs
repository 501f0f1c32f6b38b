use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  sync::{
    mpsc::{self, Receiver, RecvTimeoutError, Sender},
    Arc,
  },
  thread::{self, ThreadId},
  time::{Duration, Instant},
};

use once_cell::sync::Lazy;

use super::SchedulerError;

type Job = Box<dyn FnOnce() + Send>;

enum Command {
  Run(Job),
  RunAt(Instant, Job),
}

/// Settings for the worker thread of a [`SerialDispatchQueue`].
#[derive(Clone, Debug)]
pub struct QueueOptions {
  /// Name of the worker thread, also used in log records.
  pub label: String,
  /// Stack size of the worker thread; the platform default when `None`.
  pub stack_size: Option<usize>,
}

impl QueueOptions {
  pub fn new(label: impl Into<String>) -> Self { Self { label: label.into(), stack_size: None } }

  pub fn stack_size(mut self, size: usize) -> Self {
    self.stack_size = Some(size);
    self
  }
}

impl Default for QueueOptions {
  fn default() -> Self { Self::new("rxcore.serial") }
}

/// A FIFO queue of jobs executed one at a time by a dedicated worker thread.
///
/// Handles are cheap to clone. The worker exits once every handle is
/// dropped and no delayed job is left.
#[derive(Clone)]
pub struct SerialDispatchQueue {
  inner: Arc<QueueInner>,
}

struct QueueInner {
  label: String,
  worker: ThreadId,
  sender: Sender<Command>,
}

static MAIN_QUEUE: Lazy<SerialDispatchQueue> = Lazy::new(|| {
  SerialDispatchQueue::new("rxcore.main").expect("failed to start the main dispatch queue")
});

impl SerialDispatchQueue {
  /// Start a queue whose worker thread is named `label`.
  pub fn new(label: impl Into<String>) -> Result<Self, SchedulerError> {
    Self::with_options(QueueOptions::new(label))
  }

  pub fn with_options(options: QueueOptions) -> Result<Self, SchedulerError> {
    let QueueOptions { label, stack_size } = options;
    let (sender, receiver) = mpsc::channel();

    let mut builder = thread::Builder::new().name(label.clone());
    if let Some(size) = stack_size {
      builder = builder.stack_size(size);
    }
    let worker_label = label.clone();
    let handle = builder
      .spawn(move || run_worker(&worker_label, receiver))
      .map_err(|source| SchedulerError::Spawn { label: label.clone(), source })?;

    let worker = handle.thread().id();
    Ok(Self { inner: Arc::new(QueueInner { label, worker, sender }) })
  }

  /// The process-wide main queue, started on first use.
  ///
  /// # Panics
  ///
  /// Panics if the worker thread of the main queue cannot be spawned.
  pub fn main() -> Self { MAIN_QUEUE.clone() }

  pub fn label(&self) -> &str { &self.inner.label }

  /// Whether the calling thread is this queue's worker.
  pub fn is_current(&self) -> bool { thread::current().id() == self.inner.worker }

  /// Enqueue `job` behind everything already queued.
  pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) -> Result<(), SchedulerError> {
    self.send(Command::Run(Box::new(job)))
  }

  /// Run `job` on the worker once `delay` has elapsed.
  pub fn dispatch_after(
    &self, delay: Duration, job: impl FnOnce() + Send + 'static,
  ) -> Result<(), SchedulerError> {
    self.send(Command::RunAt(Instant::now() + delay, Box::new(job)))
  }

  fn send(&self, command: Command) -> Result<(), SchedulerError> {
    self
      .inner
      .sender
      .send(command)
      .map_err(|_| SchedulerError::QueueClosed(self.inner.label.clone()))
  }
}

impl std::fmt::Debug for SerialDispatchQueue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SerialDispatchQueue").field("label", &self.inner.label).finish()
  }
}

// ==================== Worker ====================

struct DelayedJob {
  due: Instant,
  seq: u64,
  job: Job,
}

impl PartialEq for DelayedJob {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for DelayedJob {}

impl PartialOrd for DelayedJob {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for DelayedJob {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earliest due first, then FIFO
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

fn pop_due(delayed: &mut BinaryHeap<DelayedJob>, now: Instant) -> Option<Job> {
  if delayed.peek()?.due <= now { delayed.pop().map(|d| d.job) } else { None }
}

fn run_worker(label: &str, receiver: Receiver<Command>) {
  tracing::debug!(queue = label, "dispatch queue started");
  let mut delayed = BinaryHeap::new();
  let mut seq = 0;
  let mut connected = true;

  loop {
    while let Some(job) = pop_due(&mut delayed, Instant::now()) {
      job();
    }

    let next_due = delayed.peek().map(|d: &DelayedJob| d.due);
    let command = match (connected, next_due) {
      (false, None) => break,
      (false, Some(due)) => {
        thread::sleep(due.saturating_duration_since(Instant::now()));
        continue;
      }
      (true, None) => match receiver.recv() {
        Ok(command) => command,
        Err(_) => {
          connected = false;
          continue;
        }
      },
      (true, Some(due)) => {
        match receiver.recv_timeout(due.saturating_duration_since(Instant::now())) {
          Ok(command) => command,
          Err(RecvTimeoutError::Timeout) => continue,
          Err(RecvTimeoutError::Disconnected) => {
            connected = false;
            continue;
          }
        }
      }
    };

    match command {
      Command::Run(job) => job(),
      Command::RunAt(due, job) => {
        delayed.push(DelayedJob { due, seq, job });
        seq += 1;
      }
    }
  }
  tracing::debug!(queue = label, "dispatch queue stopped");
}
