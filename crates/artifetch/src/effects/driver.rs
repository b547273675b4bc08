use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinSet;

use super::cancel::CancelToken;
use super::retry::{RetryError, with_retry};
use crate::data::DownloadParameters;
use crate::error::{Error, Result, TransferError};

/// One unit of work for the [`TransferDriver`].
#[async_trait]
pub trait TransferJob: Send + Sync + 'static {
    /// Item path reported in logs and errors.
    fn label(&self) -> &str;

    fn is_retryable(&self, error: &TransferError) -> bool;

    /// Perform one attempt, returning the number of bytes transferred.
    async fn run(&self, attempt: u32, cancel: &CancelToken) -> std::result::Result<u64, TransferError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverOptions {
    pub parallelism: usize,
    pub queue_capacity: usize,
    pub attempts: u32,
    pub backoff: Duration,
}

impl DriverOptions {
    pub fn from_params(params: &DownloadParameters) -> Self {
        Self {
            parallelism: params.parallelism,
            queue_capacity: params.queue_capacity,
            attempts: params.item_attempts(),
            backoff: params.retry_backoff(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub file_count: u64,
    pub total_bytes: u64,
}

#[derive(Default)]
struct Shared {
    halted: AtomicBool,
    first_error: Mutex<Option<Error>>,
    files: AtomicU64,
    bytes: AtomicU64,
}

impl Shared {
    fn halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    fn fail(&self, error: Error) {
        let mut slot = self.first_error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(error);
        }
        self.halted.store(true, Ordering::Release);
    }
}

/// Bounded worker pool executing transfer jobs.
///
/// Jobs are fed through a queue of `queue_capacity` slots to `parallelism`
/// workers. After the first job fails for good no new job is started; jobs
/// already running finish, then that failure is returned.
#[derive(Clone, Debug)]
pub struct TransferDriver {
    options: DriverOptions,
}

impl TransferDriver {
    pub fn new(options: DriverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DriverOptions { &self.options }

    pub async fn run<J: TransferJob>(&self, jobs: Vec<J>, cancel: &CancelToken) -> Result<DriverStats> {
        if jobs.is_empty() {
            return Ok(DriverStats::default());
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let (tx, rx) = mpsc::channel::<J>(self.options.queue_capacity.max(1));
        let rx = Arc::new(AsyncMutex::new(rx));
        let shared = Arc::new(Shared::default());

        let worker_count = self.options.parallelism.max(1).min(jobs.len());
        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            workers.spawn(worker(
                id,
                rx.clone(),
                shared.clone(),
                cancel.clone(),
                self.options.clone(),
            ));
        }
        drop(rx);

        for job in jobs {
            if shared.halted() {
                break;
            }
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = tx.send(job) => sent,
            };
            if sent.is_err() {
                break;
            }
        }
        drop(tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                shared.fail(Error::from(e));
            }
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let first_error = shared
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(error) = first_error {
            return Err(error);
        }
        Ok(DriverStats {
            file_count: shared.files.load(Ordering::Acquire),
            total_bytes: shared.bytes.load(Ordering::Acquire),
        })
    }
}

async fn worker<J: TransferJob>(
    id: usize,
    rx: Arc<AsyncMutex<mpsc::Receiver<J>>>,
    shared: Arc<Shared>,
    cancel: CancelToken,
    options: DriverOptions,
) {
    loop {
        if shared.halted() || cancel.is_cancelled() {
            break;
        }
        let job = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some(job) = job else { break };
        if shared.halted() {
            break;
        }

        let result = with_retry(
            options.attempts,
            options.backoff,
            &cancel,
            job.label(),
            |e| job.is_retryable(e),
            |attempt| job.run(attempt, &cancel),
        )
        .await;

        match result {
            Ok(bytes) => {
                shared.files.fetch_add(1, Ordering::AcqRel);
                shared.bytes.fetch_add(bytes, Ordering::AcqRel);
                tracing::debug!(worker = id, item = job.label(), bytes, "transferred");
            }
            Err(RetryError::Cancelled)
            | Err(RetryError::Failed {
                error: TransferError::Cancelled,
                ..
            }) => break,
            Err(RetryError::Failed { attempts, error }) => {
                tracing::error!(worker = id, item = job.label(), attempts, error = %error, "transfer failed");
                shared.fail(Error::TransferFailed {
                    path: job.label().to_string(),
                    attempts,
                    source: error,
                });
                break;
            }
        }
    }
}
