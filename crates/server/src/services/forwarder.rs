//! Callback forwarding queue.
//!
//! Webhook handlers must acknowledge Slack without waiting on callback
//! endpoints, so forwards are handed to a bounded queue and delivered by a
//! background [`ForwardWorker`]. Enqueueing never blocks: when the queue is
//! full the forward is dropped and logged.
//!
//! Deliveries are attempted once. A non-2xx status or transport error is
//! logged at `error` level (and reaches Sentry through the tracing layer).

use std::fmt;

use axum::body::Bytes;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use slack_relay_core::{CallbackUrl, TemplateId};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// What triggered a forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOrigin {
    /// A button click on an action-subscribed block.
    Interaction { block_id: String },
    /// A reply in the thread of a message from a thread-subscribed template.
    ThreadReply {
        template_id: TemplateId,
        thread_ts: String,
    },
}

impl fmt::Display for ForwardOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interaction { block_id } => write!(f, "interaction:{block_id}"),
            Self::ThreadReply {
                template_id,
                thread_ts,
            } => write!(f, "thread:{template_id}:{thread_ts}"),
        }
    }
}

/// One payload to deliver to one callback endpoint.
#[derive(Debug, Clone)]
pub struct ForwardJob {
    pub id: Uuid,
    pub callback_url: CallbackUrl,
    /// Sent unchanged as the request body.
    pub body: Bytes,
    pub origin: ForwardOrigin,
}

impl ForwardJob {
    #[must_use]
    pub fn new(callback_url: CallbackUrl, body: Bytes, origin: ForwardOrigin) -> Self {
        Self {
            id: Uuid::new_v4(),
            callback_url,
            body,
            origin,
        }
    }
}

/// Errors returned when a job cannot be queued.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The queue is at capacity.
    #[error("forward queue is full")]
    QueueFull,

    /// The worker has shut down.
    #[error("forward queue is closed")]
    QueueClosed,
}

/// Sending half of the forward queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ForwardQueue {
    tx: mpsc::Sender<ForwardJob>,
}

impl ForwardQueue {
    /// Create a queue holding up to `capacity` pending jobs, and its worker.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, ForwardWorker) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, ForwardWorker::new(rx))
    }

    /// Queue a job without waiting.
    ///
    /// # Errors
    ///
    /// Returns `ForwardError::QueueFull` if the queue is at capacity and
    /// `ForwardError::QueueClosed` if the worker is gone.
    pub fn enqueue(&self, job: ForwardJob) -> Result<Uuid, ForwardError> {
        let id = job.id;
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ForwardError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ForwardError::QueueClosed,
        })?;
        Ok(id)
    }
}

/// Receiving half of the forward queue.
///
/// Each job is delivered on its own task so one slow endpoint does not hold
/// up the rest.
pub struct ForwardWorker {
    rx: mpsc::Receiver<ForwardJob>,
    client: Client,
}

impl fmt::Debug for ForwardWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardWorker").finish_non_exhaustive()
    }
}

impl ForwardWorker {
    fn new(rx: mpsc::Receiver<ForwardJob>) -> Self {
        Self {
            rx,
            client: Client::new(),
        }
    }

    /// Deliver jobs until every [`ForwardQueue`] handle is dropped, then wait
    /// for in-flight deliveries to finish.
    pub async fn run(mut self) {
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                job = self.rx.recv() => match job {
                    Some(job) => {
                        in_flight.spawn(deliver(self.client.clone(), job));
                    }
                    None => break,
                },
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        debug!(in_flight = in_flight.len(), "Forward queue closed, draining");
        while in_flight.join_next().await.is_some() {}
    }
}

/// POST one job's body to its callback URL.
#[instrument(skip(client, job), fields(job_id = %job.id, origin = %job.origin, url = %job.callback_url))]
async fn deliver(client: Client, job: ForwardJob) {
    let result = client
        .post(job.callback_url.as_str())
        .header(CONTENT_TYPE, "application/json")
        .body(job.body)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            info!(status = response.status().as_u16(), "Forwarded payload");
        }
        Ok(response) => {
            error!(
                status = response.status().as_u16(),
                "Callback endpoint rejected forward"
            );
        }
        Err(e) => {
            error!(error = %e, "Failed to reach callback endpoint");
        }
    }
}
