//! The real-time feed collaborator seam.
//!
//! A [`FeedConnector`] opens one subscription for a (company, feed) pair and
//! returns a [`FeedChannel`] handle. Everything the subscription receives is
//! pushed through the [`FeedSink`] it was opened with, which tags each
//! message with the scope generation and the open ticket so the aggregator
//! can drop traffic from subscriptions it already tore down.

use crate::metrics::types::{CompanyId, ConnectionStatus, FeedKind, FeedUpdate};
use crate::types::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opens real-time subscriptions.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    /// Opens the `feed` subscription for `company`.
    ///
    /// Returning `Ok` means the channel is established (or establishing, in
    /// which case [`FeedChannel::status`] reports `Connecting` and a later
    /// status is pushed through `sink`).
    async fn open(
        &self,
        company: &CompanyId,
        feed: FeedKind,
        sink: FeedSink,
    ) -> Result<Box<dyn FeedChannel>>;
}

/// Handle to one open subscription.
pub trait FeedChannel: Send + Sync {
    /// Current connection status as seen by the channel.
    fn status(&self) -> ConnectionStatus;

    /// Requests closure. Idempotent; no payload is delivered through the
    /// sink once this returns.
    fn close(&self);
}

/// Something a subscription reports to the aggregator.
pub enum FeedEvent {
    /// Result of an open attempt.
    Opened(Result<Box<dyn FeedChannel>>),
    /// The channel changed status.
    Status(ConnectionStatus),
    /// Inbound payload.
    Update(FeedUpdate),
    /// Reconnect backoff elapsed.
    RetryDue,
}

impl std::fmt::Debug for FeedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedEvent::Opened(Ok(_)) => f.write_str("Opened(Ok)"),
            FeedEvent::Opened(Err(e)) => write!(f, "Opened(Err({}))", e),
            FeedEvent::Status(status) => write!(f, "Status({:?})", status),
            FeedEvent::Update(update) => write!(f, "Update({} keys)", update.metrics.len()),
            FeedEvent::RetryDue => f.write_str("RetryDue"),
        }
    }
}

/// A [`FeedEvent`] addressed to one subscription of one scope.
#[derive(Debug)]
pub struct FeedEnvelope {
    pub generation: u64,
    pub feed: FeedKind,
    pub ticket: u64,
    pub event: FeedEvent,
}

/// Sending half handed to a connector for one subscription.
#[derive(Clone)]
pub struct FeedSink {
    tx: mpsc::Sender<FeedEnvelope>,
    generation: u64,
    feed: FeedKind,
    ticket: u64,
    closed: Arc<AtomicBool>,
}

impl FeedSink {
    pub(crate) fn new(
        tx: mpsc::Sender<FeedEnvelope>,
        generation: u64,
        feed: FeedKind,
        ticket: u64,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tx,
            generation,
            feed,
            ticket,
            closed,
        }
    }

    /// A sink that is not attached to any aggregator, for driving a
    /// connector directly. Returns the sink and the receiving end.
    pub fn detached(feed: FeedKind, capacity: usize) -> (Self, mpsc::Receiver<FeedEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        let sink = Self::new(tx, 0, feed, 0, Arc::new(AtomicBool::new(false)));
        (sink, rx)
    }

    pub fn feed(&self) -> FeedKind {
        self.feed
    }

    /// Delivers a payload. Returns `false` once the subscription is closed
    /// or the aggregator is gone.
    pub async fn publish(&self, update: FeedUpdate) -> bool {
        self.send(FeedEvent::Update(update)).await
    }

    /// Reports a status change. Same return contract as [`publish`](Self::publish).
    pub async fn set_status(&self, status: ConnectionStatus) -> bool {
        self.send(FeedEvent::Status(status)).await
    }

    /// Stops all further delivery through this sink and its clones.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }

    async fn send(&self, event: FeedEvent) -> bool {
        if self.is_closed() {
            return false;
        }
        self.tx
            .send(FeedEnvelope {
                generation: self.generation,
                feed: self.feed,
                ticket: self.ticket,
                event,
            })
            .await
            .is_ok()
    }
}
