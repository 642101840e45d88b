//! Async driver for [`MetricsState`].
//!
//! One tokio task per aggregator owns the state. Feed traffic, open results
//! and reconnect timers all arrive on a single ingestion channel; company
//! changes arrive on the outer `watch` channel; the consumer view leaves on
//! another `watch` channel, one whole [`DashboardView`] per change.

use crate::metrics::feed::{FeedConnector, FeedEnvelope, FeedEvent, FeedSink};
use crate::metrics::reconnect::ReconnectPolicy;
use crate::metrics::state::{DashboardView, Effect, MetricsState, OpenRequest};
use crate::metrics::types::{CompanyId, FeedKind};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info};

/// Configuration for a [`MetricsAggregator`].
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Feeds that must connect before the view reports ready.
    pub feeds: Vec<FeedKind>,
    pub reconnect: ReconnectPolicy,
    /// Capacity of the ingestion channel shared by all feeds.
    pub channel_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            feeds: FeedKind::ALL.to_vec(),
            reconnect: ReconnectPolicy::default(),
            channel_capacity: 256,
        }
    }
}

impl AggregatorConfig {
    pub fn with_feeds(mut self, feeds: impl Into<Vec<FeedKind>>) -> Self {
        self.feeds = feeds.into();
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }
}

/// Handle to a running aggregator.
///
/// Dropping the handle tears the scope down, same as [`shutdown`](Self::shutdown)
/// without waiting for the task to finish.
pub struct MetricsAggregator {
    view_rx: watch::Receiver<DashboardView>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MetricsAggregator {
    /// Starts aggregating for whatever company `company_rx` carries.
    pub fn spawn(
        connector: Arc<dyn FeedConnector>,
        company_rx: watch::Receiver<Option<CompanyId>>,
        config: AggregatorConfig,
    ) -> Self {
        let state = MetricsState::new(&config.feeds);
        let (view_tx, view_rx) = watch::channel(state.view());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (ingest_tx, ingest_rx) = mpsc::channel(config.channel_capacity.max(1));

        let driver = Driver {
            state,
            connector,
            policy: config.reconnect,
            ingest_tx,
            view_tx,
            tasks: JoinSet::new(),
        };
        let task = tokio::spawn(driver.run(company_rx, ingest_rx, shutdown_rx));

        Self {
            view_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Receiver of view updates for a consumer.
    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.view_rx.clone()
    }

    /// Current view.
    pub fn view(&self) -> DashboardView {
        self.view_rx.borrow().clone()
    }

    /// Tears the scope down and waits for the driver task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for MetricsAggregator {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

struct Driver {
    state: MetricsState,
    connector: Arc<dyn FeedConnector>,
    policy: ReconnectPolicy,
    ingest_tx: mpsc::Sender<FeedEnvelope>,
    view_tx: watch::Sender<DashboardView>,
    tasks: JoinSet<()>,
}

impl Driver {
    async fn run(
        mut self,
        mut company_rx: watch::Receiver<Option<CompanyId>>,
        mut ingest_rx: mpsc::Receiver<FeedEnvelope>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let initial = company_rx.borrow_and_update().clone();
        self.rebind(initial);

        let mut context_open = true;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                changed = company_rx.changed(), if context_open => match changed {
                    Ok(()) => {
                        let company = company_rx.borrow_and_update().clone();
                        self.rebind(company);
                    }
                    Err(_) => {
                        debug!("Company context closed, keeping current binding");
                        context_open = false;
                    }
                },
                Some(envelope) = ingest_rx.recv() => {
                    let effects = self.state.handle(
                        envelope.generation,
                        envelope.feed,
                        envelope.ticket,
                        envelope.event,
                    );
                    self.apply(effects);
                }
                Some(_) = self.tasks.join_next(), if !self.tasks.is_empty() => {}
            }
        }

        self.tasks.abort_all();
        self.state.terminate();
        self.view_tx.send_replace(self.state.view());
        // anything still queued belongs to a terminated scope
        ingest_rx.close();
        while let Some(envelope) = ingest_rx.recv().await {
            if let FeedEvent::Opened(Ok(channel)) = envelope.event {
                channel.close();
            }
        }
        info!("Metrics aggregator stopped");
    }

    fn rebind(&mut self, company: Option<CompanyId>) {
        if company == self.state.company().cloned() {
            return;
        }
        // pending opens and backoff timers belong to the old scope
        self.tasks.abort_all();
        let effects = self.state.bind(company);
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        let mut publish = false;
        for effect in effects {
            match effect {
                Effect::Publish => publish = true,
                Effect::Open(request) => self.spawn_open(request),
                Effect::Reconnect {
                    generation,
                    feed,
                    ticket,
                    attempt,
                } => {
                    let delay = self.policy.delay_for(attempt);
                    debug!(feed = %feed, attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
                    let tx = self.ingest_tx.clone();
                    self.tasks.spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx
                            .send(FeedEnvelope {
                                generation,
                                feed,
                                ticket,
                                event: FeedEvent::RetryDue,
                            })
                            .await;
                    });
                }
            }
        }
        if publish {
            self.view_tx.send_replace(self.state.view());
        }
    }

    fn spawn_open(&mut self, request: OpenRequest) {
        let connector = self.connector.clone();
        let tx = self.ingest_tx.clone();
        self.tasks.spawn(async move {
            let OpenRequest {
                company,
                feed,
                generation,
                ticket,
                closed,
            } = request;
            let sink = FeedSink::new(tx.clone(), generation, feed, ticket, closed);

            debug!(feed = %feed, company = %company, ticket, "Opening feed");
            let result = connector.open(&company, feed, sink).await;

            let envelope = FeedEnvelope {
                generation,
                feed,
                ticket,
                event: FeedEvent::Opened(result),
            };
            if let Err(mpsc::error::SendError(envelope)) = tx.send(envelope).await {
                if let FeedEvent::Opened(Ok(channel)) = envelope.event {
                    channel.close();
                }
            }
        });
    }
}
