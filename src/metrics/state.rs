//! Deterministic core of the metrics aggregator.
//!
//! [`MetricsState`] owns the per-feed subscription slots, the merged
//! snapshot and the scope generation. It performs no I/O: every operation
//! returns the [`Effect`]s the async driver must carry out (open a
//! subscription, schedule a reconnect, publish the view). Teardown of a
//! scope happens in exactly one place, [`MetricsState::teardown`], which
//! every exit path (company switch, unbind, terminate) goes through.

use crate::metrics::feed::{FeedChannel, FeedEvent};
use crate::metrics::snapshot::{MetricsMerger, MetricsSnapshot};
use crate::metrics::types::{CompanyId, ConnectionStatus, FeedKind, FeedUpdate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a dashboard consumer sees, published as one value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardView {
    /// Company the view is bound to, `None` while inactive.
    pub company: Option<CompanyId>,
    pub metrics: MetricsSnapshot,
    pub status: BTreeMap<FeedKind, ConnectionStatus>,
    /// Feeds that reached `connected` at least once for this company.
    pub ready_feeds: BTreeSet<FeedKind>,
    /// Every required feed is in `ready_feeds`.
    pub is_ready: bool,
    /// A company is bound and the scope is live.
    pub active: bool,
}

impl DashboardView {
    pub fn status_of(&self, feed: FeedKind) -> ConnectionStatus {
        self.status.get(&feed).copied().unwrap_or_default()
    }
}

/// A subscription the driver has to open.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub company: CompanyId,
    pub feed: FeedKind,
    pub generation: u64,
    pub ticket: u64,
    /// Shared with the sink; set when the subscription is torn down.
    pub closed: Arc<AtomicBool>,
}

/// Side effects requested by [`MetricsState`].
#[derive(Debug)]
pub enum Effect {
    Open(OpenRequest),
    /// Send `RetryDue` for this ticket after the backoff for `attempt`.
    Reconnect {
        generation: u64,
        feed: FeedKind,
        ticket: u64,
        attempt: u32,
    },
    Publish,
}

#[derive(Default)]
struct FeedSlot {
    status: ConnectionStatus,
    ever_connected: bool,
    ticket: Option<u64>,
    channel: Option<Box<dyn FeedChannel>>,
    closed: Option<Arc<AtomicBool>>,
    attempts: u32,
}

impl FeedSlot {
    /// Closes the current channel and stops its sink. Idempotent.
    fn close_channel(&mut self) {
        if let Some(flag) = self.closed.take() {
            flag.store(true, Ordering::SeqCst);
        }
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
    }
}

/// Aggregator state for one consumer scope.
pub struct MetricsState {
    required: Vec<FeedKind>,
    company: Option<CompanyId>,
    generation: u64,
    next_ticket: u64,
    slots: BTreeMap<FeedKind, FeedSlot>,
    merger: MetricsMerger,
    terminated: bool,
}

impl MetricsState {
    /// State that will subscribe to `feeds` once a company is bound.
    pub fn new(feeds: &[FeedKind]) -> Self {
        let mut required: Vec<FeedKind> = feeds.to_vec();
        required.sort();
        required.dedup();

        let slots = required.iter().map(|f| (*f, FeedSlot::default())).collect();
        Self {
            required,
            company: None,
            generation: 0,
            next_ticket: 0,
            slots,
            merger: MetricsMerger::new(),
            terminated: false,
        }
    }

    pub fn company(&self) -> Option<&CompanyId> {
        self.company.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn status(&self, feed: FeedKind) -> ConnectionStatus {
        self.slots
            .get(&feed)
            .map(|slot| slot.status)
            .unwrap_or_default()
    }

    /// Builds the consumer view.
    pub fn view(&self) -> DashboardView {
        let ready_feeds: BTreeSet<FeedKind> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.ever_connected)
            .map(|(feed, _)| *feed)
            .collect();
        let active = self.company.is_some() && !self.terminated;

        DashboardView {
            company: self.company.clone(),
            metrics: self.merger.snapshot().clone(),
            status: self
                .slots
                .iter()
                .map(|(feed, slot)| (*feed, slot.status))
                .collect(),
            is_ready: active
                && !self.required.is_empty()
                && self.required.iter().all(|f| ready_feeds.contains(f)),
            ready_feeds,
            active,
        }
    }

    /// Binds the scope to `company`.
    ///
    /// The previous company's subscriptions are torn down and the snapshot
    /// emptied before any subscription for the new company is requested.
    /// Binding the company that is already bound is a no-op.
    pub fn bind(&mut self, company: Option<CompanyId>) -> Vec<Effect> {
        if self.terminated || company == self.company {
            return Vec::new();
        }

        self.teardown();
        self.company = company;

        let Some(company) = self.company.clone() else {
            info!("Metrics aggregator inactive: no company bound");
            return vec![Effect::Publish];
        };

        info!(company = %company, feeds = self.required.len(), "Binding metrics scope");
        let mut effects = vec![Effect::Publish];
        for feed in self.required.clone() {
            effects.push(Effect::Open(self.begin_open(&company, feed)));
        }
        effects
    }

    /// Applies one envelope's event. Traffic from another generation or a
    /// superseded open ticket is discarded without touching state.
    pub fn handle(
        &mut self,
        generation: u64,
        feed: FeedKind,
        ticket: u64,
        event: FeedEvent,
    ) -> Vec<Effect> {
        let current = !self.terminated
            && generation == self.generation
            && self.slots.get(&feed).and_then(|s| s.ticket) == Some(ticket);

        if !current {
            debug!(
                feed = %feed,
                generation,
                ticket,
                "Discarding stale feed event {:?}",
                event
            );
            if let FeedEvent::Opened(Ok(channel)) = event {
                channel.close();
            }
            return Vec::new();
        }

        match event {
            FeedEvent::Opened(Ok(channel)) => self.on_opened(feed, channel),
            FeedEvent::Opened(Err(e)) => {
                warn!(feed = %feed, "Failed to open feed: {}", e);
                self.on_status(feed, ConnectionStatus::Error)
            }
            FeedEvent::Status(status) => self.on_status(feed, status),
            FeedEvent::Update(update) => self.on_update(feed, update),
            FeedEvent::RetryDue => self.on_retry_due(feed),
        }
    }

    /// Tears the scope down for good; later events are ignored.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.teardown();
        self.company = None;
        self.terminated = true;
        info!("Metrics scope terminated");
    }

    /// Closes every channel, returns every feed to `idle`, releases per-feed
    /// merge state and empties the snapshot. Bumps the generation so traffic
    /// still in flight for the old scope is recognised as stale.
    fn teardown(&mut self) {
        for (feed, slot) in self.slots.iter_mut() {
            slot.close_channel();
            slot.status = ConnectionStatus::Idle;
            slot.ticket = None;
            slot.ever_connected = false;
            slot.attempts = 0;
            self.merger.release_feed(*feed);
        }
        self.merger.reset();
        self.generation += 1;
        debug!(generation = self.generation, "Metrics scope torn down");
    }

    fn begin_open(&mut self, company: &CompanyId, feed: FeedKind) -> OpenRequest {
        self.next_ticket += 1;
        let closed = Arc::new(AtomicBool::new(false));
        let slot = self.slots.entry(feed).or_default();

        slot.close_channel();
        slot.status = ConnectionStatus::Connecting;
        slot.ticket = Some(self.next_ticket);
        slot.closed = Some(closed.clone());

        OpenRequest {
            company: company.clone(),
            feed,
            generation: self.generation,
            ticket: self.next_ticket,
            closed,
        }
    }

    fn on_opened(&mut self, feed: FeedKind, channel: Box<dyn FeedChannel>) -> Vec<Effect> {
        let status = match channel.status() {
            ConnectionStatus::Idle => ConnectionStatus::Connecting,
            other => other,
        };
        if let Some(slot) = self.slots.get_mut(&feed) {
            slot.channel = Some(channel);
        }
        self.on_status(feed, status)
    }

    fn on_status(&mut self, feed: FeedKind, status: ConnectionStatus) -> Vec<Effect> {
        // a connector reporting idle on a live ticket has lost its channel
        let status = match status {
            ConnectionStatus::Idle => ConnectionStatus::Disconnected,
            other => other,
        };
        let generation = self.generation;
        let Some(slot) = self.slots.get_mut(&feed) else {
            return Vec::new();
        };
        if slot.status == status {
            return Vec::new();
        }

        debug!(feed = %feed, "Feed status {:?} -> {:?}", slot.status, status);
        slot.status = status;

        match status {
            ConnectionStatus::Connected => {
                if !slot.ever_connected {
                    info!(feed = %feed, "Feed connected");
                }
                slot.ever_connected = true;
                slot.attempts = 0;
                vec![Effect::Publish]
            }
            ConnectionStatus::Disconnected | ConnectionStatus::Error => {
                slot.close_channel();
                slot.attempts = slot.attempts.saturating_add(1);
                let Some(ticket) = slot.ticket else {
                    return vec![Effect::Publish];
                };
                vec![
                    Effect::Publish,
                    Effect::Reconnect {
                        generation,
                        feed,
                        ticket,
                        attempt: slot.attempts,
                    },
                ]
            }
            ConnectionStatus::Connecting | ConnectionStatus::Idle => vec![Effect::Publish],
        }
    }

    fn on_update(&mut self, feed: FeedKind, update: FeedUpdate) -> Vec<Effect> {
        let outcome = self.merger.merge(feed, update);
        if outcome.discarded > 0 {
            debug!(
                feed = %feed,
                discarded = outcome.discarded,
                "Discarded out-of-order metric values"
            );
        }
        if outcome.changed {
            vec![Effect::Publish]
        } else {
            Vec::new()
        }
    }

    fn on_retry_due(&mut self, feed: FeedKind) -> Vec<Effect> {
        let Some(company) = self.company.clone() else {
            return Vec::new();
        };
        if !self.status(feed).needs_reconnect() {
            return Vec::new();
        }

        info!(feed = %feed, company = %company, "Reconnecting feed");
        vec![Effect::Publish, Effect::Open(self.begin_open(&company, feed))]
    }
}

impl Drop for MetricsState {
    fn drop(&mut self) {
        self.terminate();
    }
}
