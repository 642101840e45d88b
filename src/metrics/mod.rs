//! Real-time dashboard metrics
//!
//! The aggregator composes the company's real-time feeds (`analytics`,
//! `agent-stats`, `call-reports`, `sentiment`, `urgency`) into one
//! [`DashboardView`]: the merged metric snapshot, the connection status of
//! every feed and a readiness flag.
//!
//! # Lifecycle
//!
//! Per feed: `idle → connecting → connected → {disconnected, error}`. A
//! disconnected or failed feed reconnects with exponential backoff until the
//! scope is torn down, at which point it returns to `idle` and its channel
//! is closed.
//!
//! Switching companies tears every subscription down and empties the
//! snapshot before the new company's feeds are opened; events still in
//! flight for the old company are discarded.
//!
//! # Usage
//!
//! ```ignore
//! use voxa::metrics::{AggregatorConfig, MetricsAggregator, SseFeedConnector};
//!
//! let (company_tx, company_rx) = tokio::sync::watch::channel(CompanyId::new("co1"));
//! let connector = Arc::new(SseFeedConnector::new(http, base_url, session));
//! let aggregator = MetricsAggregator::spawn(connector, company_rx, AggregatorConfig::default());
//!
//! let mut view = aggregator.subscribe();
//! while view.changed().await.is_ok() {
//!     render(&view.borrow());
//! }
//! ```

/// Async driver task and consumer handle.
pub mod aggregator;
/// Feed connector seam and message envelopes.
pub mod feed;
/// Reconnect backoff.
pub mod reconnect;
/// Merged snapshot and the per-key ordering rule.
pub mod snapshot;
/// SSE feed transport.
pub mod sse;
/// Deterministic aggregator state.
pub mod state;
/// Feed, status and payload types.
pub mod types;

pub use aggregator::{AggregatorConfig, MetricsAggregator};
pub use feed::{FeedChannel, FeedConnector, FeedEnvelope, FeedEvent, FeedSink};
pub use reconnect::ReconnectPolicy;
pub use snapshot::{MetricsMerger, MetricsSnapshot};
pub use sse::SseFeedConnector;
pub use state::{DashboardView, MetricsState};
pub use types::{CompanyId, ConnectionStatus, FeedKind, FeedOrdering, FeedUpdate};
