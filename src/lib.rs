//! # Voxa - voice-AI dashboard core
//!
//! The client-side core of the Voxa voice-agent dashboard: gating protected
//! views on the stored session, and aggregating a company's real-time metric
//! feeds into a single consistent snapshot.
//!
//! ## Overview
//!
//! Voxa can be used in two ways:
//!
//! 1. **As a terminal dashboard** - Run the `voxa` binary
//! 2. **As a library** - Embed the guard and the aggregator in your own front end
//!
//! ### Guarding a view
//!
//! ```rust,ignore
//! use voxa::auth::{AccessGuard, FileSessionStore, Rendered};
//! use std::sync::Arc;
//!
//! let store = Arc::new(FileSessionStore::new("/home/me/.voxa/session.json"));
//! let mut guard = AccessGuard::for_store(store, navigator);
//!
//! if let Rendered::Protected(view) = guard.guard(|| build_dashboard(), None).await {
//!     show(view);
//! }
//! ```
//!
//! ### Watching metrics
//!
//! ```rust,ignore
//! use voxa::metrics::{AggregatorConfig, CompanyId, MetricsAggregator, SseFeedConnector};
//! use tokio::sync::watch;
//!
//! let (company_tx, company_rx) = watch::channel(CompanyId::new("co1"));
//! let connector = Arc::new(SseFeedConnector::new(http, "https://api.voxa.dev", store));
//! let aggregator = MetricsAggregator::spawn(connector, company_rx, AggregatorConfig::default());
//!
//! let mut views = aggregator.subscribe();
//! while views.changed().await.is_ok() {
//!     let view = views.borrow().clone();
//!     println!("ready={} calls={:?}", view.is_ready, view.metrics.get("calls"));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`auth`] - Session storage and the access guard
//! - [`metrics`] - Feed subscriptions, snapshot merging and the aggregator
//! - [`api`] - REST services (auth, agents, numbers, conversations, campaigns, activity)
//! - [`cli`] - Command-line interface for the `voxa` binary
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration (`voxa.toml`) and logging

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// REST API services.
pub mod api;
/// Session storage and the access guard.
pub mod auth;
/// Command-line interface.
pub mod cli;
/// Real-time metrics aggregation.
pub mod metrics;
/// Core types (DTOs, errors).
pub mod types;
/// Configuration and logging.
pub mod utils;

// Re-export commonly used types
pub use api::ApiClient;
pub use auth::{AccessGuard, FileSessionStore, MemorySessionStore, Navigator, SessionStore};
pub use metrics::{
    AggregatorConfig, CompanyId, ConnectionStatus, DashboardView, FeedKind, MetricsAggregator,
    SseFeedConnector,
};
pub use types::{AppError, Result};
pub use utils::toml_config::{ConfigManager, VoxaConfig};
