//! Mock implementations for testing.
//!
//! This module provides a scriptable feed connector and a recording
//! navigator that can be used across different test files without
//! duplication.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use voxa::auth::Navigator;
use voxa::metrics::{
    CompanyId, ConnectionStatus, DashboardView, FeedChannel, FeedConnector, FeedKind, FeedSink,
    FeedUpdate,
};
use voxa::types::{AppError, Result};

// ============= Feed Mocks =============

/// Channel handed out by [`MockFeedConnector`].
#[derive(Clone)]
pub struct MockFeedChannel {
    status: Arc<Mutex<ConnectionStatus>>,
    closes: Arc<AtomicU32>,
    sink: FeedSink,
}

impl MockFeedChannel {
    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

impl FeedChannel for MockFeedChannel {
    fn status(&self) -> ConnectionStatus {
        *self.status.lock()
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.sink.close();
        *self.status.lock() = ConnectionStatus::Idle;
    }
}

/// One call to [`MockFeedConnector::open`].
#[derive(Clone)]
pub struct OpenRecord {
    pub company: CompanyId,
    pub feed: FeedKind,
    pub sink: FeedSink,
    /// `None` when the open was scripted to fail.
    pub channel: Option<MockFeedChannel>,
}

impl OpenRecord {
    /// Delivers a payload through this subscription's sink.
    pub async fn push(&self, update: FeedUpdate) -> bool {
        self.sink.publish(update).await
    }
}

/// Feed connector whose subscriptions are driven by the test.
///
/// Opens succeed immediately with a channel already `connected`, unless
/// failures were scripted for the feed with [`fail_next`](Self::fail_next).
#[derive(Clone, Default)]
pub struct MockFeedConnector {
    opens: Arc<Mutex<Vec<OpenRecord>>>,
    failures: Arc<Mutex<HashMap<FeedKind, u32>>>,
}

impl MockFeedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `times` opens of `feed` fail.
    pub fn fail_next(&self, feed: FeedKind, times: u32) {
        self.failures.lock().insert(feed, times);
    }

    pub fn opens(&self) -> Vec<OpenRecord> {
        self.opens.lock().clone()
    }

    pub fn opens_for(&self, company: &str, feed: FeedKind) -> Vec<OpenRecord> {
        self.opens
            .lock()
            .iter()
            .filter(|r| r.company.as_str() == company && r.feed == feed)
            .cloned()
            .collect()
    }

    /// Most recent successful open for the pair.
    pub fn latest(&self, company: &str, feed: FeedKind) -> Option<OpenRecord> {
        self.opens_for(company, feed)
            .into_iter()
            .rev()
            .find(|r| r.channel.is_some())
    }

    /// Waits until at least `count` opens happened for the pair.
    pub async fn wait_for_opens(&self, company: &str, feed: FeedKind, count: usize) {
        wait_until(|| self.opens_for(company, feed).len() >= count).await;
    }
}

#[async_trait]
impl FeedConnector for MockFeedConnector {
    async fn open(
        &self,
        company: &CompanyId,
        feed: FeedKind,
        sink: FeedSink,
    ) -> Result<Box<dyn FeedChannel>> {
        let fail = {
            let mut failures = self.failures.lock();
            match failures.get_mut(&feed) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            }
        };

        if fail {
            self.opens.lock().push(OpenRecord {
                company: company.clone(),
                feed,
                sink,
                channel: None,
            });
            return Err(AppError::Feed(format!("{} unavailable", feed)));
        }

        let channel = MockFeedChannel {
            status: Arc::new(Mutex::new(ConnectionStatus::Connected)),
            closes: Arc::new(AtomicU32::new(0)),
            sink: sink.clone(),
        };
        self.opens.lock().push(OpenRecord {
            company: company.clone(),
            feed,
            sink,
            channel: Some(channel.clone()),
        });
        Ok(Box::new(channel))
    }
}

// ============= Navigation Mock =============

/// Navigator that records every redirect.
#[derive(Default)]
pub struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths.lock().push(path.to_string());
    }
}

// ============= Helpers =============

const WAIT: Duration = Duration::from_secs(5);

/// Polls `condition` until it holds, panicking after a few seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Waits for a published view satisfying `predicate` and returns it.
pub async fn wait_for_view(
    views: &mut watch::Receiver<DashboardView>,
    predicate: impl FnMut(&DashboardView) -> bool,
) -> DashboardView {
    tokio::time::timeout(WAIT, views.wait_for(predicate))
        .await
        .expect("view condition not reached in time")
        .expect("aggregator dropped the view channel")
        .clone()
}

/// Builds a payload from a JSON object literal.
pub fn update(metrics: serde_json::Value) -> FeedUpdate {
    match metrics {
        serde_json::Value::Object(map) => FeedUpdate::new(map),
        other => panic!("metrics must be a JSON object, got {}", other),
    }
}
