//! Server-Sent Events transport for metric feeds.
//!
//! Each feed is a long-lived `GET {base}/api/companies/{company}/feeds/{feed}/stream`
//! request. Every SSE event whose data is a JSON [`FeedUpdate`] is forwarded
//! to the sink; `ping` events and empty data lines are keep-alives.

use crate::auth::jwt::token_fingerprint;
use crate::auth::session::{Session, SessionStore};
use crate::metrics::feed::{FeedChannel, FeedConnector, FeedSink};
use crate::metrics::types::{CompanyId, ConnectionStatus, FeedKind, FeedUpdate};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use reqwest::header::ACCEPT;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Opens metric feeds as SSE streams against the Voxa API.
pub struct SseFeedConnector {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl SseFeedConnector {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        session: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn stream_url(&self, company: &CompanyId, feed: FeedKind) -> String {
        format!(
            "{}/api/companies/{}/feeds/{}/stream",
            self.base_url, company, feed
        )
    }
}

#[async_trait]
impl FeedConnector for SseFeedConnector {
    async fn open(
        &self,
        company: &CompanyId,
        feed: FeedKind,
        sink: FeedSink,
    ) -> Result<Box<dyn FeedChannel>> {
        let url = self.stream_url(company, feed);
        let mut request = self.http.get(&url).header(ACCEPT, "text/event-stream");

        let session = Session::read(self.session.as_ref());
        if let Some(token) = session.bearer() {
            debug!(feed = %feed, token = %token_fingerprint(token), "Opening SSE feed {}", url);
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Feed(format!("{} stream request failed: {}", feed, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Feed(format!(
                "{} stream returned status {}",
                feed,
                status.as_u16()
            )));
        }

        // reported ahead of any payload so the aggregator sees the feed
        // connect even when a short stream ends before the open completes
        sink.set_status(ConnectionStatus::Connected).await;

        let channel_status = Arc::new(Mutex::new(ConnectionStatus::Connected));
        let reader = tokio::spawn(read_events(
            response.bytes_stream(),
            sink.clone(),
            channel_status.clone(),
        ));

        Ok(Box::new(SseFeedChannel {
            status: channel_status,
            sink,
            reader: Mutex::new(Some(reader)),
        }))
    }
}

/// Reads the stream until it ends, fails, or the sink closes.
async fn read_events<S, E>(stream: S, sink: FeedSink, status: Arc<Mutex<ConnectionStatus>>)
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let feed = sink.feed();
    let mut events = Box::pin(stream.eventsource());

    while let Some(event) = events.next().await {
        match event {
            Ok(event) => {
                if event.event == "ping" || event.data.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<FeedUpdate>(&event.data) {
                    Ok(update) => {
                        if !sink.publish(update).await {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(feed = %feed, "Skipping malformed feed event: {}", e);
                    }
                }
            }
            Err(e) => {
                warn!(feed = %feed, "Feed stream failed: {}", e);
                finish(&sink, &status, ConnectionStatus::Error).await;
                return;
            }
        }
    }

    debug!(feed = %feed, "Feed stream ended");
    finish(&sink, &status, ConnectionStatus::Disconnected).await;
}

async fn finish(sink: &FeedSink, status: &Mutex<ConnectionStatus>, next: ConnectionStatus) {
    {
        let mut current = status.lock();
        if *current == ConnectionStatus::Idle {
            return;
        }
        *current = next;
    }
    sink.set_status(next).await;
}

/// Handle to one SSE subscription.
struct SseFeedChannel {
    status: Arc<Mutex<ConnectionStatus>>,
    sink: FeedSink,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl FeedChannel for SseFeedChannel {
    fn status(&self) -> ConnectionStatus {
        *self.status.lock()
    }

    fn close(&self) {
        self.sink.close();
        *self.status.lock() = ConnectionStatus::Idle;
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
    }
}

impl Drop for SseFeedChannel {
    fn drop(&mut self) {
        self.close();
    }
}
