use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Identifier of the tenant whose metrics are observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(String);

impl CompanyId {
    /// Returns `None` for an empty identifier.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The real-time feeds a dashboard can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    Analytics,
    AgentStats,
    CallReports,
    Sentiment,
    Urgency,
}

impl FeedKind {
    pub const ALL: [FeedKind; 5] = [
        FeedKind::Analytics,
        FeedKind::AgentStats,
        FeedKind::CallReports,
        FeedKind::Sentiment,
        FeedKind::Urgency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Analytics => "analytics",
            FeedKind::AgentStats => "agent-stats",
            FeedKind::CallReports => "call-reports",
            FeedKind::Sentiment => "sentiment",
            FeedKind::Urgency => "urgency",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown feed '{}'", s))
    }
}

/// Connection health of one feed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Not opened, or torn down.
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    /// Statuses from which the aggregator schedules a reconnect.
    pub fn needs_reconnect(&self) -> bool {
        matches!(self, ConnectionStatus::Disconnected | ConnectionStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering value reported by a feed. Only values of the same kind are
/// comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrdering {
    Sequence(i64),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
}

impl FeedOrdering {
    /// Compares against `other` when both share a kind.
    pub fn compare(&self, other: &FeedOrdering) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Self::Sequence(a), Self::Sequence(b)) | (Self::Timestamp(a), Self::Timestamp(b)) => {
                Some(a.cmp(b))
            }
            _ => None,
        }
    }
}

/// One inbound payload from a feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedUpdate {
    /// Feed-provided sequence number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
    /// Feed-provided timestamp, used when there is no sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub metrics: Map<String, Value>,
}

impl FeedUpdate {
    pub fn new(metrics: Map<String, Value>) -> Self {
        Self {
            metrics,
            ..Default::default()
        }
    }

    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Ordering value reported by the feed, if any.
    pub fn ordering(&self) -> Option<FeedOrdering> {
        self.sequence.map(FeedOrdering::Sequence).or_else(|| {
            self.timestamp
                .map(|t| FeedOrdering::Timestamp(t.timestamp_millis()))
        })
    }
}
