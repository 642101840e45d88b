//! Conversation history.

use crate::api::client::ApiClient;
use crate::types::{ConversationDetails, ConversationSummary, Page, Result};
use serde::Serialize;

/// Filters for listing conversations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// One page of conversations, newest first.
pub async fn list_conversations(
    client: &ApiClient,
    query: &ConversationQuery,
) -> Result<Page<ConversationSummary>> {
    client.get_with_query("/api/conversations", query).await
}

/// Conversation with its transcript.
pub async fn get_conversation(client: &ApiClient, id: &str) -> Result<ConversationDetails> {
    client.get(&format!("/api/conversations/{}", id)).await
}
