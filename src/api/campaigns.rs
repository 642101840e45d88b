//! Outbound calling campaigns.

use crate::api::client::ApiClient;
use crate::types::{AppError, Campaign, CampaignRequest, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CampaignsResponse {
    campaigns: Vec<Campaign>,
}

pub async fn list_campaigns(client: &ApiClient) -> Result<Vec<Campaign>> {
    let resp: CampaignsResponse = client.get("/api/campaigns").await?;
    Ok(resp.campaigns)
}

pub async fn create_campaign(client: &ApiClient, request: &CampaignRequest) -> Result<Campaign> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Campaign name is required".to_string()));
    }
    if request.agent_id.is_empty() {
        return Err(AppError::InvalidInput(
            "Campaign needs an agent to place calls".to_string(),
        ));
    }
    client.post("/api/campaigns", request).await
}

pub async fn start_campaign(client: &ApiClient, id: &str) -> Result<Campaign> {
    client
        .post_empty(&format!("/api/campaigns/{}/start", id))
        .await
}

pub async fn pause_campaign(client: &ApiClient, id: &str) -> Result<Campaign> {
    client
        .post_empty(&format!("/api/campaigns/{}/pause", id))
        .await
}
