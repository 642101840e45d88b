//! Voice agent management.

use crate::api::client::ApiClient;
use crate::types::{Agent, AgentRequest, AppError, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AgentsListResponse {
    agents: Vec<Agent>,
}

/// Fetch the company's agents
pub async fn list_agents(client: &ApiClient) -> Result<Vec<Agent>> {
    let resp: AgentsListResponse = client.get("/api/agents").await?;
    Ok(resp.agents)
}

pub async fn get_agent(client: &ApiClient, id: &str) -> Result<Agent> {
    client.get(&format!("/api/agents/{}", id)).await
}

pub async fn create_agent(client: &ApiClient, request: &AgentRequest) -> Result<Agent> {
    validate(request)?;
    client.post("/api/agents", request).await
}

pub async fn update_agent(client: &ApiClient, id: &str, request: &AgentRequest) -> Result<Agent> {
    validate(request)?;
    client.patch(&format!("/api/agents/{}", id), request).await
}

pub async fn delete_agent(client: &ApiClient, id: &str) -> Result<()> {
    client.delete(&format!("/api/agents/{}", id)).await
}

fn validate(request: &AgentRequest) -> Result<()> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Agent name is required".to_string()));
    }
    Ok(())
}
