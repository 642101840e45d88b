use crate::api::client::ApiClient;
use crate::types::{Activity, Result};
use serde::Deserialize;

const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
struct ActivitiesResponse {
    activities: Vec<Activity>,
}

/// Most recent account activity, newest first.
pub async fn recent_activities(client: &ApiClient, limit: Option<u32>) -> Result<Vec<Activity>> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100);
    let resp: ActivitiesResponse = client
        .get_with_query("/api/activities", &[("limit", limit)])
        .await?;
    Ok(resp.activities)
}
