//! Phone numbers and their agent assignments.

use crate::api::client::ApiClient;
use crate::types::{PhoneNumber, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct PhoneNumbersResponse {
    phone_numbers: Vec<PhoneNumber>,
}

#[derive(Debug, Serialize)]
struct AssignRequest<'a> {
    agent_id: Option<&'a str>,
}

pub async fn list_phone_numbers(client: &ApiClient) -> Result<Vec<PhoneNumber>> {
    let resp: PhoneNumbersResponse = client.get("/api/phone-numbers").await?;
    Ok(resp.phone_numbers)
}

/// Routes inbound calls on `number_id` to `agent_id`.
pub async fn assign_phone_number(
    client: &ApiClient,
    number_id: &str,
    agent_id: &str,
) -> Result<PhoneNumber> {
    client
        .patch(
            &format!("/api/phone-numbers/{}", number_id),
            &AssignRequest {
                agent_id: Some(agent_id),
            },
        )
        .await
}

/// Detaches the number from its agent.
pub async fn unassign_phone_number(client: &ApiClient, number_id: &str) -> Result<PhoneNumber> {
    client
        .patch(
            &format!("/api/phone-numbers/{}", number_id),
            &AssignRequest { agent_id: None },
        )
        .await
}

/// Releases the number back to the carrier.
pub async fn release_phone_number(client: &ApiClient, number_id: &str) -> Result<()> {
    client
        .delete(&format!("/api/phone-numbers/{}", number_id))
        .await
}
