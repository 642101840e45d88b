//! REST service tests against a mocked Voxa API.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use voxa::api::{self, conversations::ConversationQuery, ApiClient};
use voxa::auth::{FileSessionStore, MemorySessionStore, SessionStore};
use voxa::types::{AgentRequest, AppError, CampaignRequest, CampaignState};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============= Helper Functions =============

fn client_with_token(server: &MockServer, token: Option<&str>) -> ApiClient {
    let store = match token {
        Some(t) => MemorySessionStore::with_token(t),
        None => MemorySessionStore::new(),
    };
    ApiClient::new(server.uri(), Arc::new(store), Duration::from_secs(5))
        .expect("client should build")
}

fn mock_agent(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "voice": "alloy",
        "language": "en-US",
        "phone_number": "+15550100"
    })
}

// ============= Client Behaviour =============

mod client {
    use super::*;

    #[tokio::test]
    async fn test_bearer_token_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/agents"))
            .and(header("authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "agents": [mock_agent("ag_1", "Front desk")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("abc123"));
        let agents = api::agents::list_agents(&client).await.unwrap();

        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, "Front desk");
        assert_eq!(agents[0].phone_number.as_deref(), Some("+15550100"));
    }

    #[tokio::test]
    async fn test_error_field_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/campaigns"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"error": "Plan limit reached"})),
            )
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("abc123"));
        let err = api::campaigns::list_campaigns(&client).await.unwrap_err();

        match &err {
            AppError::Api { status, message } => {
                assert_eq!(*status, 403);
                assert_eq!(message, "Plan limit reached");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_message_field_used_when_error_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/phone-numbers"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"message": "Bad region"})),
            )
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("abc123"));
        let err = api::phone_numbers::list_phone_numbers(&client)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(422));
        assert!(err.to_string().contains("Bad region"));
    }

    #[tokio::test]
    async fn test_generic_message_for_unparseable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/activities"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("abc123"));
        let err = api::activities::recent_activities(&client, None)
            .await
            .unwrap_err();

        match err {
            AppError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Request failed with status 502");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let client = ApiClient::new(
            "http://127.0.0.1:9",
            Arc::new(MemorySessionStore::new()),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = api::agents::list_agents(&client).await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }
}

// ============= Auth Service =============

mod auth {
    use super::*;

    #[tokio::test]
    async fn test_login_stores_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({"email": "ops@voxa.test", "password": "hunter22"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok_live",
                "refresh_token": "ref_1",
                "expires_in": 900
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileSessionStore::new(dir.path().join("session.json")));
        let client = ApiClient::new(server.uri(), store.clone(), Duration::from_secs(5)).unwrap();

        let tokens = api::auth::login(&client, &*store, " ops@voxa.test ", "hunter22")
            .await
            .unwrap();

        assert_eq!(tokens.expires_in, Some(900));
        assert_eq!(store.get_token().as_deref(), Some("tok_live"));

        api::auth::logout(&*store).unwrap();
        assert_eq!(store.get_token(), None);
    }

    #[tokio::test]
    async fn test_rejected_login_leaves_storage_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new());
        let client = ApiClient::new(server.uri(), store.clone(), Duration::from_secs(5)).unwrap();

        let err = api::auth::login(&client, &*store, "ops@voxa.test", "wrong")
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(store.get_token(), None);
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let server = MockServer::start().await;
        let store = Arc::new(MemorySessionStore::new());
        let client = ApiClient::new(server.uri(), store.clone(), Duration::from_secs(5)).unwrap();

        let err = api::auth::login(&client, &*store, "  ", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_current_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user_1",
                "email": "ops@voxa.test",
                "company_id": "co1"
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("tok"));
        let user = api::auth::current_user(&client).await.unwrap();

        assert_eq!(user.company_id, "co1");
        assert!(user.name.is_none());
    }
}

// ============= Account Services =============

mod services {
    use super::*;

    #[tokio::test]
    async fn test_create_agent_validates_name() {
        let server = MockServer::start().await;
        let client = client_with_token(&server, Some("tok"));
        let request = AgentRequest {
            name: "   ".to_string(),
            voice: None,
            language: None,
            prompt: None,
        };

        let err = api::agents::create_agent(&client, &request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_agent() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/agents/ag_1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(mock_agent("ag_1", "Night shift")),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/agents/ag_1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("tok"));
        let request = AgentRequest {
            name: "Night shift".to_string(),
            voice: Some("alloy".to_string()),
            language: None,
            prompt: None,
        };

        let agent = api::agents::update_agent(&client, "ag_1", &request)
            .await
            .unwrap();
        assert_eq!(agent.name, "Night shift");
        api::agents::delete_agent(&client, "ag_1").await.unwrap();
    }

    #[tokio::test]
    async fn test_assign_phone_number() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/phone-numbers/pn_1"))
            .and(body_json(json!({"agent_id": "ag_1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pn_1",
                "number": "+15550100",
                "agent_id": "ag_1"
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("tok"));
        let number = api::phone_numbers::assign_phone_number(&client, "pn_1", "ag_1")
            .await
            .unwrap();

        assert_eq!(number.agent_id.as_deref(), Some("ag_1"));
    }

    #[tokio::test]
    async fn test_list_conversations_passes_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conversations"))
            .and(query_param("agent_id", "ag_1"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"id": "cv_1", "agent_id": "ag_1", "duration_secs": 42, "started_at": "2024-05-01T10:00:00Z"},
                    {"id": "cv_2", "agent_id": "ag_1", "started_at": "2024-05-01T09:00:00Z"}
                ],
                "next_cursor": "c_2"
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("tok"));
        let query = ConversationQuery {
            agent_id: Some("ag_1".to_string()),
            cursor: None,
            limit: Some(2),
        };
        let page = api::conversations::list_conversations(&client, &query)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].duration_secs, Some(42));
        assert_eq!(page.next_cursor.as_deref(), Some("c_2"));
    }

    #[tokio::test]
    async fn test_get_conversation_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conversations/cv_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cv_1",
                "started_at": "2024-05-01T10:00:00Z",
                "transcript": [
                    {"role": "agent", "content": "Hello, how can I help?"},
                    {"role": "caller", "content": "I'd like to book a table.", "offset_ms": 2100}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("tok"));
        let details = api::conversations::get_conversation(&client, "cv_1")
            .await
            .unwrap();

        assert_eq!(details.transcript.len(), 2);
        assert_eq!(details.transcript[1].offset_ms, Some(2100));
    }

    #[tokio::test]
    async fn test_campaign_lifecycle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/campaigns"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "cp_1", "name": "Renewals", "agent_id": "ag_1", "state": "draft", "contacts": 2
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/campaigns/cp_1/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cp_1", "name": "Renewals", "agent_id": "ag_1", "state": "running", "contacts": 2
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/campaigns/cp_1/pause"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cp_1", "name": "Renewals", "agent_id": "ag_1", "state": "paused",
                "contacts": 2, "completed_calls": 1
            })))
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("tok"));
        let request = CampaignRequest {
            name: "Renewals".to_string(),
            agent_id: "ag_1".to_string(),
            contacts: vec!["+15550101".to_string(), "+15550102".to_string()],
        };

        let created = api::campaigns::create_campaign(&client, &request).await.unwrap();
        assert_eq!(created.state, CampaignState::Draft);
        let started = api::campaigns::start_campaign(&client, "cp_1").await.unwrap();
        assert_eq!(started.state, CampaignState::Running);
        let paused = api::campaigns::pause_campaign(&client, "cp_1").await.unwrap();
        assert_eq!(paused.state, CampaignState::Paused);
        assert_eq!(paused.completed_calls, 1);
    }

    #[tokio::test]
    async fn test_activity_limit_is_clamped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/activities"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "activities": [
                    {"id": "a1", "kind": "call", "description": "Inbound call handled", "created_at": "2024-05-01T10:00:00Z"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server, Some("tok"));
        let activities = api::activities::recent_activities(&client, Some(5000))
            .await
            .unwrap();

        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].kind, "call");
    }
}
