//! Voxa API services
//!
//! Thin wrappers over the remote REST API. Each call forwards the stored
//! bearer token; non-2xx responses surface as [`AppError::Api`](crate::types::AppError::Api)
//! carrying the server's error message.

/// Recent account activity.
pub mod activities;
/// Voice agents.
pub mod agents;
/// Login, logout and the current user.
pub mod auth;
/// Outbound campaigns.
pub mod campaigns;
/// Shared HTTP client.
pub mod client;
/// Conversation history.
pub mod conversations;
/// Phone numbers.
pub mod phone_numbers;

pub use client::ApiClient;
