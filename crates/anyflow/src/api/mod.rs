//! Access to the AnyFlow backend.
//!
//! Commands talk to the backend through [`BackendApi`]; [`HttpBackend`] is the
//! production implementation.

use std::path::Path;

use anyflow_cli_types::{ChainEntry, Deployment, DeploymentStatus, NewDeployment};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use self::http::HttpBackend;
use crate::events::Event;

mod http;

/// Fragment of the backend error message returned when a status update asks for
/// a transition the chain-deployment state machine has already made.
const TRANSITION_NOT_APPLICABLE_MARKER: &str = "cannot be applied on state";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request to the AnyFlow backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("AnyFlow backend responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Status transition rejected by the backend: {0}")]
    TransitionNotApplicable(String),
    #[error("Unexpected response from the AnyFlow backend: {0}")]
    Decode(String),
    #[error("Invalid backend endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiError {
    /// Classifies a non-success response by its status code and body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|body| match body.message {
                Some(serde_json::Value::String(message)) => Some(message),
                Some(serde_json::Value::Array(messages)) => Some(
                    messages
                        .iter()
                        .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_owned))
                        .collect::<Vec<_>>()
                        .join("; "),
                ),
                Some(other) => Some(other.to_string()),
                None => body.error,
            })
            .unwrap_or_else(|| body.trim().to_owned());

        if message.contains(TRANSITION_NOT_APPLICABLE_MARKER) {
            return Self::TransitionNotApplicable(message);
        }
        Self::Status { status, message }
    }

    /// The backend already moved past the requested state; retrying is pointless
    /// and the update can be treated as done.
    pub fn is_transition_not_applicable(&self) -> bool {
        matches!(self, Self::TransitionNotApplicable(_))
    }
}

/// Account the API key belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn get_chains(&self) -> Result<Vec<ChainEntry>, ApiError>;

    async fn get_user(&self) -> Result<User, ApiError>;

    async fn create_deployment(&self, deployment: &NewDeployment) -> Result<Deployment, ApiError>;

    async fn get_deployment(&self, deployment_id: u64) -> Result<Deployment, ApiError>;

    async fn update_chain_deployment_status(
        &self,
        chain_deployment_id: u64,
        status: DeploymentStatus,
    ) -> Result<(), ApiError>;

    async fn upload_artifacts(&self, deployment_id: u64, archive: &Path) -> Result<(), ApiError>;

    async fn send_event(&self, event: &Event) -> Result<(), ApiError>;
}
