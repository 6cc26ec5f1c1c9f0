use serde::{Deserialize, Serialize};

use crate::Framework;

/// Lifecycle state shared by deployments and chain-deployments. The backend owns
/// the state machine, the CLI only asks for `Finished` or `Failed`.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeploymentStatus {
    Pending,
    Processing,
    Deploying,
    Finished,
    Failed,
}

impl DeploymentStatus {
    /// Whether an existing deployment may be picked up again by `deploy --deployment-id`.
    pub fn is_resumable(self) -> bool {
        matches!(self, Self::Pending | Self::Processing | Self::Deploying)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRef {
    pub chain_id: u64,
}

/// Body of `POST deployments?cli=true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeployment {
    pub chains: Vec<ChainRef>,
    pub framework: Framework,
    pub container_image: String,
    pub is_cli: bool,
    pub deterministic_addresses: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDeployment {
    pub id: u64,
    pub chain_id: u64,
    #[serde(default)]
    pub status: Option<DeploymentStatus>,
}

/// Deployment as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: u64,
    #[serde(default)]
    pub status: Option<DeploymentStatus>,
    #[serde(default)]
    pub chain_deployments: Vec<ChainDeployment>,
}
