use std::path::Path;

use anyflow_cli_types::{ChainEntry, Deployment, DeploymentStatus, NewDeployment};
use async_trait::async_trait;
use reqwest::{header, multipart, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use super::{ApiError, BackendApi, User};
use crate::{
    consts::{HTTP_CONNECT_TIMEOUT, HTTP_REQUEST_TIMEOUT, UPLOAD_TIMEOUT},
    events::Event,
};

const CHAINS_ENDPOINT: &str = "chains";
const USER_ENDPOINT: &str = "user";
const DEPLOYMENTS_ENDPOINT: &str = "deployments";
const CHAIN_DEPLOYMENTS_ENDPOINT: &str = "chain-deployments";
const EVENTS_ENDPOINT: &str = "events";
const ARTIFACT_FIELD: &str = "file";

/// Backend responses usually wrap the payload in `{"data": ...}`, a few endpoints
/// return it bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(data) => data,
        }
    }
}

#[derive(Serialize)]
struct StatusUpdate {
    status: DeploymentStatus,
}

/// [`BackendApi`] over HTTPS, authenticated with a bearer API key.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: Url, api_key: Option<SecretString>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("anyflow-cli/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(base_url, api_key, client))
    }

    pub fn with_client(
        mut base_url: Url,
        api_key: Option<SecretString>,
        client: reqwest::Client,
    ) -> Self {
        // Relative endpoints are joined onto the base, which only keeps the last
        // path segment when it ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            api_key,
            client,
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.base_url.join(endpoint)?;
        let mut builder = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json")
            .timeout(HTTP_REQUEST_TIMEOUT);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }
        Ok(builder)
    }

    async fn send(builder: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_response(status.as_u16(), &body))
    }

    async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let body = Self::send(builder).await?.text().await?;
        serde_json::from_str::<Payload<T>>(&body)
            .map(Payload::into_inner)
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn get_chains(&self) -> Result<Vec<ChainEntry>, ApiError> {
        Self::fetch(self.request(Method::GET, CHAINS_ENDPOINT)?).await
    }

    async fn get_user(&self) -> Result<User, ApiError> {
        Self::fetch(self.request(Method::GET, USER_ENDPOINT)?).await
    }

    async fn create_deployment(&self, deployment: &NewDeployment) -> Result<Deployment, ApiError> {
        let builder = self
            .request(Method::POST, DEPLOYMENTS_ENDPOINT)?
            .query(&[("cli", "true")])
            .json(deployment);
        Self::fetch(builder).await
    }

    async fn get_deployment(&self, deployment_id: u64) -> Result<Deployment, ApiError> {
        let endpoint = format!("{DEPLOYMENTS_ENDPOINT}/{deployment_id}");
        Self::fetch(self.request(Method::GET, &endpoint)?).await
    }

    async fn update_chain_deployment_status(
        &self,
        chain_deployment_id: u64,
        status: DeploymentStatus,
    ) -> Result<(), ApiError> {
        let endpoint = format!("{CHAIN_DEPLOYMENTS_ENDPOINT}/{chain_deployment_id}/status");
        let builder = self
            .request(Method::PUT, &endpoint)?
            .json(&StatusUpdate { status });
        Self::send(builder).await?;
        Ok(())
    }

    async fn upload_artifacts(&self, deployment_id: u64, archive: &Path) -> Result<(), ApiError> {
        let file_name = archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact.zip".to_owned());
        let content = tokio::fs::read(archive).await?;
        let part = multipart::Part::bytes(content)
            .file_name(file_name)
            .mime_str("application/zip")?;
        let form = multipart::Form::new().part(ARTIFACT_FIELD, part);

        let endpoint = format!("{DEPLOYMENTS_ENDPOINT}/{deployment_id}/upload-artifacts");
        let builder = self
            .request(Method::POST, &endpoint)?
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form);
        Self::send(builder).await?;
        Ok(())
    }

    async fn send_event(&self, event: &Event) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, EVENTS_ENDPOINT)?.json(event);
        Self::send(builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyflow_cli_types::{ChainRef, Framework};
    use assert_matches::assert_matches;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn backend(server: &MockServer, api_key: Option<&str>) -> HttpBackend {
        let base_url = Url::parse(&server.url("/api")).unwrap();
        HttpBackend::new(base_url, api_key.map(|key| SecretString::new(key.to_owned()))).unwrap()
    }

    #[tokio::test]
    async fn chains_are_unwrapped_from_data() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/chains")
                    .header("authorization", "Bearer test-key");
                then.status(200).json_body(json!({
                    "data": [
                        {"chain_id": 11155111, "name": "Sepolia", "aliases": ["sepolia"], "is_available": true},
                        {"chain_id": 97, "name": "BSC Testnet", "aliases": ["bsc-testnet"], "is_available": false}
                    ]
                }));
            })
            .await;

        let chains = backend(&server, Some("test-key")).get_chains().await.unwrap();

        mock.assert_async().await;
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].aliases, vec!["sepolia".to_owned()]);
        assert!(!chains[1].is_available);
    }

    #[tokio::test]
    async fn bare_user_payload_is_accepted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/user");
                then.status(200)
                    .json_body(json!({"id": 3, "name": "Ada", "email": "ada@example.com"}));
            })
            .await;

        let user = backend(&server, Some("k")).get_user().await.unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn create_deployment_is_flagged_as_cli() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/deployments")
                    .query_param("cli", "true")
                    .json_body(json!({
                        "chains": [{"chain_id": 11155111}],
                        "framework": "hardhat",
                        "container_image": "anyflow-node-20",
                        "is_cli": true,
                        "deterministic_addresses": false
                    }));
                then.status(201).json_body(json!({
                    "data": {
                        "id": 42,
                        "status": "pending",
                        "chain_deployments": [{"id": 7, "chain_id": 11155111, "status": "pending"}]
                    }
                }));
            })
            .await;

        let deployment = backend(&server, Some("k"))
            .create_deployment(&NewDeployment {
                chains: vec![ChainRef {
                    chain_id: 11_155_111,
                }],
                framework: Framework::Hardhat,
                container_image: "anyflow-node-20".into(),
                is_cli: true,
                deterministic_addresses: false,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(deployment.id, 42);
        assert_eq!(deployment.chain_deployments[0].id, 7);
    }

    #[tokio::test]
    async fn status_update_errors_are_classified() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/chain-deployments/7/status")
                    .json_body(json!({"status": "failed"}));
                then.status(422).json_body(json!({
                    "message": "Transition from finished to failed cannot be applied on state finished"
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/api/chain-deployments/8/status");
                then.status(500).body("Internal Server Error");
            })
            .await;
        let api = backend(&server, Some("k"));

        let err = api
            .update_chain_deployment_status(7, DeploymentStatus::Failed)
            .await
            .unwrap_err();
        assert!(err.is_transition_not_applicable());

        let err = api
            .update_chain_deployment_status(8, DeploymentStatus::Finished)
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::Status { status: 500, .. });
    }

    #[tokio::test]
    async fn artifacts_are_uploaded_as_multipart() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/deployments/42/upload-artifacts")
                    .header_exists("content-type")
                    .body_contains("artifact.zip")
                    .body_contains("zip-bytes");
                then.status(200).json_body(json!({"data": null}));
            })
            .await;
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("artifact.zip");
        std::fs::write(&archive, "zip-bytes").unwrap();

        backend(&server, Some("k"))
            .upload_artifacts(42, &archive)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn requests_without_key_are_anonymous() {
        let server = MockServer::start_async().await;
        let authorized = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/chains").header_exists("authorization");
                then.status(500);
            })
            .await;
        let anonymous = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/chains");
                then.status(200).json_body(json!([]));
            })
            .await;

        let chains = backend(&server, None).get_chains().await.unwrap();

        assert!(chains.is_empty());
        assert_eq!(authorized.hits_async().await, 0);
        anonymous.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/deployments/1");
                then.status(200).body("<html>");
            })
            .await;

        let err = backend(&server, Some("k")).get_deployment(1).await.unwrap_err();
        assert_matches!(err, ApiError::Decode(_));
    }
}
