use std::{path::PathBuf, sync::Arc, time::Instant};

use anyflow_cli_common::{cmd::Cmd, env_file, logger};
use anyflow_cli_types::{
    ChainDeployment, ChainRef, Deployment, DeploymentStatus, Framework, NewDeployment,
};
use anyhow::Context;
use serde::Serialize;
use xshell::{cmd, Shell};

use super::args::DeployArgs;
use crate::{
    api::BackendApi,
    artifacts,
    chains::ChainRegistry,
    consts::{BASE_RPC_URL_VAR, CHAIN_DEPLOYMENT_ID_VAR, DOTENV_FILE},
    events::{EventDispatcher, EventPayload},
    messages::*,
    recovery::{FailedStatusRecord, RecoveryJournal},
    utils::project::PackageJson,
};

/// Placeholder replaced by the target chain id in deploy script arguments.
pub const CHAIN_ID_PLACEHOLDER: &str = "{chain_id}";

/// Command run once per chain-deployment from the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployScript {
    program: String,
    args: Vec<String>,
}

impl Default for DeployScript {
    fn default() -> Self {
        Self::new("npm", ["run", "deploy", "--", "--network", CHAIN_ID_PLACEHOLDER])
    }
}

impl DeployScript {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn args_for(&self, chain_id: u64) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(CHAIN_ID_PLACEHOLDER, &chain_id.to_string()))
            .collect()
    }

    pub fn command_line(&self, chain_id: u64) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args_for(chain_id))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Per-chain result of a deploy run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentOutcome {
    pub deployment_id: u64,
    pub successful_chains: Vec<u64>,
    pub failed_chains: Vec<u64>,
}

impl DeploymentOutcome {
    fn new(deployment_id: u64) -> Self {
        Self {
            deployment_id,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed_chains.is_empty()
    }
}

/// Runs a deployment end to end: resolves or creates the backend record, uploads
/// the compiled artifacts and runs the deploy script for every chain-deployment.
pub struct Orchestrator<'a> {
    pub shell: &'a Shell,
    pub api: Arc<dyn BackendApi>,
    pub registry: &'a ChainRegistry,
    pub events: &'a EventDispatcher,
    pub journal: RecoveryJournal,
    pub project_root: PathBuf,
    pub base_rpc_url: String,
    pub script: DeployScript,
    pub verbose: bool,
}

impl Orchestrator<'_> {
    pub async fn deploy(&self, args: &DeployArgs) -> anyhow::Result<DeploymentOutcome> {
        let deployment = match args.deployment_id {
            Some(deployment_id) => self.resume_deployment(deployment_id).await?,
            None => {
                let deployment = self
                    .create_deployment(&args.networks, args.deterministic_addresses)
                    .await?;
                let archive = artifacts::zip_artifacts(&self.project_root)?;
                artifacts::send_artifacts(self.api.as_ref(), &archive, deployment.id).await?;
                deployment
            }
        };

        let targets = select_targets(&deployment, args.chain_deployment_id)?;
        let mut outcome = DeploymentOutcome::new(deployment.id);
        for chain_deployment in targets {
            let status = if self.run_chain_deployment(chain_deployment).await {
                outcome.successful_chains.push(chain_deployment.chain_id);
                DeploymentStatus::Finished
            } else {
                outcome.failed_chains.push(chain_deployment.chain_id);
                DeploymentStatus::Failed
            };
            self.report_status(chain_deployment, status).await;
        }

        Ok(outcome)
    }

    async fn resume_deployment(&self, deployment_id: u64) -> anyhow::Result<Deployment> {
        let deployment = self
            .api
            .get_deployment(deployment_id)
            .await
            .with_context(|| msg_fetch_deployment_failed(deployment_id))?;

        match deployment.status {
            Some(status) if status.is_resumable() => {
                logger::info(msg_resuming_deployment(deployment_id));
                Ok(deployment)
            }
            status => anyhow::bail!(msg_deployment_not_resumable(deployment_id, status)),
        }
    }

    async fn create_deployment(
        &self,
        networks: &[String],
        deterministic_addresses: bool,
    ) -> anyhow::Result<Deployment> {
        let chain_ids = self.resolve_chains(networks).await?;
        let package = PackageJson::read(self.shell, &self.project_root)?;

        let request = NewDeployment {
            chains: chain_ids
                .iter()
                .map(|&chain_id| ChainRef { chain_id })
                .collect(),
            framework: Framework::Hardhat,
            container_image: package.node_version().container_image(),
            is_cli: true,
            deterministic_addresses,
        };
        if self.verbose {
            logger::debug(msg_deployment_request(&request));
        }

        let deployment = self
            .api
            .create_deployment(&request)
            .await
            .context(MSG_CREATE_DEPLOYMENT_FAILED)?;
        logger::success(msg_deployment_created(deployment.id));
        Ok(deployment)
    }

    /// Maps aliases to chain ids, failing on the first unknown alias or unavailable
    /// chain. Repeated chains are deployed once.
    async fn resolve_chains(&self, networks: &[String]) -> anyhow::Result<Vec<u64>> {
        let resolved = self.registry.aliases_to_chain_ids(networks).await;

        let mut chain_ids = Vec::with_capacity(resolved.len());
        for (alias, chain_id) in networks.iter().zip(resolved) {
            let Some(chain_id) = chain_id else {
                logger::note(
                    MSG_SUPPORTED_CHAINS,
                    self.registry.supported_chains_help().await,
                );
                anyhow::bail!(msg_unsupported_network(alias));
            };
            if !chain_ids.contains(&chain_id) {
                chain_ids.push(chain_id);
            }
        }

        for &chain_id in &chain_ids {
            if !self.registry.is_chain_available(chain_id).await {
                anyhow::bail!(msg_chain_unavailable(chain_id));
            }
        }
        Ok(chain_ids)
    }

    /// Returns whether the deploy script exited with 0.
    async fn run_chain_deployment(&self, chain_deployment: &ChainDeployment) -> bool {
        let id = chain_deployment.id.to_string();
        let chain_id = chain_deployment.chain_id;

        let dotenv = self.project_root.join(DOTENV_FILE);
        if let Err(err) = env_file::write_var(self.shell, &dotenv, CHAIN_DEPLOYMENT_ID_VAR, &id) {
            logger::warn(msg_dotenv_update_failed(&dotenv, &err));
        }

        let command_line = self.script.command_line(chain_id);
        logger::step(msg_deploying_chain(chain_id, chain_deployment.id));
        self.events.submit(EventPayload::deployment_script_started(
            chain_deployment.id,
            &command_line,
        ));

        let _dir = self.shell.push_dir(&self.project_root);
        let program = &self.script.program;
        let args = self.script.args_for(chain_id);
        let started = Instant::now();
        let output = Cmd::new(cmd!(self.shell, "{program} {args...}"))
            .env(CHAIN_DEPLOYMENT_ID_VAR, &id)
            .env(BASE_RPC_URL_VAR, &self.base_rpc_url)
            .with_verbose(self.verbose)
            .run_streamed()
            .await;
        let elapsed = started.elapsed();

        self.events.submit(EventPayload::deployment_script_ended(
            chain_deployment.id,
            &output,
            elapsed,
        ));

        if output.success() {
            logger::success(msg_chain_deployed(chain_id, elapsed));
        } else {
            logger::error(msg_chain_deploy_failed(chain_id, output.exit_code));
        }
        output.success()
    }

    /// Status update failures never abort the run. They are journaled for `fix`
    /// unless the backend already is past the requested state.
    async fn report_status(&self, chain_deployment: &ChainDeployment, status: DeploymentStatus) {
        let err = match self
            .api
            .update_chain_deployment_status(chain_deployment.id, status)
            .await
        {
            Ok(()) => return,
            Err(err) if err.is_transition_not_applicable() => {
                if self.verbose {
                    logger::debug(msg_status_already_applied(chain_deployment.id, &err));
                }
                return;
            }
            Err(err) => err,
        };

        logger::warn(msg_status_update_failed(chain_deployment.id, status, &err));
        let record = FailedStatusRecord {
            chain_deployment_id: chain_deployment.id,
            status,
        };
        match self.journal.append(record) {
            Ok(()) => logger::warn(msg_status_journaled(self.journal.path())),
            Err(err) => logger::error(msg_journal_write_failed(record, &err)),
        }
    }
}

fn select_targets(
    deployment: &Deployment,
    chain_deployment_id: Option<u64>,
) -> anyhow::Result<Vec<&ChainDeployment>> {
    let targets: Vec<&ChainDeployment> = deployment
        .chain_deployments
        .iter()
        .filter(|chain_deployment| chain_deployment_id.map_or(true, |id| chain_deployment.id == id))
        .collect();

    if targets.is_empty() {
        match chain_deployment_id {
            Some(id) => anyhow::bail!(msg_chain_deployment_not_found(id, deployment.id)),
            None => anyhow::bail!(msg_no_chain_deployments(deployment.id)),
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyflow_cli_types::ChainEntry;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    use super::*;
    use crate::api::{testonly::FakeBackend, ApiError};

    struct Fixture {
        project: TempDir,
        shell: Shell,
        backend: Arc<FakeBackend>,
        registry: ChainRegistry,
        events: EventDispatcher,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_backend(FakeBackend::with_chains(vec![
                ChainEntry {
                    chain_id: 11_155_111,
                    name: "Sepolia".into(),
                    aliases: vec!["sepolia".into()],
                    is_available: true,
                },
                ChainEntry {
                    chain_id: 97,
                    name: "BSC Testnet".into(),
                    aliases: vec!["bsc-testnet".into()],
                    is_available: true,
                },
                ChainEntry {
                    chain_id: 4_002,
                    name: "Fantom Testnet".into(),
                    aliases: vec!["fantom-testnet".into()],
                    is_available: false,
                },
            ]))
        }

        fn with_backend(backend: FakeBackend) -> Self {
            let project = tempfile::tempdir().unwrap();
            fs::write(
                project.path().join("package.json"),
                r#"{"engines": {"node": "18.x"}, "devDependencies": {"anyflow-sdk": "1.0.0"}}"#,
            )
            .unwrap();
            fs::create_dir_all(project.path().join("artifacts/contracts")).unwrap();
            fs::write(project.path().join("artifacts/contracts/A.json"), "{}").unwrap();

            let backend = Arc::new(backend);

            Self {
                project,
                shell: Shell::new().unwrap(),
                registry: ChainRegistry::new(backend.clone()),
                events: EventDispatcher::new(backend.clone(), true, false),
                backend,
            }
        }

        /// Script that exits with 1 for the listed chain ids and 0 otherwise.
        fn script(failing_chains: &[u64]) -> DeployScript {
            let failing = failing_chains
                .iter()
                .map(|id| format!("[ \"$1\" = \"{id}\" ] && exit 1;"))
                .collect::<String>();
            DeployScript::new(
                "sh",
                [
                    "-c".to_owned(),
                    format!("echo deploying $1 $ANYFLOW_CHAIN_DEPLOYMENT_ID $ANYFLOW_BASE_RPC_URL; {failing} exit 0"),
                    "deploy".to_owned(),
                    CHAIN_ID_PLACEHOLDER.to_owned(),
                ],
            )
        }

        fn orchestrator(&self, script: DeployScript) -> Orchestrator<'_> {
            Orchestrator {
                shell: &self.shell,
                api: self.backend.clone(),
                registry: &self.registry,
                events: &self.events,
                journal: RecoveryJournal::in_dir(self.project.path()),
                project_root: self.project.path().to_path_buf(),
                base_rpc_url: "https://rpc.anyflow.pro".to_owned(),
                script,
                verbose: false,
            }
        }

        fn journal(&self) -> Vec<FailedStatusRecord> {
            RecoveryJournal::in_dir(self.project.path())
                .records()
                .unwrap()
        }
    }

    fn deploy_to(networks: &[&str]) -> DeployArgs {
        DeployArgs {
            networks: networks.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn default_script_targets_the_chain() {
        assert_eq!(
            DeployScript::default().command_line(97),
            "npm run deploy -- --network 97"
        );
    }

    #[tokio::test]
    async fn single_chain_success() {
        let fixture = Fixture::new();

        let outcome = fixture
            .orchestrator(Fixture::script(&[]))
            .deploy(&deploy_to(&["sepolia"]))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.successful_chains, vec![11_155_111]);
        assert!(outcome.failed_chains.is_empty());

        let created = fixture.backend.created.lock().unwrap().clone();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].container_image, "anyflow-node-18");
        assert!(created[0].is_cli);

        assert_eq!(
            fixture.backend.status_updates(),
            vec![(101, DeploymentStatus::Finished)]
        );
        assert_eq!(fixture.backend.uploads.lock().unwrap().len(), 1);
        assert!(!fixture.project.path().join("artifact.zip").exists());

        let dotenv = fs::read_to_string(fixture.project.path().join(".env")).unwrap();
        assert!(dotenv.contains("ANYFLOW_CHAIN_DEPLOYMENT_ID=101"));
        assert!(fixture.journal().is_empty());
    }

    #[tokio::test]
    async fn script_sees_base_rpc_url_verbatim() {
        let fixture = Fixture::new();
        let script = DeployScript::new(
            "sh",
            [
                "-c",
                "printf %s \"$ANYFLOW_BASE_RPC_URL/rpc-proxy/$ANYFLOW_CHAIN_DEPLOYMENT_ID/$1\" > rpc_url.txt",
                "deploy",
                CHAIN_ID_PLACEHOLDER,
            ],
        );

        let outcome = fixture
            .orchestrator(script)
            .deploy(&deploy_to(&["97"]))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(
            fs::read_to_string(fixture.project.path().join("rpc_url.txt")).unwrap(),
            "https://rpc.anyflow.pro/rpc-proxy/101/97"
        );
    }

    #[tokio::test]
    async fn offline_registry_is_fetched_once_per_run() {
        let fixture = Fixture::with_backend(FakeBackend::offline());

        let outcome = fixture
            .orchestrator(Fixture::script(&[]))
            .deploy(&deploy_to(&["300", "97", "51"]))
            .await
            .unwrap();

        assert_eq!(outcome.successful_chains, vec![300, 97, 51]);
        assert_eq!(*fixture.backend.chain_fetches.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_alias_fails_before_creating_anything() {
        let fixture = Fixture::new();

        let err = fixture
            .orchestrator(Fixture::script(&[]))
            .deploy(&deploy_to(&["sepolia", "bogus-alias", "also-bogus"]))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("bogus-alias"));
        assert!(!err.to_string().contains("also-bogus"));
        assert!(fixture.backend.created.lock().unwrap().is_empty());
        assert!(fixture.backend.status_updates().is_empty());
        assert!(!fixture.project.path().join(".env").exists());
    }

    #[tokio::test]
    async fn unavailable_chain_is_rejected() {
        let fixture = Fixture::new();

        let err = fixture
            .orchestrator(Fixture::script(&[]))
            .deploy(&deploy_to(&["fantom-testnet"]))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("4002"));
        assert!(fixture.backend.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failing_chain_does_not_stop_the_others() {
        let fixture = Fixture::new();

        let outcome = fixture
            .orchestrator(Fixture::script(&[11_155_111]))
            .deploy(&deploy_to(&["sepolia", "bsc-testnet"]))
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.successful_chains, vec![97]);
        assert_eq!(outcome.failed_chains, vec![11_155_111]);
        assert_eq!(
            fixture.backend.status_updates(),
            vec![
                (101, DeploymentStatus::Failed),
                (102, DeploymentStatus::Finished)
            ]
        );
        assert!(fixture.journal().is_empty());
    }

    #[tokio::test]
    async fn failed_status_update_is_journaled() {
        let fixture = Fixture::new();
        fixture.backend.fail_status_updates(vec![
            Some(ApiError::Status {
                status: 500,
                message: "boom".into(),
            }),
            Some(ApiError::TransitionNotApplicable("already finished".into())),
        ]);

        let outcome = fixture
            .orchestrator(Fixture::script(&[]))
            .deploy(&deploy_to(&["sepolia", "bsc-testnet"]))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(
            fixture.journal(),
            vec![FailedStatusRecord {
                chain_deployment_id: 101,
                status: DeploymentStatus::Finished,
            }]
        );
    }

    #[tokio::test]
    async fn resumed_deployment_runs_selected_chain_only() {
        let fixture = Fixture::new();
        fixture.backend.insert_deployment(Deployment {
            id: 9,
            status: Some(DeploymentStatus::Deploying),
            chain_deployments: vec![
                ChainDeployment {
                    id: 90,
                    chain_id: 11_155_111,
                    status: Some(DeploymentStatus::Finished),
                },
                ChainDeployment {
                    id: 91,
                    chain_id: 97,
                    status: Some(DeploymentStatus::Pending),
                },
            ],
        });
        let args = DeployArgs {
            networks: vec!["sepolia".into()],
            deployment_id: Some(9),
            chain_deployment_id: Some(91),
            ..Default::default()
        };

        let outcome = fixture
            .orchestrator(Fixture::script(&[]))
            .deploy(&args)
            .await
            .unwrap();

        assert_eq!(outcome.deployment_id, 9);
        assert_eq!(outcome.successful_chains, vec![97]);
        assert!(fixture.backend.created.lock().unwrap().is_empty());
        assert!(fixture.backend.uploads.lock().unwrap().is_empty());
        assert_eq!(
            fixture.backend.status_updates(),
            vec![(91, DeploymentStatus::Finished)]
        );
    }

    #[tokio::test]
    async fn finished_deployment_cannot_be_resumed() {
        let fixture = Fixture::new();
        fixture.backend.insert_deployment(Deployment {
            id: 3,
            status: Some(DeploymentStatus::Finished),
            chain_deployments: vec![],
        });
        let args = DeployArgs {
            networks: vec!["sepolia".into()],
            deployment_id: Some(3),
            ..Default::default()
        };

        let err = fixture
            .orchestrator(Fixture::script(&[]))
            .deploy(&args)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("finished"));
        assert!(fixture.backend.status_updates().is_empty());
    }

    #[tokio::test]
    async fn unknown_chain_deployment_id_is_fatal() {
        let fixture = Fixture::new();
        let args = DeployArgs {
            networks: vec!["sepolia".into()],
            chain_deployment_id: Some(12345),
            ..Default::default()
        };

        let err = fixture
            .orchestrator(Fixture::script(&[]))
            .deploy(&args)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("12345"));
        assert!(fixture.backend.status_updates().is_empty());
    }

    #[tokio::test]
    async fn missing_artifacts_stop_the_run() {
        let fixture = Fixture::new();
        fs::remove_dir_all(fixture.project.path().join("artifacts")).unwrap();

        let err = fixture
            .orchestrator(Fixture::script(&[]))
            .deploy(&deploy_to(&["sepolia"]))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("compile"));
        assert!(fixture.backend.status_updates().is_empty());
    }

    #[test]
    fn deployment_without_chains_is_rejected() {
        let deployment = Deployment {
            id: 1,
            status: None,
            chain_deployments: vec![],
        };
        assert_matches!(select_targets(&deployment, None), Err(_));
    }
}
