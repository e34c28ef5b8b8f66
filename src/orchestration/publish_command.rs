//! Publish orchestrator - drives one `publish` invocation
//!
//! Sequence:
//! 1. Optional pre-build, confirming first when artifacts are already present
//! 2. Artifact presence check
//! 3. Credential resolution from the repository registry
//! 4. Delegated upload through the [`Publisher`]
//!
//! Every failure is terminal for the invocation; nothing is retried.

use super::credentials::{needs_lookup, resolve_credentials};
use crate::core::error::PublishError;
use crate::core::state_machine::{PublishState, PublishStateMachine};
use crate::core::traits::{
    ArtifactSet, Builder, Credentials, Prompt, PublishRequest, Publisher, RepositoryRegistry,
};
use crate::security::SecretMasker;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;

/// Label used in errors when no repository was named
const DEFAULT_REPOSITORY_LABEL: &str = "default repository";

/// Publishing options passed from the CLI
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Repository to publish to and to take stored credentials from
    pub repository_name: Option<String>,

    pub username: Option<String>,

    pub password: Option<SecretString>,

    /// CA certificate for the repository
    pub cert: Option<PathBuf>,

    /// Client certificate for the repository
    pub client_cert: Option<PathBuf>,

    /// Build before publishing
    pub build: bool,

    /// Perform all actions except the upload
    pub dry_run: bool,
}

/// Main publish orchestrator
pub struct PublishOrchestrator {
    builder: Arc<dyn Builder>,
    publisher: Arc<dyn Publisher>,
    registry: Arc<dyn RepositoryRegistry>,
    prompt: Arc<dyn Prompt>,
    state_machine: PublishStateMachine,
}

impl PublishOrchestrator {
    pub fn new(
        builder: Arc<dyn Builder>,
        publisher: Arc<dyn Publisher>,
        registry: Arc<dyn RepositoryRegistry>,
        prompt: Arc<dyn Prompt>,
    ) -> Self {
        Self {
            builder,
            publisher,
            registry,
            prompt,
            state_machine: PublishStateMachine::new(),
        }
    }

    /// State reached by the last run
    pub fn state(&self) -> PublishState {
        self.state_machine.get_state()
    }

    /// Transition history of the last run
    pub fn history(&self) -> String {
        self.state_machine.get_history()
    }

    /// Run the publish flow and report failures on stderr
    ///
    /// Returns the process exit code: 0 on success, non-zero otherwise.
    pub async fn run(&mut self, options: &PublishOptions) -> i32 {
        match self.execute(options).await {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("\n❌ {}", error);
                for action in error.suggested_actions() {
                    eprintln!("  - {}", action);
                }
                error.exit_code()
            }
        }
    }

    /// Run the publish flow
    pub async fn execute(&mut self, options: &PublishOptions) -> Result<(), PublishError> {
        self.state_machine = PublishStateMachine::new();

        let result = self.execute_steps(options).await;

        match &result {
            Ok(()) => {}
            Err(error) if error.is_user_abort() => {
                self.state_machine.transition(PublishState::Aborted);
            }
            Err(error) => {
                tracing::debug!(code = error.code(), "publish failed");
                self.state_machine.transition(PublishState::Failed);
            }
        }

        tracing::debug!(
            elapsed_ms = self.state_machine.get_elapsed_time(),
            state = ?self.state_machine.get_state(),
            "publish finished"
        );

        result
    }

    async fn execute_steps(&mut self, options: &PublishOptions) -> Result<(), PublishError> {
        // 1. Pre-build
        if options.build {
            self.prebuild().await?;
        }

        // 2. Artifact presence
        self.state_machine.transition(PublishState::CheckingArtifacts);
        let artifacts = self.list_artifacts().await?;
        if artifacts.is_empty() {
            return Err(PublishError::NoArtifacts);
        }
        tracing::debug!(count = artifacts.len(), "artifacts ready");

        println!();

        // 3. Credentials
        let repository_name = options
            .repository_name
            .as_deref()
            .filter(|name| !name.is_empty());
        let explicit = Credentials::new(options.username.clone(), options.password.clone());

        let credentials = if needs_lookup(repository_name, &explicit) {
            self.state_machine
                .transition(PublishState::ResolvingCredentials);
            resolve_credentials(self.registry.as_ref(), repository_name, explicit)?
        } else {
            explicit
        };

        let mut masker = SecretMasker::new();
        if let Some(password) = &credentials.password {
            masker.register(password);
        }

        // 4. Publish
        self.state_machine.transition(PublishState::Publishing);

        let request = PublishRequest {
            repository_name: repository_name.map(str::to_string),
            credentials,
            cert: options.cert.clone(),
            client_cert: options.client_cert.clone(),
            dry_run: options.dry_run,
        };

        self.publisher
            .publish(&request)
            .await
            .map_err(|e| PublishError::PublishFailed {
                repository: repository_name
                    .unwrap_or(DEFAULT_REPOSITORY_LABEL)
                    .to_string(),
                message: masker.mask_in_string(&format!("{:#}", e)),
            })?;

        self.state_machine.transition(PublishState::Done);
        Ok(())
    }

    /// Build, asking first when artifacts from an earlier build are present
    async fn prebuild(&mut self) -> Result<(), PublishError> {
        let leftovers = self.list_artifacts().await?;

        if !leftovers.is_empty() {
            self.state_machine
                .transition(PublishState::ConfirmingRebuild);

            let question = format!(
                "There are {} files ready for publishing. Build anyway?",
                leftovers.len()
            );
            let confirmed = self
                .prompt
                .confirm(&question, false)
                .await
                .map_err(|e| PublishError::PromptFailed {
                    message: e.to_string(),
                })?;

            if !confirmed {
                return Err(PublishError::UserAborted);
            }
        }

        self.state_machine.transition(PublishState::Building);
        self.builder
            .build()
            .await
            .map_err(|e| PublishError::BuildFailed {
                message: format!("{:#}", e),
            })
    }

    async fn list_artifacts(&self) -> Result<ArtifactSet, PublishError> {
        self.publisher
            .list_artifacts()
            .await
            .map_err(|e| PublishError::ArtifactsUnreadable {
                message: format!("{:#}", e),
            })
    }
}
