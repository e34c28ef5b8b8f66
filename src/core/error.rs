//! Error handling for the publish command
//!
//! Every failure the orchestrator can surface is a variant of [`PublishError`].
//! None of them are retried; each one ends the invocation with a non-zero exit code.

use thiserror::Error;

/// Main error type for publish operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Confirmation
    #[error("Aborted!")]
    UserAborted,

    #[error("Failed to read confirmation: {message}")]
    PromptFailed { message: String },

    // Artifacts
    #[error("No files to publish. Run a build first or use the --build option.")]
    NoArtifacts,

    #[error("Failed to list artifacts: {message}")]
    ArtifactsUnreadable { message: String },

    // Credential resolution
    #[error("No repository named {name} found")]
    RepositoryNotFound { name: String },

    #[error("No credentials available for {name}")]
    CredentialsUnavailable { name: String },

    // Collaborator failures
    #[error("Build failed: {message}")]
    BuildFailed { message: String },

    #[error("[{repository}] Publishing failed: {message}")]
    PublishFailed { repository: String, message: String },

    // Configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PublishError {
    /// Check whether this error was caused by the user declining a prompt
    pub fn is_user_abort(&self) -> bool {
        matches!(self, Self::UserAborted)
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::UserAborted => vec![],
            Self::PromptFailed { .. } => {
                vec!["Re-run with --no-interaction in non-interactive environments"]
            }
            Self::NoArtifacts => vec![
                "Build the package first",
                "Pass --build to build before publishing",
            ],
            Self::ArtifactsUnreadable { .. } => {
                vec!["Check that the dist directory is readable"]
            }
            Self::RepositoryNotFound { .. } => vec![
                "Check the spelling of the repository name",
                "Add the repository under `repositories` in .publish-config.yaml",
            ],
            Self::CredentialsUnavailable { .. } => vec![
                "Check the repository type in .publish-config.yaml",
                "Pass --username/--password explicitly",
            ],
            Self::BuildFailed { .. } => vec![
                "Check the build output above",
                "Check `build.command` in .publish-config.yaml",
            ],
            Self::PublishFailed { .. } => vec![
                "Check the error message above",
                "Check your network connection and credentials",
                "Re-run with --dry-run to validate without uploading",
            ],
            Self::ConfigError(_) => vec!["Check .publish-config.yaml"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserAborted => "USER_ABORTED",
            Self::PromptFailed { .. } => "PROMPT_FAILED",
            Self::NoArtifacts => "NO_ARTIFACTS",
            Self::ArtifactsUnreadable { .. } => "ARTIFACTS_UNREADABLE",
            Self::RepositoryNotFound { .. } => "REPOSITORY_NOT_FOUND",
            Self::CredentialsUnavailable { .. } => "CREDENTIALS_UNAVAILABLE",
            Self::BuildFailed { .. } => "BUILD_FAILED",
            Self::PublishFailed { .. } => "PUBLISH_FAILED",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_aborted_error() {
        let error = PublishError::UserAborted;

        assert!(error.is_user_abort());
        assert_eq!(error.code(), "USER_ABORTED");
        assert_eq!(error.to_string(), "Aborted!");
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_no_artifacts_error() {
        let error = PublishError::NoArtifacts;

        assert!(!error.is_user_abort());
        assert_eq!(error.code(), "NO_ARTIFACTS");
        assert!(error.to_string().contains("--build"));
        assert!(error.suggested_actions().len() >= 2);
    }

    #[test]
    fn test_repository_not_found_error() {
        let error = PublishError::RepositoryNotFound {
            name: "foo".to_string(),
        };

        assert_eq!(error.code(), "REPOSITORY_NOT_FOUND");
        assert_eq!(error.to_string(), "No repository named foo found");
    }

    #[test]
    fn test_credentials_unavailable_is_distinct_from_not_found() {
        let unavailable = PublishError::CredentialsUnavailable {
            name: "bar".to_string(),
        };
        let not_found = PublishError::RepositoryNotFound {
            name: "bar".to_string(),
        };

        assert_ne!(unavailable.code(), not_found.code());
        assert_eq!(unavailable.to_string(), "No credentials available for bar");
    }

    #[test]
    fn test_publish_failed_error_with_message() {
        let error = PublishError::PublishFailed {
            repository: "pypi".to_string(),
            message: "Connection refused".to_string(),
        };

        assert_eq!(error.code(), "PUBLISH_FAILED");
        let error_msg = error.to_string();
        assert!(error_msg.contains("[pypi]"));
        assert!(error_msg.contains("Connection refused"));
    }

    #[test]
    fn test_build_failed_error() {
        let error = PublishError::BuildFailed {
            message: "exit status 2".to_string(),
        };

        assert_eq!(error.code(), "BUILD_FAILED");
        assert!(error
            .suggested_actions()
            .iter()
            .any(|a| a.contains("build.command")));
    }

    #[test]
    fn test_config_error_display() {
        let error = PublishError::ConfigError("bad yaml".to_string());

        let display = format!("{}", error);
        assert!(display.contains("bad yaml"));
        assert_eq!(error.code(), "CONFIG_ERROR");
    }
}
