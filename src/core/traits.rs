//! Core traits and types for publishing
//!
//! This module defines the collaborators the publish command drives:
//! a [`Builder`] that produces artifacts, a [`Publisher`] that lists and uploads
//! them, a [`RepositoryRegistry`] that knows configured repositories, and a
//! [`Prompt`] for interactive confirmation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};

// ============================================================================
// Credentials
// ============================================================================

/// Username/password pair used to authenticate against a repository
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: Option<String>, password: Option<SecretString>) -> Self {
        Self { username, password }
    }

    /// True when neither a username nor a non-empty password is present
    pub fn is_empty(&self) -> bool {
        let no_username = self.username.as_deref().is_none_or(str::is_empty);
        let no_password = self
            .password
            .as_ref()
            .is_none_or(|p| p.expose_secret().is_empty());
        no_username && no_password
    }
}

// ============================================================================
// Repositories
// ============================================================================

/// How a repository receives artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    /// Upload endpoint reached over HTTP(S)
    Http,
    /// Directory on the local filesystem
    Local,
}

/// Authentication capability of a repository entry
///
/// `Unsupported` means the entry cannot carry credentials at all, which is a
/// different condition from `Supported(None)` (nothing stored yet).
#[derive(Debug, Clone)]
pub enum AuthCapability {
    Unsupported,
    Supported(Option<Credentials>),
}

/// A named, pre-configured upload target
#[derive(Debug, Clone)]
pub struct RepositoryEntry {
    pub name: String,
    pub url: String,
    pub kind: RepositoryKind,
    pub auth: AuthCapability,
    pub cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
}

impl RepositoryEntry {
    /// Stored credentials, if the entry supports auth and has some
    pub fn stored_credentials(&self) -> Option<&Credentials> {
        match &self.auth {
            AuthCapability::Supported(Some(credentials)) if !credentials.is_empty() => {
                Some(credentials)
            }
            _ => None,
        }
    }
}

/// Maps repository names to their configuration
pub trait RepositoryRegistry: Send + Sync {
    /// Look up a repository by name; `None` when it is unknown
    fn lookup(&self, name: &str) -> Option<RepositoryEntry>;
}

// ============================================================================
// Artifacts
// ============================================================================

/// Ordered set of publishable files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    files: Vec<PathBuf>,
}

impl ArtifactSet {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }
}

// ============================================================================
// Publishing
// ============================================================================

/// Parameters handed to [`Publisher::publish`]
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    /// Target repository; `None` selects the publisher's default
    pub repository_name: Option<String>,
    pub credentials: Credentials,
    /// CA certificate used to verify the repository
    pub cert: Option<PathBuf>,
    /// Client certificate presented to the repository
    pub client_cert: Option<PathBuf>,
    pub dry_run: bool,
}

/// Produces fresh artifacts
#[async_trait]
pub trait Builder: Send + Sync {
    async fn build(&self) -> anyhow::Result<()>;
}

/// Lists and uploads artifacts
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Artifacts currently available for publishing
    ///
    /// Must not have side effects; it is called both before and after a build.
    async fn list_artifacts(&self) -> anyhow::Result<ArtifactSet>;

    /// Upload every artifact to the requested repository
    ///
    /// With `dry_run` set, inputs are validated but nothing is transmitted.
    async fn publish(&self, request: &PublishRequest) -> anyhow::Result<()>;
}

/// Asks the user a yes/no question
#[async_trait]
pub trait Prompt: Send + Sync {
    async fn confirm(&self, question: &str, default: bool) -> anyhow::Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn test_credentials_default_is_empty() {
        assert!(Credentials::default().is_empty());
    }

    #[test]
    fn test_credentials_with_username_only() {
        let credentials = Credentials::new(Some("alice".to_string()), None);
        assert!(!credentials.is_empty());
    }

    #[test]
    fn test_credentials_with_blank_values_are_empty() {
        let credentials = Credentials::new(Some(String::new()), Some(secret("")));
        assert!(credentials.is_empty());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials::new(Some("alice".to_string()), Some(secret("hunter2")));
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_stored_credentials() {
        let mut entry = RepositoryEntry {
            name: "internal".to_string(),
            url: "https://pkgs.example.com/legacy/".to_string(),
            kind: RepositoryKind::Http,
            auth: AuthCapability::Supported(Some(Credentials::new(
                Some("a".to_string()),
                Some(secret("b")),
            ))),
            cert: None,
            client_cert: None,
        };
        assert!(entry.stored_credentials().is_some());

        entry.auth = AuthCapability::Supported(Some(Credentials::default()));
        assert!(entry.stored_credentials().is_none());

        entry.auth = AuthCapability::Unsupported;
        assert!(entry.stored_credentials().is_none());
    }

    #[test]
    fn test_artifact_set() {
        let set = ArtifactSet::new(vec![
            PathBuf::from("dist/demo-1.0.0-py3-none-any.whl"),
            PathBuf::from("dist/demo-1.0.0.tar.gz"),
        ]);

        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert!(ArtifactSet::default().is_empty());
        assert_eq!(
            set.iter().next(),
            Some(Path::new("dist/demo-1.0.0-py3-none-any.whl"))
        );
    }
}
