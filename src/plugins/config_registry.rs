//! Repository registry backed by `.publish-config.yaml`
//!
//! `http` repositories can carry stored credentials from `httpBasic`;
//! `local` repositories are plain directories and have no auth capability.

use crate::core::config::{PublishConfig, RepositoryConfig, RepositoryType};
pub use crate::core::config::{DEFAULT_REPOSITORY, DEFAULT_REPOSITORY_URL};
use crate::core::traits::{
    AuthCapability, Credentials, RepositoryEntry, RepositoryKind, RepositoryRegistry,
};
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Registry of configured repositories
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    entries: BTreeMap<String, RepositoryEntry>,
}

impl ConfigRegistry {
    /// Build the registry from a loaded configuration
    ///
    /// The default repository is always present; a `repositories.pypi` entry
    /// overrides its URL and certificates.
    pub fn from_config(config: &PublishConfig) -> Self {
        let mut repositories = config.repositories.clone();
        repositories
            .entry(DEFAULT_REPOSITORY.to_string())
            .or_insert_with(|| RepositoryConfig {
                url: DEFAULT_REPOSITORY_URL.to_string(),
                repository_type: RepositoryType::Http,
                cert: None,
                client_cert: None,
            });

        let entries = repositories
            .into_iter()
            .map(|(name, repository)| {
                let entry = Self::entry(config, &name, repository);
                (name, entry)
            })
            .collect();

        Self { entries }
    }

    fn entry(config: &PublishConfig, name: &str, repository: RepositoryConfig) -> RepositoryEntry {
        let (kind, auth) = match repository.repository_type {
            RepositoryType::Http => {
                let stored = config.http_basic.get(name).map(|basic| {
                    Credentials::new(
                        basic.username.clone(),
                        basic.password.clone().map(SecretString::from),
                    )
                });
                (RepositoryKind::Http, AuthCapability::Supported(stored))
            }
            RepositoryType::Local => (RepositoryKind::Local, AuthCapability::Unsupported),
        };

        RepositoryEntry {
            name: name.to_string(),
            url: repository.url,
            kind,
            auth,
            cert: repository.cert.map(PathBuf::from),
            client_cert: repository.client_cert.map(PathBuf::from),
        }
    }

    /// All known repositories, sorted by name
    pub fn entries(&self) -> impl Iterator<Item = &RepositoryEntry> {
        self.entries.values()
    }
}

impl RepositoryRegistry for ConfigRegistry {
    fn lookup(&self, name: &str) -> Option<RepositoryEntry> {
        let entry = self.entries.get(name).cloned();
        tracing::debug!(repository = name, found = entry.is_some(), "repository lookup");
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HttpBasicConfig;
    use secrecy::ExposeSecret;

    fn config() -> PublishConfig {
        let mut config = PublishConfig::default();
        config.repositories.insert(
            "internal".to_string(),
            RepositoryConfig {
                url: "https://pkgs.example.com/legacy/".to_string(),
                repository_type: RepositoryType::Http,
                cert: Some("/etc/ssl/internal-ca.pem".to_string()),
                client_cert: None,
            },
        );
        config.repositories.insert(
            "mirror".to_string(),
            RepositoryConfig {
                url: "/srv/packages".to_string(),
                repository_type: RepositoryType::Local,
                cert: None,
                client_cert: None,
            },
        );
        config.repositories.insert(
            "anonymous".to_string(),
            RepositoryConfig {
                url: "https://open.example.com/".to_string(),
                repository_type: RepositoryType::Http,
                cert: None,
                client_cert: None,
            },
        );
        config.http_basic.insert(
            "internal".to_string(),
            HttpBasicConfig {
                username: Some("a".to_string()),
                password: Some("b".to_string()),
            },
        );
        config
    }

    #[test]
    fn test_default_repository_always_present() {
        let registry = ConfigRegistry::from_config(&PublishConfig::default());

        let entry = registry.lookup(DEFAULT_REPOSITORY).unwrap();
        assert_eq!(entry.url, DEFAULT_REPOSITORY_URL);
        assert_eq!(entry.kind, RepositoryKind::Http);
        assert!(matches!(entry.auth, AuthCapability::Supported(None)));
    }

    #[test]
    fn test_unknown_repository() {
        let registry = ConfigRegistry::from_config(&config());
        assert!(registry.lookup("foo").is_none());
    }

    #[test]
    fn test_http_repository_with_stored_credentials() {
        let registry = ConfigRegistry::from_config(&config());

        let entry = registry.lookup("internal").unwrap();
        let credentials = entry.stored_credentials().unwrap();
        assert_eq!(credentials.username.as_deref(), Some("a"));
        assert_eq!(
            credentials.password.as_ref().map(|p| p.expose_secret()),
            Some("b")
        );
        assert_eq!(entry.cert, Some(PathBuf::from("/etc/ssl/internal-ca.pem")));
    }

    #[test]
    fn test_http_repository_without_stored_credentials() {
        let registry = ConfigRegistry::from_config(&config());

        let entry = registry.lookup("anonymous").unwrap();
        assert!(matches!(entry.auth, AuthCapability::Supported(None)));
    }

    #[test]
    fn test_local_repository_has_no_auth_capability() {
        let registry = ConfigRegistry::from_config(&config());

        let entry = registry.lookup("mirror").unwrap();
        assert_eq!(entry.kind, RepositoryKind::Local);
        assert!(matches!(entry.auth, AuthCapability::Unsupported));
    }

    #[test]
    fn test_entries_sorted() {
        let registry = ConfigRegistry::from_config(&config());

        let names: Vec<_> = registry.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["anonymous", "internal", "mirror", "pypi"]);
    }
}
