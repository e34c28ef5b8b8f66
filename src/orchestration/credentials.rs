//! Credential resolution for a publish run
//!
//! Explicit credentials always win as a whole: if either a username or a
//! password was given, the registry is not consulted and the two values are
//! never mixed with stored ones.

use crate::core::error::PublishError;
use crate::core::traits::{AuthCapability, Credentials, RepositoryRegistry};

/// Outcome of looking up stored credentials for a repository
#[derive(Debug, Clone)]
pub enum CredentialLookup {
    /// No repository with that name
    NotFound,
    /// The repository exists but cannot carry credentials
    NoAuthCapability,
    /// The repository supports auth; credentials may still be empty
    Resolved(Credentials),
}

/// Look up the stored credentials of `name`
pub fn lookup_credentials(registry: &dyn RepositoryRegistry, name: &str) -> CredentialLookup {
    let Some(entry) = registry.lookup(name) else {
        return CredentialLookup::NotFound;
    };

    match entry.auth {
        AuthCapability::Unsupported => CredentialLookup::NoAuthCapability,
        AuthCapability::Supported(stored) => {
            CredentialLookup::Resolved(stored.filter(|c| !c.is_empty()).unwrap_or_default())
        }
    }
}

/// Check whether the registry has to be consulted at all
///
/// Blank values count as absent, so `--username ""` still falls back and
/// `--repository ""` names no repository.
pub fn needs_lookup(repository_name: Option<&str>, explicit: &Credentials) -> bool {
    repository_name.is_some_and(|name| !name.is_empty()) && explicit.is_empty()
}

/// Resolve the credentials to publish with
///
/// Returns the explicit credentials untouched unless a repository is named
/// and neither a username nor a password was supplied.
pub fn resolve_credentials(
    registry: &dyn RepositoryRegistry,
    repository_name: Option<&str>,
    explicit: Credentials,
) -> Result<Credentials, PublishError> {
    let Some(name) = repository_name.filter(|_| needs_lookup(repository_name, &explicit)) else {
        return Ok(explicit);
    };

    match lookup_credentials(registry, name) {
        CredentialLookup::NotFound => Err(PublishError::RepositoryNotFound {
            name: name.to_string(),
        }),
        CredentialLookup::NoAuthCapability => Err(PublishError::CredentialsUnavailable {
            name: name.to_string(),
        }),
        CredentialLookup::Resolved(credentials) => {
            if credentials.is_empty() {
                tracing::info!(repository = name, "no stored credentials, publishing without auth");
            } else {
                tracing::debug!(repository = name, "using stored credentials");
            }
            Ok(credentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{RepositoryEntry, RepositoryKind};
    use secrecy::{ExposeSecret, SecretString};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapRegistry {
        entries: HashMap<String, AuthCapability>,
        lookups: Mutex<Vec<String>>,
    }

    impl MapRegistry {
        fn with(mut self, name: &str, auth: AuthCapability) -> Self {
            self.entries.insert(name.to_string(), auth);
            self
        }

        fn lookups(&self) -> Vec<String> {
            self.lookups.lock().unwrap().clone()
        }
    }

    impl RepositoryRegistry for MapRegistry {
        fn lookup(&self, name: &str) -> Option<RepositoryEntry> {
            self.lookups.lock().unwrap().push(name.to_string());
            self.entries.get(name).map(|auth| RepositoryEntry {
                name: name.to_string(),
                url: format!("https://{}.example.com/", name),
                kind: RepositoryKind::Http,
                auth: auth.clone(),
                cert: None,
                client_cert: None,
            })
        }
    }

    fn stored(username: &str, password: &str) -> AuthCapability {
        AuthCapability::Supported(Some(Credentials::new(
            Some(username.to_string()),
            Some(SecretString::from(password)),
        )))
    }

    #[test]
    fn test_lookup_variants() {
        let registry = MapRegistry::default()
            .with("bar", stored("a", "b"))
            .with("local", AuthCapability::Unsupported)
            .with("anon", AuthCapability::Supported(None));

        assert!(matches!(
            lookup_credentials(&registry, "foo"),
            CredentialLookup::NotFound
        ));
        assert!(matches!(
            lookup_credentials(&registry, "local"),
            CredentialLookup::NoAuthCapability
        ));
        assert!(matches!(
            lookup_credentials(&registry, "anon"),
            CredentialLookup::Resolved(c) if c.is_empty()
        ));
        assert!(matches!(
            lookup_credentials(&registry, "bar"),
            CredentialLookup::Resolved(c) if c.username.as_deref() == Some("a")
        ));
    }

    #[test]
    fn test_needs_lookup() {
        let empty = Credentials::default();
        let user_only = Credentials::new(Some("u".to_string()), None);
        let password_only = Credentials::new(None, Some(SecretString::from("p")));

        assert!(needs_lookup(Some("bar"), &empty));
        assert!(!needs_lookup(None, &empty));
        assert!(!needs_lookup(Some("bar"), &user_only));
        assert!(!needs_lookup(Some("bar"), &password_only));

        let blank = Credentials::new(Some(String::new()), None);
        assert!(needs_lookup(Some("bar"), &blank));
    }

    #[test]
    fn test_blank_repository_name_skips_lookup() {
        let registry = MapRegistry::default();

        assert!(!needs_lookup(Some(""), &Credentials::default()));

        let resolved = resolve_credentials(&registry, Some(""), Credentials::default()).unwrap();

        assert!(resolved.is_empty());
        assert!(registry.lookups().is_empty());
    }

    #[test]
    fn test_explicit_username_is_not_merged_with_stored_password() {
        let registry = MapRegistry::default().with("bar", stored("a", "b"));
        let explicit = Credentials::new(Some("me".to_string()), None);

        let resolved = resolve_credentials(&registry, Some("bar"), explicit).unwrap();

        assert_eq!(resolved.username.as_deref(), Some("me"));
        assert!(resolved.password.is_none());
        assert!(registry.lookups().is_empty());
    }

    #[test]
    fn test_resolve_from_registry() {
        let registry = MapRegistry::default().with("bar", stored("a", "b"));

        let resolved = resolve_credentials(&registry, Some("bar"), Credentials::default()).unwrap();

        assert_eq!(resolved.username.as_deref(), Some("a"));
        assert_eq!(
            resolved.password.as_ref().map(|p| p.expose_secret()),
            Some("b")
        );
    }

    #[test]
    fn test_resolve_empty_stored_record_is_not_an_error() {
        let registry = MapRegistry::default().with(
            "bar",
            AuthCapability::Supported(Some(Credentials::default())),
        );

        let resolved = resolve_credentials(&registry, Some("bar"), Credentials::default()).unwrap();

        assert!(resolved.is_empty());
    }

    #[test]
    fn test_resolve_errors_are_distinct() {
        let registry = MapRegistry::default().with("local", AuthCapability::Unsupported);

        let not_found = resolve_credentials(&registry, Some("foo"), Credentials::default());
        let unavailable = resolve_credentials(&registry, Some("local"), Credentials::default());

        assert!(matches!(
            not_found,
            Err(PublishError::RepositoryNotFound { name }) if name == "foo"
        ));
        assert!(matches!(
            unavailable,
            Err(PublishError::CredentialsUnavailable { name }) if name == "local"
        ));
    }

    #[test]
    fn test_resolve_without_repository_skips_lookup() {
        let registry = MapRegistry::default();

        let resolved = resolve_credentials(&registry, None, Credentials::default()).unwrap();

        assert!(resolved.is_empty());
        assert!(registry.lookups().is_empty());
    }
}
