//! Masking of known secrets in user-facing text
//!
//! Passwords travel as [`SecretString`]; whenever a message from a collaborator
//! is surfaced to the user it first goes through a [`SecretMasker`] that knows
//! the secrets of the current invocation.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

/// Masks registered secrets in arbitrary strings
///
/// # Examples
///
/// ```
/// use dist_publisher::security::SecretMasker;
/// use secrecy::SecretString;
///
/// let mut masker = SecretMasker::new();
/// masker.register(&SecretString::from("pypi-AgEIcHlwaS5vcmc"));
/// assert_eq!(
///     masker.mask_in_string("403 for pypi-AgEIcHlwaS5vcmc"),
///     "403 for pyp...cmc"
/// );
/// ```
#[derive(Default)]
pub struct SecretMasker {
    secrets: Vec<SecretString>,
}

impl SecretMasker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a secret; empty secrets are ignored
    pub fn register(&mut self, secret: &SecretString) {
        if !secret.expose_secret().is_empty() {
            self.secrets.push(secret.clone());
        }
    }

    /// Masks a secret for safe display
    ///
    /// Shows only the first 3 and last 3 characters.
    /// Secrets shorter than 10 characters are fully masked as "****".
    pub fn mask(secret: &str) -> String {
        if secret.chars().count() < 10 {
            return "****".to_string();
        }

        let prefix: String = secret.chars().take(3).collect();
        let suffix: String = secret
            .chars()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Masks all registered secrets in a string
    pub fn mask_in_string(&self, text: &str) -> String {
        let mut masked = text.to_string();

        for secret in &self.secrets {
            let secret = secret.expose_secret();
            if let Ok(regex) = Regex::new(&regex::escape(secret)) {
                let replacement = Self::mask(secret);
                masked = regex
                    .replace_all(&masked, regex::NoExpand(&replacement))
                    .into_owned();
            }
        }

        masked
    }
}
