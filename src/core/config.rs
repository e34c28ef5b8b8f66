//! Configuration structures and types for dist-publisher
//!
//! This module provides type-safe configuration management with serde support.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default build command
pub const DEFAULT_BUILD_COMMAND: &[&str] = &["python", "-m", "build"];

/// Default artifact directory, relative to the project root
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Repository used when none is named
pub const DEFAULT_REPOSITORY: &str = "pypi";

/// Upload endpoint of the default repository
pub const DEFAULT_REPOSITORY_URL: &str = "https://upload.pypi.org/legacy/";

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishConfig {
    /// Schema version (required)
    pub version: String,

    /// Extend from base configuration file (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Project settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectConfig>,

    /// Build settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,

    /// Named upload targets
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub repositories: BTreeMap<String, RepositoryConfig>,

    /// Stored credentials, keyed by repository name
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        rename = "httpBasic"
    )]
    pub http_basic: BTreeMap<String, HttpBasicConfig>,

    /// Publish options (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishOptionsConfig>,

    /// Security settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,
}

/// Project settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Directory holding built artifacts (default: "dist")
    #[serde(skip_serializing_if = "Option::is_none", rename = "distDir")]
    pub dist_dir: Option<String>,
}

/// Build settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    /// Program and arguments, run from the project root
    pub command: Vec<String>,
}

/// Repository type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    #[default]
    Http,
    Local,
}

/// Repository configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryConfig {
    /// Upload URL (http) or target directory (local)
    pub url: String,

    #[serde(default, rename = "type")]
    pub repository_type: RepositoryType,

    /// CA certificate for this repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,

    /// Client certificate for this repository
    #[serde(skip_serializing_if = "Option::is_none", rename = "clientCert")]
    pub client_cert: Option<String>,
}

/// Stored HTTP basic credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HttpBasicConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Publish options configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishOptionsConfig {
    /// Interactive mode (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive: Option<bool>,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityConfig {
    /// Environment variable expansion settings
    #[serde(skip_serializing_if = "Option::is_none", rename = "envVarExpansion")]
    pub env_var_expansion: Option<EnvVarExpansionConfig>,
}

/// Environment variable expansion configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvVarExpansionConfig {
    /// Enable environment variable expansion (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Allowed environment variable prefixes (default: all)
    #[serde(skip_serializing_if = "Option::is_none", rename = "allowedPrefixes")]
    pub allowed_prefixes: Option<Vec<String>>,
}

impl PublishConfig {
    /// A layer that leaves `publish` and `security` of lower layers untouched
    pub fn layer() -> Self {
        Self {
            publish: None,
            security: None,
            ..Default::default()
        }
    }

    /// CLI layer for `--no-interaction`; `None` when the flag is off
    pub fn cli_layer(no_interaction: bool) -> Option<Self> {
        no_interaction.then(|| Self {
            publish: Some(PublishOptionsConfig {
                interactive: Some(false),
            }),
            ..Self::layer()
        })
    }

    /// Build command, falling back to the default
    pub fn build_command(&self) -> Vec<String> {
        self.build
            .as_ref()
            .map(|b| b.command.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_BUILD_COMMAND.iter().map(|s| s.to_string()).collect())
    }

    /// Artifact directory, falling back to the default
    pub fn dist_dir(&self) -> &str {
        self.project
            .as_ref()
            .and_then(|p| p.dist_dir.as_deref())
            .unwrap_or(DEFAULT_DIST_DIR)
    }

    /// Whether prompts may ask the user (default: true)
    pub fn is_interactive(&self) -> bool {
        self.publish
            .as_ref()
            .and_then(|p| p.interactive)
            .unwrap_or(true)
    }
}

/// Default configuration values
impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            extends: None,
            project: None,
            build: None,
            repositories: BTreeMap::new(),
            http_basic: BTreeMap::new(),
            publish: Some(PublishOptionsConfig::default()),
            security: Some(SecurityConfig::default()),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            env_var_expansion: Some(EnvVarExpansionConfig {
                enabled: Some(true),
                allowed_prefixes: None,
            }),
        }
    }
}

impl Default for PublishOptionsConfig {
    fn default() -> Self {
        Self {
            interactive: Some(true),
        }
    }
}
