//! Configuration file loader for dist-publisher
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishError;
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;

/// Configuration file name
const CONFIG_FILENAME: &str = ".publish-config.yaml";

/// Environment variable pattern (${VAR_NAME})
static ENV_VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid")
});

/// Configuration load options
#[derive(Debug, Clone)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Home directory holding the global config (skipped when `None`)
    pub home_dir: Option<PathBuf>,

    /// Layer built from CLI flags (highest priority)
    pub cli_args: Option<PublishConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

impl ConfigLoadOptions {
    /// Options for the current process environment
    pub fn from_env<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            home_dir: env::var_os("HOME").map(PathBuf::from),
            cli_args: None,
            env: env::vars().collect(),
        }
    }
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    pub valid: bool,
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "repositories.internal.url")
    pub field: String,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Project config (./.publish-config.yaml)
    /// 4. Global config (~/.publish-config.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublishConfig, PublishError> {
        let mut configs: Vec<PublishConfig> = vec![PublishConfig::default()];

        if let Some(home_dir) = &options.home_dir
            && let Some(global_config) =
                Self::load_config_file(&home_dir.join(CONFIG_FILENAME), &mut Vec::new()).await?
        {
            tracing::debug!(home = %home_dir.display(), "loaded global config");
            configs.push(global_config);
        }

        let project_config_path = options.project_path.join(CONFIG_FILENAME);
        if let Some(project_config) =
            Self::load_config_file(&project_config_path, &mut Vec::new()).await?
        {
            tracing::debug!(path = %project_config_path.display(), "loaded project config");
            configs.push(project_config);
        }

        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let merged_config = Self::merge_configs(configs);

        Ok(Self::expand_env_vars(merged_config, &options.env))
    }

    /// Load configuration from YAML file, following `extends`
    ///
    /// `chain` holds the canonical paths already on the current `extends`
    /// chain; revisiting one is a `ConfigError`.
    fn load_config_file<'a>(
        file_path: &'a Path,
        chain: &'a mut Vec<PathBuf>,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<Option<PublishConfig>, PublishError>>
                + Send
                + 'a,
        >,
    > {
        Box::pin(async move {
            if !file_path.exists() {
                return Ok(None);
            }

            let canonical = fs::canonicalize(file_path).await.map_err(|e| {
                PublishError::ConfigError(format!(
                    "Failed to resolve {}: {}",
                    file_path.display(),
                    e
                ))
            })?;
            if chain.contains(&canonical) {
                return Err(PublishError::ConfigError(format!(
                    "Circular extends: {} is already extended by {}",
                    canonical.display(),
                    chain
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(" -> ")
                )));
            }
            chain.push(canonical);

            let content = fs::read_to_string(file_path).await.map_err(|e| {
                PublishError::ConfigError(format!(
                    "Failed to read {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            let config: PublishConfig = serde_yaml::from_str(&content).map_err(|e| {
                PublishError::ConfigError(format!(
                    "Failed to parse {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            if let Some(extends_path) = &config.extends {
                let base_path = file_path
                    .parent()
                    .ok_or_else(|| {
                        PublishError::ConfigError("Invalid config file path".to_string())
                    })?
                    .join(extends_path);

                if let Some(base_config) = Self::load_config_file(&base_path, chain).await? {
                    // Starts from an empty layer so that defaults do not
                    // shadow lower-priority files
                    let mut merged = PublishConfig::layer();
                    Self::merge_into(&mut merged, base_config);
                    Self::merge_into(&mut merged, config);
                    return Ok(Some(merged));
                }
                tracing::warn!(path = %base_path.display(), "extended config not found");
            }

            Ok(Some(config))
        })
    }

    /// Load configuration from environment variables
    ///
    /// Repository names are written upper-case with `-` as `_`, so
    /// `PUBLISH_HTTP_BASIC_MY_REPO_USERNAME` configures `my-repo`.
    fn load_env_config(env: &HashMap<String, String>) -> Option<PublishConfig> {
        let mut config = PublishConfig::layer();
        let mut has_changes = false;

        if let Some(dist_dir) = env.get("PUBLISH_DIST_DIR") {
            config.project = Some(ProjectConfig {
                dist_dir: Some(dist_dir.clone()),
            });
            has_changes = true;
        }

        if env.get("PUBLISH_NON_INTERACTIVE").map(|s| s.as_str()) == Some("true") {
            config.publish = Some(PublishOptionsConfig {
                interactive: Some(false),
            });
            has_changes = true;
        }

        // Sorted so that the result does not depend on HashMap order
        let mut keys: Vec<&String> = env.keys().collect();
        keys.sort();

        for key in keys {
            let value = &env[key];

            if let Some(name) = key
                .strip_prefix("PUBLISH_REPOSITORIES_")
                .and_then(|rest| rest.strip_suffix("_URL"))
            {
                config.repositories.insert(
                    Self::env_repository_name(name),
                    RepositoryConfig {
                        url: value.clone(),
                        repository_type: RepositoryType::Http,
                        cert: None,
                        client_cert: None,
                    },
                );
                has_changes = true;
            } else if let Some(rest) = key.strip_prefix("PUBLISH_HTTP_BASIC_") {
                if let Some(name) = rest.strip_suffix("_USERNAME") {
                    config
                        .http_basic
                        .entry(Self::env_repository_name(name))
                        .or_default()
                        .username = Some(value.clone());
                    has_changes = true;
                } else if let Some(name) = rest.strip_suffix("_PASSWORD") {
                    config
                        .http_basic
                        .entry(Self::env_repository_name(name))
                        .or_default()
                        .password = Some(value.clone());
                    has_changes = true;
                }
            }
        }

        if has_changes { Some(config) } else { None }
    }

    fn env_repository_name(name: &str) -> String {
        name.to_lowercase().replace('_', "-")
    }

    /// Merge multiple configurations with priority
    fn merge_configs(configs: Vec<PublishConfig>) -> PublishConfig {
        let mut result = PublishConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target
    fn merge_into(target: &mut PublishConfig, source: PublishConfig) {
        if !source.version.is_empty() {
            target.version = source.version;
        }

        if source.extends.is_some() {
            target.extends = source.extends;
        }

        if let Some(source_project) = source.project {
            let target_project = target.project.get_or_insert_with(ProjectConfig::default);
            if source_project.dist_dir.is_some() {
                target_project.dist_dir = source_project.dist_dir;
            }
        }

        if source.build.is_some() {
            target.build = source.build;
        }

        // Whole entries are replaced; a repository is never half-defined
        target.repositories.extend(source.repositories);

        // Credentials merge field by field, so a password can come from the
        // environment while the username lives in a file
        for (name, source_auth) in source.http_basic {
            let target_auth = target.http_basic.entry(name).or_default();
            if source_auth.username.is_some() {
                target_auth.username = source_auth.username;
            }
            if source_auth.password.is_some() {
                target_auth.password = source_auth.password;
            }
        }

        if source.publish.is_some() {
            target.publish = source.publish;
        }

        if source.security.is_some() {
            target.security = source.security;
        }
    }

    /// Expand environment variables in repository URLs and stored credentials
    ///
    /// Only `${VAR_NAME}` references are expanded, and only for names matching
    /// `allowedPrefixes` when that list is configured.
    fn expand_env_vars(mut config: PublishConfig, env: &HashMap<String, String>) -> PublishConfig {
        let expansion = config
            .security
            .as_ref()
            .and_then(|s| s.env_var_expansion.as_ref());

        if !expansion.and_then(|e| e.enabled).unwrap_or(true) {
            return config;
        }

        let allowed_prefixes = expansion.and_then(|e| e.allowed_prefixes.clone());

        for repository in config.repositories.values_mut() {
            repository.url = Self::expand_string(&repository.url, env, &allowed_prefixes);
        }

        for auth in config.http_basic.values_mut() {
            if let Some(username) = &auth.username {
                auth.username = Some(Self::expand_string(username, env, &allowed_prefixes));
            }
            if let Some(password) = &auth.password {
                auth.password = Some(Self::expand_string(password, env, &allowed_prefixes));
            }
        }

        config
    }

    /// Expand environment variables in a single string
    fn expand_string(
        input: &str,
        env: &HashMap<String, String>,
        allowed_prefixes: &Option<Vec<String>>,
    ) -> String {
        let mut result = input.to_string();
        for cap in ENV_VAR_REGEX.captures_iter(input) {
            let var_name = &cap[1];

            if let Some(prefixes) = allowed_prefixes
                && !prefixes.iter().any(|prefix| var_name.starts_with(prefix))
            {
                tracing::warn!(
                    var = var_name,
                    "environment variable not allowed by prefix whitelist, skipping"
                );
                continue;
            }

            match env.get(var_name) {
                Some(value) => result = result.replace(&format!("${{{}}}", var_name), value),
                None => tracing::warn!(var = var_name, "environment variable not found"),
            }
        }

        result
    }

    /// Validate configuration
    pub fn validate(config: &PublishConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if config.version.is_empty() {
            errors.push(ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
                expected: Some("string (e.g., \"1.0\")".to_string()),
                actual: Some("empty".to_string()),
            });
        } else if config.version != "1.0" {
            warnings.push(ConfigValidationWarning {
                field: "version".to_string(),
                message: format!("Unknown version: {}", config.version),
                suggestion: Some("Currently supported version is \"1.0\" only".to_string()),
            });
        }

        Self::validate_repositories(config, &mut errors, &mut warnings);

        if let Some(build) = &config.build
            && build.command.is_empty()
        {
            errors.push(ConfigValidationError {
                field: "build.command".to_string(),
                message: "command must not be empty".to_string(),
                expected: Some("non-empty array".to_string()),
                actual: Some("empty array".to_string()),
            });
        }

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Validate repository and credential entries
    fn validate_repositories(
        config: &PublishConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        for (name, repository) in &config.repositories {
            let field = format!("repositories.{}.url", name);

            if repository.url.is_empty() {
                errors.push(ConfigValidationError {
                    field,
                    message: "url is required".to_string(),
                    expected: Some("URL or directory path".to_string()),
                    actual: Some("empty".to_string()),
                });
                continue;
            }

            if repository.repository_type == RepositoryType::Http
                && !(repository.url.starts_with("https://") || repository.url.starts_with("http://"))
            {
                errors.push(ConfigValidationError {
                    field,
                    message: "http repositories need an http(s) URL".to_string(),
                    expected: Some("https://...".to_string()),
                    actual: Some(repository.url.clone()),
                });
            }
        }

        for (name, auth) in &config.http_basic {
            let repository = config.repositories.get(name);

            if repository.is_none() && name != DEFAULT_REPOSITORY {
                warnings.push(ConfigValidationWarning {
                    field: format!("httpBasic.{}", name),
                    message: format!("Credentials for unknown repository {}", name),
                    suggestion: Some(format!("Add repositories.{}", name)),
                });
            }

            if repository.is_some_and(|r| r.repository_type == RepositoryType::Local) {
                warnings.push(ConfigValidationWarning {
                    field: format!("httpBasic.{}", name),
                    message: "Local repositories do not use credentials".to_string(),
                    suggestion: None,
                });
            }

            if auth.username.is_none() && auth.password.is_none() {
                warnings.push(ConfigValidationWarning {
                    field: format!("httpBasic.{}", name),
                    message: "Empty credential entry".to_string(),
                    suggestion: Some("Remove the entry or set username/password".to_string()),
                });
            }
        }
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
                if let (Some(expected), Some(actual)) = (&error.expected, &error.actual) {
                    lines.push(format!("    Expected: {}", expected));
                    lines.push(format!("    Actual: {}", actual));
                }
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    Suggestion: {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}
