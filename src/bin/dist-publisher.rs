//! dist-publisher CLI
//!
//! Publishes built Python distributions to a configured repository

use anyhow::Result;
use clap::{Parser, Subcommand};
use dist_publisher::{
    AuthCapability, CommandBuilder, ConfigLoadOptions, ConfigLoader, ConfigRegistry,
    DistPublisher, NonInteractivePrompt, ProjectManifest, Prompt, PublishConfig, PublishError,
    PublishOptions, PublishOrchestrator, RepositoryKind, SecretMasker, StdinPrompt,
};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Publish built distributions to a package repository
#[derive(Parser)]
#[command(name = "dist-publisher")]
#[command(version)]
#[command(about = "Publish built distributions to a package repository", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Do not ask any interactive question
    #[arg(short = 'n', long, global = true)]
    no_interaction: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the project's distributions to a repository
    Publish {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// The repository to publish the package to
        #[arg(short, long)]
        repository: Option<String>,

        /// The username to access the repository
        #[arg(short, long)]
        username: Option<String>,

        /// The password to access the repository
        #[arg(short, long)]
        password: Option<String>,

        /// Certificate authority to access the repository
        #[arg(long, value_name = "CERT")]
        cert: Option<PathBuf>,

        /// Client certificate to access the repository
        #[arg(long, value_name = "CLIENT_CERT")]
        client_cert: Option<PathBuf>,

        /// Build the package before publishing
        #[arg(long)]
        build: bool,

        /// Perform all actions except upload the package
        #[arg(long)]
        dry_run: bool,
    },

    /// List the repositories known to the project
    Repositories {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

/// `RUST_LOG` wins; otherwise each `-v` raises the level from `warn`
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Publish {
            project_path,
            repository,
            username,
            password,
            cert,
            client_cert,
            build,
            dry_run,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            let options = PublishOptions {
                repository_name: repository,
                username,
                password: password.map(SecretString::from),
                cert,
                client_cert,
                build,
                dry_run,
            };
            publish_command(&path, options, cli.no_interaction).await
        }
        Commands::Repositories { project_path } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            repositories_command(&path).await
        }
    }
}

/// Load and validate the layered configuration, reporting problems on stderr
async fn load_config(project_path: &Path, no_interaction: bool) -> Option<PublishConfig> {
    let options = ConfigLoadOptions {
        cli_args: PublishConfig::cli_layer(no_interaction),
        ..ConfigLoadOptions::from_env(project_path)
    };
    let config = match ConfigLoader::load(options).await {
        Ok(config) => config,
        Err(e) => {
            report_error(&e);
            return None;
        }
    };

    let validation = ConfigLoader::validate(&config);
    if !validation.errors.is_empty() || !validation.warnings.is_empty() {
        eprintln!("{}", ConfigLoader::format_validation_result(&validation));
    }
    if !validation.valid {
        return None;
    }

    Some(config)
}

fn report_error(error: &PublishError) {
    eprintln!("\n❌ {}", error);
    for action in error.suggested_actions() {
        eprintln!("  - {}", action);
    }
}

async fn publish_command(
    project_path: &Path,
    options: PublishOptions,
    no_interaction: bool,
) -> Result<i32> {
    let Some(config) = load_config(project_path, no_interaction).await else {
        return Ok(1);
    };

    let manifest = ProjectManifest::load(project_path).await?;
    tracing::info!(name = %manifest.name, version = %manifest.version, "loaded project");

    let registry = Arc::new(ConfigRegistry::from_config(&config));
    let publisher = Arc::new(DistPublisher::new(
        manifest,
        project_path,
        config.dist_dir(),
        registry.clone(),
    ));
    let builder = Arc::new(CommandBuilder::new(project_path, config.build_command()));
    let prompt: Arc<dyn Prompt> = if !config.is_interactive() {
        Arc::new(NonInteractivePrompt)
    } else {
        Arc::new(StdinPrompt)
    };

    let mut orchestrator = PublishOrchestrator::new(builder, publisher, registry, prompt);
    let exit_code = orchestrator.run(&options).await;

    tracing::debug!("state history:\n{}", orchestrator.history());
    Ok(exit_code)
}

async fn repositories_command(project_path: &Path) -> Result<i32> {
    let Some(config) = load_config(project_path, false).await else {
        return Ok(1);
    };

    let registry = ConfigRegistry::from_config(&config);

    println!("\n📚 Repositories\n");
    for entry in registry.entries() {
        let kind = match entry.kind {
            RepositoryKind::Http => "http",
            RepositoryKind::Local => "local",
        };
        println!("{} ({})", entry.name, kind);
        println!("  url: {}", entry.url);

        match &entry.auth {
            AuthCapability::Unsupported => println!("  credentials: not supported"),
            AuthCapability::Supported(_) => match entry.stored_credentials() {
                Some(credentials) => {
                    let username = credentials.username.as_deref().unwrap_or("(none)");
                    let password = credentials
                        .password
                        .as_ref()
                        .map(|p| SecretMasker::mask(p.expose_secret()))
                        .unwrap_or_else(|| "(none)".to_string());
                    println!("  username: {}", username);
                    println!("  password: {}", password);
                }
                None => println!("  credentials: none stored"),
            },
        }

        if let Some(cert) = &entry.cert {
            println!("  cert: {}", cert.display());
        }
        if let Some(client_cert) = &entry.client_cert {
            println!("  client cert: {}", client_cert.display());
        }
    }

    Ok(0)
}
